//! Swapchain negotiation and creation.
//!
//! The `choose_*` functions are pure so they can be checked without a device.
use ash::khr::swapchain;
use ash::{vk, Device};
use ember_core::PresentModePreference;
use ember_render::RenderSize;

use crate::error::{VkInitError, VkResultExt};

#[derive(Clone, Debug, Default)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// `B8G8R8A8_SRGB` in sRGB-nonlinear, or else whatever the surface listed first.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// FIFO is the fallback since every conforming driver has it.
pub fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    preference: PresentModePreference,
) -> vk::PresentModeKHR {
    match preference {
        PresentModePreference::Mailbox if modes.contains(&vk::PresentModeKHR::MAILBOX) => {
            vk::PresentModeKHR::MAILBOX
        }
        _ => vk::PresentModeKHR::FIFO,
    }
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, framebuffer: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    let (min, max) = (caps.min_image_extent, caps.max_image_extent);
    vk::Extent2D {
        width: framebuffer.width.max(min.width).min(max.width),
        height: framebuffer.height.max(min.height).min(max.height),
    }
}

/// One more than the minimum; a `max_image_count` of 0 means no upper bound.
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        wanted.min(caps.max_image_count)
    } else {
        wanted
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharingPlan {
    pub mode: vk::SharingMode,
    pub families: Vec<u32>,
}

pub fn sharing_plan(graphics: u32, present: u32) -> SharingPlan {
    if graphics != present {
        SharingPlan {
            mode: vk::SharingMode::CONCURRENT,
            families: vec![graphics, present],
        }
    } else {
        SharingPlan {
            mode: vk::SharingMode::EXCLUSIVE,
            families: Vec::new(),
        }
    }
}

pub(crate) struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub images: Vec<vk::Image>,
}

pub(crate) struct SwapchainRequest<'a> {
    pub surface: vk::SurfaceKHR,
    pub support: &'a SwapchainSupport,
    pub framebuffer: RenderSize,
    pub preference: PresentModePreference,
    pub graphics_family: u32,
    pub present_family: u32,
}

pub(crate) unsafe fn create_swapchain(
    loader: &swapchain::Device,
    request: &SwapchainRequest<'_>,
) -> Result<Swapchain, VkInitError> {
    let support = request.support;
    let format = choose_surface_format(&support.formats).ok_or(VkInitError::NoSurfaceFormats)?;
    let present_mode = choose_present_mode(&support.present_modes, request.preference);
    let extent = choose_extent(&support.capabilities, request.framebuffer);
    let image_count = choose_image_count(&support.capabilities);
    let sharing = sharing_plan(request.graphics_family, request.present_family);

    let swap_info = vk::SwapchainCreateInfoKHR {
        s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
        surface: request.surface,
        min_image_count: image_count,
        image_format: format.format,
        image_color_space: format.color_space,
        image_extent: extent,
        image_array_layers: 1,
        image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        image_sharing_mode: sharing.mode,
        queue_family_index_count: sharing.families.len() as u32,
        p_queue_family_indices: if sharing.families.is_empty() {
            std::ptr::null()
        } else {
            sharing.families.as_ptr()
        },
        pre_transform: support.capabilities.current_transform,
        composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
        present_mode,
        clipped: vk::TRUE,
        old_swapchain: vk::SwapchainKHR::null(),
        ..Default::default()
    };

    let handle = loader
        .create_swapchain(&swap_info, None)
        .stage("vkCreateSwapchainKHR")?;
    // The caller records the swapchain for teardown only after this returns.
    let images = match loader.get_swapchain_images(handle) {
        Ok(images) => images,
        Err(result) => {
            loader.destroy_swapchain(handle, None);
            return Err(VkInitError::Vk {
                stage: "vkGetSwapchainImagesKHR",
                result,
            });
        }
    };

    Ok(Swapchain {
        handle,
        format,
        present_mode,
        extent,
        images,
    })
}

pub(crate) unsafe fn create_image_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView, VkInitError> {
    let iv_info = vk::ImageViewCreateInfo {
        s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format,
        components: vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        },
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        },
        ..Default::default()
    };
    device
        .create_image_view(&iv_info, None)
        .stage("vkCreateImageView")
}
