use ash::khr::surface;
use ash::prelude::VkResult;
use ash::{vk, Entry, Instance};
use ember_render::WindowHost;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::{VkInitError, VkResultExt};
use crate::swapchain::SwapchainSupport;

/// The window's presentation target plus the loader that can query it.
#[derive(Clone)]
pub(crate) struct PresentationSurface {
    pub loader: surface::Instance,
    pub handle: vk::SurfaceKHR,
}

impl PresentationSurface {
    pub unsafe fn create<W: WindowHost>(
        entry: &Entry,
        instance: &Instance,
        window: &W,
    ) -> Result<Self, VkInitError> {
        let display = window.display_handle()?.as_raw();
        let raw_window = window.window_handle()?.as_raw();
        let handle = ash_window::create_surface(entry, instance, display, raw_window, None)
            .stage("vkCreateSurfaceKHR")?;
        Ok(Self {
            loader: surface::Instance::new(entry, instance),
            handle,
        })
    }

    /// A failed query counts as "cannot present".
    pub unsafe fn supports_present(&self, phys: vk::PhysicalDevice, family: u32) -> bool {
        self.loader
            .get_physical_device_surface_support(phys, family, self.handle)
            .unwrap_or(false)
    }

    pub unsafe fn swapchain_support(&self, phys: vk::PhysicalDevice) -> VkResult<SwapchainSupport> {
        Ok(SwapchainSupport {
            capabilities: self
                .loader
                .get_physical_device_surface_capabilities(phys, self.handle)?,
            formats: self
                .loader
                .get_physical_device_surface_formats(phys, self.handle)?,
            present_modes: self
                .loader
                .get_physical_device_surface_present_modes(phys, self.handle)?,
        })
    }
}
