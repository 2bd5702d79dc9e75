//! Physical device ranking.
//!
//! Everything that decides is a plain function over [`DeviceCandidate`]s; only
//! [`select_physical_device`] talks to the driver.
use std::ffi::CStr;

use ash::{vk, Instance};
use ember_core::{Logger, Severity};

use crate::caps;
use crate::error::{VkInitError, VkResultExt};
use crate::surface::PresentationSurface;
use crate::swapchain::SwapchainSupport;

const CATEGORY: &str = "DeviceSelector";

pub(crate) const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];

pub const DISCRETE_GPU_BONUS: u32 = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// First graphics family and first present family in index order, found
    /// independently. Stops probing once both are known.
    pub fn resolve(
        families: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> bool,
    ) -> Self {
        let mut found = Self::default();
        for (index, family) in (0u32..).zip(families) {
            if found.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                found.graphics = Some(index);
            }
            if found.present.is_none() && supports_present(index) {
                found.present = Some(index);
            }
            if found.is_complete() {
                break;
            }
        }
        found
    }

    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    pub fn complete(&self) -> Option<(u32, u32)> {
        Some((self.graphics?, self.present?))
    }

    /// Distinct family indices, ascending.
    pub fn unique(&self) -> Vec<u32> {
        let mut all: Vec<u32> = self.graphics.into_iter().chain(self.present).collect();
        all.sort_unstable();
        all.dedup();
        all
    }
}

/// What the selector knows about one physical device.
#[derive(Clone, Debug)]
pub struct DeviceCandidate {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub queue_families: QueueFamilyIndices,
    pub has_required_extensions: bool,
    pub surface_format_count: usize,
    pub present_mode_count: usize,
}

impl DeviceCandidate {
    /// 0 means disqualified.
    pub fn score(&self) -> u32 {
        if !self.queue_families.is_complete()
            || !self.has_required_extensions
            || self.surface_format_count == 0
            || self.present_mode_count == 0
        {
            return 0;
        }
        let mut score = 1;
        if self.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            score += DISCRETE_GPU_BONUS;
        }
        score
    }
}

/// Highest positive score wins; among equal scores the first one seen.
pub fn select_best<T>(scored: impl IntoIterator<Item = (T, u32)>) -> Option<(T, u32)> {
    let mut best: Option<(T, u32)> = None;
    for (item, score) in scored {
        if score == 0 {
            continue;
        }
        if best.as_ref().map_or(true, |(_, top)| score > *top) {
            best = Some((item, score));
        }
    }
    best
}

#[derive(Clone, Debug)]
pub(crate) struct SelectedDevice {
    pub physical: vk::PhysicalDevice,
    pub name: String,
    pub graphics_family: u32,
    pub present_family: u32,
}

unsafe fn describe(
    instance: &Instance,
    surface: &PresentationSurface,
    phys: vk::PhysicalDevice,
    logger: &Logger,
) -> DeviceCandidate {
    let props = instance.get_physical_device_properties(phys);
    let name = props
        .device_name_as_c_str()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "<unnamed>".to_owned());

    let families = instance.get_physical_device_queue_family_properties(phys);
    let queue_families =
        QueueFamilyIndices::resolve(&families, |index| surface.supports_present(phys, index));

    let has_required_extensions = match caps::device_extensions(instance, phys) {
        Ok(available) => caps::missing(REQUIRED_DEVICE_EXTENSIONS, &available).is_empty(),
        Err(result) => {
            logger.log(
                Severity::Warning,
                CATEGORY,
                format_args!("{name}: couldn't enumerate device extensions: {result}"),
            );
            false
        }
    };

    // Surface support is only meaningful once the swapchain extension is there.
    let (surface_format_count, present_mode_count) = if has_required_extensions {
        match surface.swapchain_support(phys) {
            Ok(SwapchainSupport {
                formats,
                present_modes,
                ..
            }) => (formats.len(), present_modes.len()),
            Err(result) => {
                logger.log(
                    Severity::Warning,
                    CATEGORY,
                    format_args!("{name}: couldn't query surface support: {result}"),
                );
                (0, 0)
            }
        }
    } else {
        (0, 0)
    };

    DeviceCandidate {
        name,
        device_type: props.device_type,
        queue_families,
        has_required_extensions,
        surface_format_count,
        present_mode_count,
    }
}

pub(crate) unsafe fn select_physical_device(
    instance: &Instance,
    surface: &PresentationSurface,
    logger: &Logger,
) -> Result<SelectedDevice, VkInitError> {
    let devices = instance
        .enumerate_physical_devices()
        .stage("vkEnumeratePhysicalDevices")?;
    if devices.is_empty() {
        return Err(VkInitError::NoVulkanDevices);
    }

    let mut scored = Vec::with_capacity(devices.len());
    for phys in devices {
        let candidate = describe(instance, surface, phys, logger);
        let score = candidate.score();
        logger.log(
            Severity::Log,
            CATEGORY,
            format_args!("{} ({:?}) scored {score}", candidate.name, candidate.device_type),
        );
        scored.push(((phys, candidate), score));
    }

    let ((physical, candidate), _) = select_best(scored).ok_or(VkInitError::NoSuitableDevice)?;
    let (graphics_family, present_family) = candidate
        .queue_families
        .complete()
        .ok_or(VkInitError::QueueFamiliesUnresolved)?;
    logger.log(
        Severity::Log,
        CATEGORY,
        format_args!("selected GPU: {}", candidate.name),
    );

    Ok(SelectedDevice {
        physical,
        name: candidate.name,
        graphics_family,
        present_family,
    })
}
