use std::os::raw::c_char;

use ash::{vk, Device, Instance};

use crate::error::{VkInitError, VkResultExt};
use crate::instance::VALIDATION_LAYER;
use crate::selector::{QueueFamilyIndices, SelectedDevice, REQUIRED_DEVICE_EXTENSIONS};

static QUEUE_PRIORITY: [f32; 1] = [1.0];

pub(crate) struct LogicalDevice {
    pub device: Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

/// One single-queue request per distinct family.
pub(crate) fn queue_create_infos(families: &[u32]) -> Vec<vk::DeviceQueueCreateInfo<'static>> {
    families
        .iter()
        .map(|&family| vk::DeviceQueueCreateInfo {
            s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
            queue_family_index: family,
            queue_count: 1,
            p_queue_priorities: QUEUE_PRIORITY.as_ptr(),
            ..Default::default()
        })
        .collect()
}

pub(crate) unsafe fn create_logical_device(
    instance: &Instance,
    selected: &SelectedDevice,
    validation: bool,
) -> Result<LogicalDevice, VkInitError> {
    let families = QueueFamilyIndices {
        graphics: Some(selected.graphics_family),
        present: Some(selected.present_family),
    }
    .unique();
    let queue_infos = queue_create_infos(&families);

    let ext_ptrs: Vec<*const c_char> = REQUIRED_DEVICE_EXTENSIONS
        .iter()
        .map(|name| name.as_ptr())
        .collect();
    // Device layers are deprecated, still set for older loaders.
    let layer_ptrs: Vec<*const c_char> = if validation {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        Vec::new()
    };
    let features = vk::PhysicalDeviceFeatures::default();

    let dinfo = vk::DeviceCreateInfo {
        s_type: vk::StructureType::DEVICE_CREATE_INFO,
        queue_create_info_count: queue_infos.len() as u32,
        p_queue_create_infos: queue_infos.as_ptr(),
        enabled_layer_count: layer_ptrs.len() as u32,
        pp_enabled_layer_names: layer_ptrs.as_ptr(),
        enabled_extension_count: ext_ptrs.len() as u32,
        pp_enabled_extension_names: ext_ptrs.as_ptr(),
        p_enabled_features: &features,
        ..Default::default()
    };
    let device = instance
        .create_device(selected.physical, &dinfo, None)
        .stage("vkCreateDevice")?;

    let graphics_queue = device.get_device_queue(selected.graphics_family, 0);
    let present_queue = device.get_device_queue(selected.present_family, 0);

    Ok(LogicalDevice {
        device,
        graphics_queue,
        present_queue,
    })
}
