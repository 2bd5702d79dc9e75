//! Read-only capability queries against the loader and physical devices.
use std::ffi::{CStr, CString, FromBytesUntilNulError};

use ash::prelude::VkResult;
use ash::{vk, Entry, Instance};

fn owned_names<'a>(
    names: impl Iterator<Item = Result<&'a CStr, FromBytesUntilNulError>>,
) -> Vec<CString> {
    names.filter_map(Result::ok).map(CStr::to_owned).collect()
}

pub(crate) unsafe fn instance_extensions(entry: &Entry) -> VkResult<Vec<CString>> {
    let props = entry.enumerate_instance_extension_properties(None)?;
    Ok(owned_names(props.iter().map(vk::ExtensionProperties::extension_name_as_c_str)))
}

pub(crate) unsafe fn instance_layers(entry: &Entry) -> VkResult<Vec<CString>> {
    let props = entry.enumerate_instance_layer_properties()?;
    Ok(owned_names(props.iter().map(vk::LayerProperties::layer_name_as_c_str)))
}

pub(crate) unsafe fn device_extensions(
    instance: &Instance,
    phys: vk::PhysicalDevice,
) -> VkResult<Vec<CString>> {
    let props = instance.enumerate_device_extension_properties(phys)?;
    Ok(owned_names(props.iter().map(vk::ExtensionProperties::extension_name_as_c_str)))
}

/// Names from `required` that are absent from `available`, in request order.
pub fn missing<'a>(required: &[&'a CStr], available: &[CString]) -> Vec<&'a CStr> {
    required
        .iter()
        .copied()
        .filter(|name| !available.iter().any(|have| have.as_c_str() == *name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&CStr]) -> Vec<CString> {
        list.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn nothing_missing_when_all_present() {
        let available = names(&[c"VK_KHR_surface", c"VK_KHR_swapchain", c"VK_EXT_debug_utils"]);
        assert!(missing(&[c"VK_KHR_swapchain", c"VK_KHR_surface"], &available).is_empty());
    }

    #[test]
    fn reports_each_absent_name_in_order() {
        let available = names(&[c"VK_KHR_surface"]);
        assert_eq!(
            missing(
                &[c"VK_KHR_wayland_surface", c"VK_KHR_surface", c"VK_EXT_debug_utils"],
                &available
            ),
            [c"VK_KHR_wayland_surface", c"VK_EXT_debug_utils"]
        );
    }

    #[test]
    fn empty_availability_misses_everything() {
        assert_eq!(missing(&[c"VK_KHR_swapchain"], &[]), [c"VK_KHR_swapchain"]);
    }
}
