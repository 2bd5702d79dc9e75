use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;

use ash::{vk, Entry, Instance};
use ember_core::{Logger, Severity};
use raw_window_handle::RawDisplayHandle;

use crate::caps;
use crate::debug;
use crate::error::{VkInitError, VkResultExt};

const CATEGORY: &str = "Instance";

pub(crate) const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

#[derive(Clone, Debug)]
pub struct InstanceDesc {
    pub application_name: String,
    pub engine_name: String,
    pub validation: bool,
}

pub(crate) struct CreatedInstance {
    pub instance: Instance,
    /// Validation layers were found and enabled.
    pub validation: bool,
    /// `VK_EXT_debug_utils` is enabled and a messenger may be created.
    pub debug_utils: bool,
}

/// Extensions every instance needs: the window system's, plus portability on macOS.
pub(crate) fn required_extensions(window_system: &[&'static CStr]) -> Vec<&'static CStr> {
    let mut required = window_system.to_vec();
    if cfg!(target_os = "macos") {
        required.push(ash::khr::portability_enumeration::NAME);
        required.push(ash::khr::get_physical_device_properties2::NAME);
    }
    required
}

// Missing layers degrade to a non-validated instance.
unsafe fn validation_layers_available(entry: &Entry, logger: &Logger) -> bool {
    let available = match caps::instance_layers(entry) {
        Ok(layers) => layers,
        Err(result) => {
            logger.log(
                Severity::Warning,
                CATEGORY,
                format_args!("couldn't enumerate instance layers: {result}"),
            );
            Vec::new()
        }
    };
    let missing = caps::missing(&[VALIDATION_LAYER], &available);
    for name in &missing {
        logger.log(
            Severity::Error,
            CATEGORY,
            format_args!("validation layer {name:?} not found"),
        );
    }
    if !missing.is_empty() {
        logger.log(
            Severity::Warning,
            CATEGORY,
            "won't enable validation layers since not all of them are available",
        );
    }
    missing.is_empty()
}

pub(crate) unsafe fn create_instance(
    entry: &Entry,
    display: RawDisplayHandle,
    desc: &InstanceDesc,
    logger: &Logger,
) -> Result<CreatedInstance, VkInitError> {
    let app_name = CString::new(desc.application_name.as_str()).unwrap_or_default();
    let engine_name = CString::new(desc.engine_name.as_str()).unwrap_or_default();

    let app_info = vk::ApplicationInfo {
        s_type: vk::StructureType::APPLICATION_INFO,
        p_application_name: app_name.as_ptr(),
        application_version: vk::make_api_version(0, 1, 0, 0),
        p_engine_name: engine_name.as_ptr(),
        engine_version: vk::make_api_version(0, 1, 0, 0),
        api_version: vk::API_VERSION_1_3,
        ..Default::default()
    };

    let window_system: Vec<&'static CStr> = ash_window::enumerate_required_extensions(display)
        .stage("enumerate_required_extensions")?
        .iter()
        .map(|&name| CStr::from_ptr(name))
        .collect();
    let mut required = required_extensions(&window_system);

    let available = caps::instance_extensions(entry).stage("vkEnumerateInstanceExtensionProperties")?;

    let validation = desc.validation && validation_layers_available(entry, logger);
    let debug_utils = validation
        && if caps::missing(&[ash::ext::debug_utils::NAME], &available).is_empty() {
            true
        } else {
            logger.log(
                Severity::Warning,
                CATEGORY,
                "VK_EXT_debug_utils not available, validation output stays with the loader",
            );
            false
        };
    if debug_utils {
        required.push(ash::ext::debug_utils::NAME);
    }

    let missing = caps::missing(&required, &available);
    if !missing.is_empty() {
        for name in &missing {
            logger.log(
                Severity::Error,
                CATEGORY,
                format_args!("instance extension {name:?} not found"),
            );
        }
        return Err(VkInitError::MissingInstanceExtensions(
            missing
                .iter()
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
        ));
    }

    let ext_ptrs: Vec<*const c_char> = required.iter().map(|name| name.as_ptr()).collect();
    let layer_ptrs: Vec<*const c_char> = if validation {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        Vec::new()
    };

    let debug_info = debug::messenger_create_info();
    let p_next: *const c_void = if debug_utils {
        (&debug_info as *const vk::DebugUtilsMessengerCreateInfoEXT<'_>).cast()
    } else {
        std::ptr::null()
    };

    let flags = if cfg!(target_os = "macos") {
        vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
    } else {
        vk::InstanceCreateFlags::empty()
    };

    let create_info = vk::InstanceCreateInfo {
        s_type: vk::StructureType::INSTANCE_CREATE_INFO,
        p_next,
        flags,
        p_application_info: &app_info,
        enabled_layer_count: layer_ptrs.len() as u32,
        pp_enabled_layer_names: layer_ptrs.as_ptr(),
        enabled_extension_count: ext_ptrs.len() as u32,
        pp_enabled_extension_names: ext_ptrs.as_ptr(),
        ..Default::default()
    };

    let instance = entry
        .create_instance(&create_info, None)
        .stage("vkCreateInstance")?;

    Ok(CreatedInstance {
        instance,
        validation,
        debug_utils,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_system_extensions_come_first() {
        let required = required_extensions(&[c"VK_KHR_surface", c"VK_KHR_xlib_surface"]);
        assert_eq!(&required[..2], [c"VK_KHR_surface", c"VK_KHR_xlib_surface"]);
        if cfg!(target_os = "macos") {
            assert!(required.contains(&ash::khr::portability_enumeration::NAME));
        } else {
            assert_eq!(required.len(), 2);
        }
    }
}
