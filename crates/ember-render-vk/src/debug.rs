use std::borrow::Cow;
use std::ffi::CStr;

use ash::ext::debug_utils;
use ash::prelude::VkResult;
use ash::vk;
use ember_core::logging::{self, Severity};

const CATEGORY: &str = "Vulkan";

pub(crate) fn severity_of(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> Severity {
    if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Severity::Error
    } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Severity::Warning
    } else {
        Severity::Log
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }
    let p_message = (*data).p_message;
    let message = if p_message.is_null() {
        Cow::Borrowed("<no message>")
    } else {
        CStr::from_ptr(p_message).to_string_lossy()
    };
    logging::emit(severity_of(severity), CATEGORY, &message);
    vk::FALSE
}

/// Also chained into instance creation so that call is reported too.
pub(crate) fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT {
        s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        pfn_user_callback: Some(debug_callback),
        ..Default::default()
    }
}

pub(crate) unsafe fn create_messenger(
    loader: &debug_utils::Instance,
) -> VkResult<vk::DebugUtilsMessengerEXT> {
    loader.create_debug_utils_messenger(&messenger_create_info(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_map_onto_log_levels() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        assert_eq!(severity_of(S::ERROR), Severity::Error);
        assert_eq!(severity_of(S::WARNING), Severity::Warning);
        assert_eq!(severity_of(S::INFO), Severity::Log);
        assert_eq!(severity_of(S::VERBOSE), Severity::Log);
        assert_eq!(severity_of(S::WARNING | S::ERROR), Severity::Error);
    }

    #[test]
    fn messenger_reports_warnings_and_errors_only() {
        let info = messenger_create_info();
        assert!(info
            .message_severity
            .contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
        assert!(!info
            .message_severity
            .contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
        assert!(info.pfn_user_callback.is_some());
    }

    #[test]
    fn callback_never_aborts_the_call() {
        let message = c"validation says hi";
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            p_message: message.as_ptr(),
            ..Default::default()
        };
        let result = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
        let result = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
    }
}
