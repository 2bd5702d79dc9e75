use ash::prelude::VkResult;
use ash::vk;
use ember_render::ShaderError;
use raw_window_handle::HandleError;
use thiserror::Error;

use crate::renderer::DeviceState;

/// Every way bringing up the device can fail. All of them are fatal.
#[derive(Debug, Error)]
pub enum VkInitError {
    #[error("failed to load the Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),
    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] HandleError),
    #[error("required instance extensions not available: {}", .0.join(", "))]
    MissingInstanceExtensions(Vec<String>),
    #[error("no GPUs with Vulkan support found")]
    NoVulkanDevices,
    #[error("no suitable GPU found")]
    NoSuitableDevice,
    #[error("no support for graphics and presentation queues")]
    QueueFamiliesUnresolved,
    #[error("surface reports no formats")]
    NoSurfaceFormats,
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error("shader `{path}` is not valid SPIR-V: {reason}")]
    InvalidSpirv { path: String, reason: String },
    #[error("{stage} failed: {result}")]
    Vk {
        stage: &'static str,
        result: vk::Result,
    },
    #[error("renderer must be {expected:?} but is {actual:?}")]
    InvalidState {
        expected: DeviceState,
        actual: DeviceState,
    },
}

pub(crate) trait VkResultExt<T> {
    fn stage(self, stage: &'static str) -> Result<T, VkInitError>;
}

impl<T> VkResultExt<T> for VkResult<T> {
    fn stage(self, stage: &'static str) -> Result<T, VkInitError> {
        self.map_err(|result| VkInitError::Vk { stage, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_calls_name_their_stage() {
        let err = Err::<(), _>(vk::Result::ERROR_INITIALIZATION_FAILED)
            .stage("vkCreateDevice")
            .unwrap_err();
        assert!(matches!(
            err,
            VkInitError::Vk {
                stage: "vkCreateDevice",
                result: vk::Result::ERROR_INITIALIZATION_FAILED
            }
        ));
        assert!(err.to_string().starts_with("vkCreateDevice failed: "));
    }

    #[test]
    fn missing_extensions_are_listed() {
        let err = VkInitError::MissingInstanceExtensions(vec![
            "VK_KHR_surface".to_owned(),
            "VK_KHR_xcb_surface".to_owned(),
        ]);
        assert_eq!(
            err.to_string(),
            "required instance extensions not available: VK_KHR_surface, VK_KHR_xcb_surface"
        );
    }
}
