//! Vulkan bring-up: instance, surface, device, swapchain and one fixed pipeline.
mod caps;
mod debug;
mod error;
mod instance;
mod logical;
mod pipeline;
mod renderer;
mod selector;
mod shader;
mod surface;
mod swapchain;
mod teardown;

pub use error::VkInitError;
pub use instance::InstanceDesc;
pub use renderer::{DeviceState, VkRenderer, VkSettings};
pub use selector::{select_best, DeviceCandidate, QueueFamilyIndices, DISCRETE_GPU_BONUS};
pub use shader::{decode_spirv, BuiltinShaders, DirectoryShaders, FRAGMENT_SHADER, VERTEX_SHADER};
pub use swapchain::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format, sharing_plan,
    SharingPlan, SwapchainSupport,
};
pub use teardown::{Resource, TeardownStack};
