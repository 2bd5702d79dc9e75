use anyhow::Result;
use ash::ext::debug_utils;
use ash::khr::swapchain;
use ash::{vk, Entry, Instance};
use ember_core::{EngineConfig, Logger, PresentModePreference, Severity};
use ember_render::{RenderBackend, ShaderSource, WindowHost, WindowStatus};
use raw_window_handle::HasDisplayHandle;
use tracing::{debug, info};

use crate::error::{VkInitError, VkResultExt};
use crate::instance::{create_instance, InstanceDesc};
use crate::logical::{create_logical_device, LogicalDevice};
use crate::pipeline;
use crate::selector::{select_physical_device, SelectedDevice};
use crate::shader::decode_spirv;
use crate::surface::PresentationSurface;
use crate::swapchain::{create_image_view, create_swapchain, Swapchain, SwapchainRequest};
use crate::teardown::{Resource, TeardownStack};

const CATEGORY: &str = "Vulkan";

/// Where bring-up currently stands. Stages are entered strictly in order;
/// `Failed` can follow any of them and is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized,
    InstanceCreated,
    SurfaceBound,
    PhysicalDeviceSelected,
    LogicalDeviceCreated,
    SwapchainCreated,
    ImageViewsCreated,
    RenderPassCreated,
    PipelineCreated,
    Failed,
}

impl DeviceState {
    pub fn next(self) -> Option<Self> {
        use DeviceState::*;
        match self {
            Uninitialized => Some(InstanceCreated),
            InstanceCreated => Some(SurfaceBound),
            SurfaceBound => Some(PhysicalDeviceSelected),
            PhysicalDeviceSelected => Some(LogicalDeviceCreated),
            LogicalDeviceCreated => Some(SwapchainCreated),
            SwapchainCreated => Some(ImageViewsCreated),
            ImageViewsCreated => Some(RenderPassCreated),
            RenderPassCreated => Some(PipelineCreated),
            PipelineCreated | Failed => None,
        }
    }

    pub fn is_ready(self) -> bool {
        self == DeviceState::PipelineCreated
    }
}

#[derive(Clone, Debug)]
pub struct VkSettings {
    pub instance: InstanceDesc,
    pub present_mode: PresentModePreference,
    pub vertex_shader: String,
    pub fragment_shader: String,
}

impl VkSettings {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        VkSettings {
            instance: InstanceDesc {
                application_name: cfg.application_name.clone(),
                engine_name: cfg.engine_name.clone(),
                validation: cfg.render.validation,
            },
            present_mode: cfg.render.present_mode,
            vertex_shader: cfg.shaders.vertex.clone(),
            fragment_shader: cfg.shaders.fragment.clone(),
        }
    }
}

/// Owns the window and every Vulkan object created for it.
pub struct VkRenderer<W: WindowHost> {
    window: W,
    shaders: Box<dyn ShaderSource>,
    settings: VkSettings,
    logger: Logger,
    state: DeviceState,
    teardown: TeardownStack,

    entry: Option<Entry>,
    instance: Option<Instance>,
    debug_utils: Option<debug_utils::Instance>,
    surface: Option<PresentationSurface>,
    physical: Option<SelectedDevice>,
    device: Option<LogicalDevice>,
    swapchain_loader: Option<swapchain::Device>,
    swapchain: Option<Swapchain>,
    image_views: Vec<vk::ImageView>,
    render_pass: vk::RenderPass,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl<W: WindowHost> VkRenderer<W> {
    pub fn new(
        window: W,
        shaders: Box<dyn ShaderSource>,
        settings: VkSettings,
        logger: Logger,
    ) -> Self {
        VkRenderer {
            window,
            shaders,
            settings,
            logger,
            state: DeviceState::Uninitialized,
            teardown: TeardownStack::new(),
            entry: None,
            instance: None,
            debug_utils: None,
            surface: None,
            physical: None,
            device: None,
            swapchain_loader: None,
            swapchain: None,
            image_views: Vec::new(),
            render_pass: vk::RenderPass::null(),
            layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn swapchain_extent(&self) -> Option<vk::Extent2D> {
        self.swapchain.as_ref().map(|s| s.extent)
    }

    pub fn device_name(&self) -> Option<&str> {
        self.physical.as_ref().map(|p| p.name.as_str())
    }

    fn advance(&mut self, to: DeviceState) {
        debug_assert_eq!(self.state.next(), Some(to));
        debug!("{:?} -> {:?}", self.state, to);
        self.state = to;
    }

    // Each object goes on the teardown stack the moment it exists, so an early
    // return leaves exactly the created prefix behind for `shutdown`.
    unsafe fn build(&mut self) -> Result<(), VkInitError> {
        let entry = Entry::load()?;
        self.entry = Some(entry.clone());
        let display = self.window.display_handle()?.as_raw();

        // Instance
        let created = create_instance(&entry, display, &self.settings.instance, &self.logger)?;
        let instance = created.instance.clone();
        self.instance = Some(created.instance);
        self.teardown.push(Resource::Instance);

        if created.debug_utils {
            let loader = debug_utils::Instance::new(&entry, &instance);
            match crate::debug::create_messenger(&loader) {
                Ok(messenger) => {
                    self.teardown.push(Resource::DebugMessenger(messenger));
                    self.debug_utils = Some(loader);
                }
                Err(result) => self.logger.log(
                    Severity::Error,
                    CATEGORY,
                    format_args!("failed to set up debug messenger: {result}"),
                ),
            }
        }
        self.advance(DeviceState::InstanceCreated);

        // Surface
        let surface = PresentationSurface::create(&entry, &instance, &self.window)?;
        self.teardown.push(Resource::Surface(surface.handle));
        self.surface = Some(surface.clone());
        self.advance(DeviceState::SurfaceBound);

        // Physical device
        let selected = select_physical_device(&instance, &surface, &self.logger)?;
        self.physical = Some(selected.clone());
        self.advance(DeviceState::PhysicalDeviceSelected);

        // Logical device
        let logical = create_logical_device(&instance, &selected, created.validation)?;
        debug!(
            graphics = ?logical.graphics_queue,
            present = ?logical.present_queue,
            "device queues"
        );
        let device = logical.device.clone();
        self.device = Some(logical);
        self.teardown.push(Resource::Device);
        self.advance(DeviceState::LogicalDeviceCreated);

        // Swapchain
        let support = surface
            .swapchain_support(selected.physical)
            .stage("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?;
        if !support.is_adequate() {
            return Err(VkInitError::NoSurfaceFormats);
        }
        let loader = swapchain::Device::new(&instance, &device);
        self.swapchain_loader = Some(loader.clone());
        let chain = create_swapchain(
            &loader,
            &SwapchainRequest {
                surface: surface.handle,
                support: &support,
                framebuffer: self.window.framebuffer_size(),
                preference: self.settings.present_mode,
                graphics_family: selected.graphics_family,
                present_family: selected.present_family,
            },
        )?;
        self.teardown.push(Resource::Swapchain(chain.handle));
        info!(
            "swapchain ready ({}x{}, {} images, {:?}, {:?})",
            chain.extent.width,
            chain.extent.height,
            chain.images.len(),
            chain.format.format,
            chain.present_mode
        );
        let format = chain.format.format;
        let images = chain.images.clone();
        self.swapchain = Some(chain);
        self.advance(DeviceState::SwapchainCreated);

        // Image views
        for image in images {
            let view = create_image_view(&device, image, format)?;
            self.teardown.push(Resource::ImageView(view));
            self.image_views.push(view);
        }
        self.advance(DeviceState::ImageViewsCreated);

        // Render pass
        self.render_pass = pipeline::create_render_pass(&device, format)?;
        self.teardown.push(Resource::RenderPass(self.render_pass));
        self.advance(DeviceState::RenderPassCreated);

        // Pipeline
        self.shaders.compile_all()?;
        let vert_path = self.settings.vertex_shader.as_str();
        let frag_path = self.settings.fragment_shader.as_str();
        let vertex = decode_spirv(vert_path, &self.shaders.load(vert_path)?)?;
        let fragment = decode_spirv(frag_path, &self.shaders.load(frag_path)?)?;

        self.layout = pipeline::create_pipeline_layout(&device)?;
        self.teardown.push(Resource::PipelineLayout(self.layout));
        self.pipeline = pipeline::create_graphics_pipeline(
            &device,
            self.layout,
            self.render_pass,
            &vertex,
            &fragment,
        )?;
        self.teardown.push(Resource::Pipeline(self.pipeline));
        self.advance(DeviceState::PipelineCreated);

        Ok(())
    }

    unsafe fn destroy(&self, resource: Resource) {
        let device = self.device.as_ref().map(|d| &d.device);
        match resource {
            Resource::Pipeline(p) => {
                if let Some(device) = device {
                    device.destroy_pipeline(p, None);
                }
            }
            Resource::PipelineLayout(l) => {
                if let Some(device) = device {
                    device.destroy_pipeline_layout(l, None);
                }
            }
            Resource::RenderPass(rp) => {
                if let Some(device) = device {
                    device.destroy_render_pass(rp, None);
                }
            }
            Resource::ImageView(iv) => {
                if let Some(device) = device {
                    device.destroy_image_view(iv, None);
                }
            }
            Resource::Swapchain(sc) => {
                if let Some(loader) = &self.swapchain_loader {
                    loader.destroy_swapchain(sc, None);
                }
            }
            Resource::Device => {
                if let Some(device) = device {
                    device.destroy_device(None);
                }
            }
            Resource::Surface(s) => {
                if let Some(surface) = &self.surface {
                    surface.loader.destroy_surface(s, None);
                }
            }
            Resource::DebugMessenger(m) => {
                if let Some(loader) = &self.debug_utils {
                    loader.destroy_debug_utils_messenger(m, None);
                }
            }
            Resource::Instance => {
                if let Some(instance) = &self.instance {
                    instance.destroy_instance(None);
                }
            }
        }
    }

    /// Destroys whatever exists, newest first. Safe to call in any state and
    /// more than once.
    pub fn shutdown(&mut self) {
        if self.teardown.is_empty() {
            return;
        }
        let mut stack = std::mem::take(&mut self.teardown);
        let count = stack.len();
        unsafe {
            if let Some(logical) = &self.device {
                if let Err(result) = logical.device.device_wait_idle() {
                    self.logger.log(
                        Severity::Warning,
                        CATEGORY,
                        format_args!("vkDeviceWaitIdle failed: {result}"),
                    );
                }
            }
            stack.unwind(|resource| self.destroy(resource));
        }

        self.pipeline = vk::Pipeline::null();
        self.layout = vk::PipelineLayout::null();
        self.render_pass = vk::RenderPass::null();
        self.image_views.clear();
        self.swapchain = None;
        self.swapchain_loader = None;
        self.device = None;
        self.physical = None;
        self.surface = None;
        self.debug_utils = None;
        self.instance = None;
        self.entry = None;
        if self.state != DeviceState::Failed {
            self.state = DeviceState::Uninitialized;
        }
        info!("destroyed {count} Vulkan objects");
    }
}

impl<W: WindowHost> Drop for VkRenderer<W> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<W: WindowHost> RenderBackend for VkRenderer<W> {
    fn name(&self) -> &'static str {
        "Vulkan"
    }

    fn init(&mut self) -> Result<()> {
        if self.state != DeviceState::Uninitialized {
            return Err(VkInitError::InvalidState {
                expected: DeviceState::Uninitialized,
                actual: self.state,
            }
            .into());
        }
        match unsafe { self.build() } {
            Ok(()) => {
                info!(
                    "Vulkan ready on {}",
                    self.device_name().unwrap_or("<unknown>")
                );
                Ok(())
            }
            Err(err) => {
                self.logger.log(
                    Severity::Fatal,
                    CATEGORY,
                    format_args!("{err} (while {:?})", self.state),
                );
                self.state = DeviceState::Failed;
                Err(err.into())
            }
        }
    }

    fn tick(&mut self) -> Result<()> {
        if !self.state.is_ready() {
            return Err(VkInitError::InvalidState {
                expected: DeviceState::PipelineCreated,
                actual: self.state,
            }
            .into());
        }
        if self.window.poll() == WindowStatus::CloseRequested {
            let exit = self.logger.exit_signal();
            if !exit.is_requested() {
                self.logger.log(Severity::Log, CATEGORY, "window closed");
                exit.request();
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        VkRenderer::shutdown(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::BuiltinShaders;
    use ember_core::ExitSignal;
    use ember_render::RenderSize;
    use raw_window_handle::{DisplayHandle, HandleError, HasWindowHandle, WindowHandle};

    /// A window that never yields native handles.
    struct Headless {
        polls: usize,
    }

    impl HasWindowHandle for Headless {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    impl HasDisplayHandle for Headless {
        fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    impl WindowHost for Headless {
        fn framebuffer_size(&self) -> RenderSize {
            RenderSize {
                width: 640,
                height: 480,
            }
        }

        fn poll(&mut self) -> WindowStatus {
            self.polls += 1;
            WindowStatus::Open
        }
    }

    fn renderer() -> (VkRenderer<Headless>, ExitSignal) {
        let exit = ExitSignal::new();
        let r = VkRenderer::new(
            Headless { polls: 0 },
            Box::new(BuiltinShaders),
            VkSettings::from_config(&EngineConfig::default()),
            Logger::new(exit.clone()),
        );
        (r, exit)
    }

    #[test]
    fn states_advance_in_creation_order() {
        let mut state = DeviceState::Uninitialized;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            seen.push(next);
            state = next;
        }
        assert_eq!(seen.len(), 9);
        assert_eq!(state, DeviceState::PipelineCreated);
        assert!(state.is_ready());
        assert_eq!(DeviceState::Failed.next(), None);
        assert!(!DeviceState::RenderPassCreated.is_ready());
    }

    #[test]
    fn tick_before_init_is_rejected() {
        let (mut r, exit) = renderer();
        let err = r.tick().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VkInitError>(),
            Some(VkInitError::InvalidState {
                expected: DeviceState::PipelineCreated,
                actual: DeviceState::Uninitialized,
            })
        ));
        assert_eq!(r.window().polls, 0);
        assert!(!exit.is_requested());
    }

    #[test]
    fn shutdown_before_init_is_a_no_op() {
        let (mut r, _) = renderer();
        r.shutdown();
        r.shutdown();
        assert_eq!(r.state(), DeviceState::Uninitialized);
    }

    #[test]
    fn failed_init_is_fatal_and_terminal() {
        let (mut r, exit) = renderer();
        assert!(r.init().is_err());
        assert_eq!(r.state(), DeviceState::Failed);
        assert!(exit.is_requested());
        assert!(r.swapchain_extent().is_none());

        // nothing was created, nothing to destroy
        r.shutdown();
        assert_eq!(r.state(), DeviceState::Failed);

        let again = r.init().unwrap_err();
        assert!(matches!(
            again.downcast_ref::<VkInitError>(),
            Some(VkInitError::InvalidState {
                actual: DeviceState::Failed,
                ..
            })
        ));
        assert!(r.tick().is_err());
    }

    #[test]
    fn settings_follow_config() {
        let mut cfg = EngineConfig::default();
        cfg.render.validation = false;
        cfg.render.present_mode = PresentModePreference::Fifo;
        let settings = VkSettings::from_config(&cfg);
        assert!(!settings.instance.validation);
        assert_eq!(settings.instance.application_name, "Sandbox");
        assert_eq!(settings.present_mode, PresentModePreference::Fifo);
        assert_eq!(settings.vertex_shader, crate::shader::VERTEX_SHADER);
        assert_eq!(settings.fragment_shader, crate::shader::FRAGMENT_SHADER);
    }
}
