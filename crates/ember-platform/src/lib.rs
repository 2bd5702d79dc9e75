// SPDX-License-Identifier: CEPL-1.0
//! winit-backed window for the engine's main loop.
//!
//! The engine owns the loop, so instead of handing control to
//! `EventLoop::run_app` the window pumps pending events once per frame.
use std::time::Duration;

use ember_core::WindowConfig;
use ember_render::{RenderSize, WindowHost, WindowStatus};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use thiserror::Error;
use tracing::{debug, info};

pub use winit;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    error::{EventLoopError, OsError},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window, WindowAttributes, WindowId},
};

// Some platforms need a few round trips before `resumed` arrives.
const MAX_OPEN_PUMPS: usize = 16;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] EventLoopError),
    #[error("failed to create window: {0}")]
    CreateWindow(#[from] OsError),
    #[error("window was not created after {0} event pumps")]
    NotResumed(usize),
    #[error("event loop exited with code {0} before the window opened")]
    Exited(i32),
}

pub fn window_attributes(cfg: &WindowConfig) -> WindowAttributes {
    Window::default_attributes()
        .with_title(cfg.title.clone())
        .with_inner_size(PhysicalSize::new(cfg.width.max(1), cfg.height.max(1)))
}

fn render_size(size: PhysicalSize<u32>) -> RenderSize {
    RenderSize {
        width: size.width,
        height: size.height,
    }
}

struct WindowState {
    attributes: WindowAttributes,
    window: Option<Window>,
    create_error: Option<OsError>,
    close_requested: bool,
    size: RenderSize,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => {
                self.size = render_size(window.inner_size());
                info!(
                    "window created ({}x{})",
                    self.size.width, self.size.height
                );
                self.window = Some(window);
            }
            Err(e) => self.create_error = Some(e),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(Window::id) != Some(id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.close_requested = true;
            }
            WindowEvent::Resized(new_size) => {
                self.size = render_size(new_size);
                debug!("Resized → {}x{}", self.size.width, self.size.height);
            }
            _ => {}
        }
    }
}

pub struct PlatformWindow {
    state: WindowState,
    event_loop: EventLoop<()>,
}

impl PlatformWindow {
    pub fn open(cfg: &WindowConfig) -> Result<Self, PlatformError> {
        let event_loop = EventLoop::new()?;
        let mut window = PlatformWindow {
            state: WindowState {
                attributes: window_attributes(cfg),
                window: None,
                create_error: None,
                close_requested: false,
                size: RenderSize {
                    width: cfg.width,
                    height: cfg.height,
                },
            },
            event_loop,
        };

        for _ in 0..MAX_OPEN_PUMPS {
            if let PumpStatus::Exit(code) = window.pump() {
                return Err(PlatformError::Exited(code));
            }
            if let Some(e) = window.state.create_error.take() {
                return Err(e.into());
            }
            if window.state.window.is_some() {
                return Ok(window);
            }
        }
        Err(PlatformError::NotResumed(MAX_OPEN_PUMPS))
    }

    pub fn window(&self) -> Option<&Window> {
        self.state.window.as_ref()
    }

    fn pump(&mut self) -> PumpStatus {
        self.event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state)
    }
}

impl WindowHost for PlatformWindow {
    fn framebuffer_size(&self) -> RenderSize {
        self.state
            .window
            .as_ref()
            .map(|w| render_size(w.inner_size()))
            .unwrap_or(self.state.size)
    }

    fn poll(&mut self) -> WindowStatus {
        match self.pump() {
            PumpStatus::Exit(_) => WindowStatus::CloseRequested,
            PumpStatus::Continue if self.state.close_requested => WindowStatus::CloseRequested,
            PumpStatus::Continue => WindowStatus::Open,
        }
    }
}

impl HasWindowHandle for PlatformWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        match &self.state.window {
            Some(window) => window.window_handle(),
            None => Err(HandleError::Unavailable),
        }
    }
}

impl HasDisplayHandle for PlatformWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.event_loop.display_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_follow_config() {
        let cfg = WindowConfig {
            title: "Sandbox".to_owned(),
            width: 800,
            height: 600,
        };
        let attributes = window_attributes(&cfg);
        assert_eq!(attributes.title, "Sandbox");
        assert_eq!(
            attributes.inner_size,
            Some(PhysicalSize::new(800u32, 600u32).into())
        );
    }

    #[test]
    fn zero_sized_config_is_raised_to_one_pixel() {
        let cfg = WindowConfig {
            title: String::new(),
            width: 0,
            height: 0,
        };
        assert_eq!(
            window_attributes(&cfg).inner_size,
            Some(PhysicalSize::new(1u32, 1u32).into())
        );
    }

    #[test]
    fn physical_size_maps_to_render_size() {
        assert_eq!(
            render_size(PhysicalSize::new(1920, 1080)),
            RenderSize {
                width: 1920,
                height: 1080
            }
        );
    }
}
