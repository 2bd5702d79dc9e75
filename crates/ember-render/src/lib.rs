// SPDX-License-Identifier: CEPL-1.0
use std::any::Any;
use std::io;
use std::path::PathBuf;

use anyhow::Result;
use ember_core::Subsystem;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use thiserror::Error;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowStatus {
    Open,
    CloseRequested,
}

/// What a backend needs from the windowing layer.
pub trait WindowHost: HasWindowHandle + HasDisplayHandle {
    /// Current framebuffer size in physical pixels.
    fn framebuffer_size(&self) -> RenderSize;

    /// Drains pending window events; called once per frame.
    fn poll(&mut self) -> WindowStatus;
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("unknown shader path `{0}`")]
    UnknownPath(String),
    #[error("failed to read shader {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write shader {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to compile {}: {message}", path.display())]
    Compile { path: PathBuf, message: String },
}

/// Supplies compiled shader binaries by logical path (`Engine:Shaders/…`).
pub trait ShaderSource {
    fn load(&self, logical_path: &str) -> Result<Vec<u8>, ShaderError>;

    /// Ahead-of-time compilation hook for non-shipping builds.
    fn compile_all(&self) -> Result<(), ShaderError> {
        Ok(())
    }
}

impl<S: ShaderSource + ?Sized> ShaderSource for Box<S> {
    fn load(&self, logical_path: &str) -> Result<Vec<u8>, ShaderError> {
        (**self).load(logical_path)
    }

    fn compile_all(&self) -> Result<(), ShaderError> {
        (**self).compile_all()
    }
}

/// A graphics backend. Exactly one implementation is compiled into the binary.
pub trait RenderBackend {
    fn name(&self) -> &'static str;
    fn init(&mut self) -> Result<()>;
    fn tick(&mut self) -> Result<()>;
    fn shutdown(&mut self);
}

/// Adapts a [`RenderBackend`] into an engine [`Subsystem`].
pub struct RenderManager<B> {
    backend: B,
}

impl<B: RenderBackend> RenderManager<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: RenderBackend + 'static> Subsystem for RenderManager<B> {
    fn name(&self) -> &'static str {
        "RenderManager"
    }

    fn init(&mut self) -> Result<()> {
        info!("render backend = {}", self.backend.name());
        self.backend.init()
    }

    fn tick(&mut self, _delta_ms: f32) -> Result<()> {
        self.backend.tick()
    }

    fn shutdown(&mut self) {
        self.backend.shutdown();
    }

    fn is_ticking(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
