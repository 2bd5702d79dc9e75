// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod engine;
pub mod exit;
pub mod logging;
pub mod subsystem;
pub mod timer;

pub use config::{
    ConfigError, EngineConfig, PresentModePreference, RenderConfig, ShaderConfig, TimingConfig,
    WindowConfig,
};
pub use engine::Engine;
pub use exit::ExitSignal;
pub use logging::{Logger, Severity};
pub use subsystem::{Subsystem, SubsystemError, SubsystemRegistry};
pub use timer::FrameTimer;

/// Installs the global `tracing` subscriber. Falls back to `info` when
/// `RUST_LOG` is unset; safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
