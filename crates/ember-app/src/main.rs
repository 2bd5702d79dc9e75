// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ember_core::{init_tracing, Engine, EngineConfig};
use ember_platform::PlatformWindow;
use ember_render::{RenderManager, ShaderSource};
use ember_render_vk::{BuiltinShaders, DirectoryShaders, VkRenderer, VkSettings};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Engine config file
    #[arg(long, default_value = "ember.toml")]
    config: PathBuf,

    /// Disable Vulkan validation layers even in debug builds
    #[arg(long)]
    no_validation: bool,

    /// Exit after this many frames
    #[arg(long)]
    frames: Option<u64>,
}

fn load_cfg(args: &Args) -> EngineConfig {
    let mut cfg = EngineConfig::load(&args.config);
    if args.no_validation {
        cfg.render.validation = false;
    }
    cfg
}

fn shader_source(cfg: &EngineConfig) -> Box<dyn ShaderSource> {
    match &cfg.shaders.root {
        Some(root) => {
            info!("shaders from {}", root.display());
            Box::new(DirectoryShaders::new(root))
        }
        None => Box::new(BuiltinShaders),
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = load_cfg(&args);

    let mut engine = Engine::new(cfg.clone());
    engine.set_frame_limit(args.frames);

    let window = PlatformWindow::open(&cfg.window).context("open window")?;
    let renderer = VkRenderer::new(
        window,
        shader_source(&cfg),
        VkSettings::from_config(&cfg),
        engine.logger(),
    );
    engine.register(RenderManager::new(renderer))?;

    if let Err(e) = engine.init() {
        engine.shutdown();
        return Err(e.context("engine init"));
    }

    while !engine.has_requested_exit() {
        engine.tick();
    }

    engine.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let args = Args::parse_from(["ember"]);
        assert_eq!(args.config, PathBuf::from("ember.toml"));
        assert!(!args.no_validation);
        assert_eq!(args.frames, None);
    }

    #[test]
    fn no_validation_overrides_config() {
        let args = Args::parse_from([
            "ember",
            "--config",
            "/definitely/missing/ember.toml",
            "--no-validation",
            "--frames",
            "3",
        ]);
        assert_eq!(args.frames, Some(3));
        let cfg = load_cfg(&args);
        assert!(!cfg.render.validation);
        assert_eq!(cfg.window, EngineConfig::default().window);
    }
}
