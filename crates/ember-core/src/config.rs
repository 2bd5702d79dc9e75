// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub application_name: String,
    pub engine_name: String,
    pub window: WindowConfig,
    pub render: RenderConfig,
    pub shaders: ShaderConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    pub validation: bool,
    pub present_mode: PresentModePreference,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresentModePreference {
    /// Low-latency triple buffering when the surface offers it, FIFO otherwise.
    #[default]
    Mailbox,
    /// Always V-sync FIFO.
    Fifo,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ShaderConfig {
    /// Directory that `Engine:` logical paths resolve into. Built-in shaders when unset.
    pub root: Option<PathBuf>,
    pub vertex: String,
    pub fragment: String,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub target_fps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            application_name: "Sandbox".to_owned(),
            engine_name: "Ember".to_owned(),
            window: WindowConfig::default(),
            render: RenderConfig::default(),
            shaders: ShaderConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            title: "Ember".to_owned(),
            width: 1270,
            height: 900,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            validation: cfg!(debug_assertions),
            present_mode: PresentModePreference::Mailbox,
        }
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        ShaderConfig {
            root: None,
            vertex: "Engine:Shaders/triangle.vert".to_owned(),
            fragment: "Engine:Shaders/triangle.frag".to_owned(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Lenient loading for the binary: a missing file or a malformed one both
    /// yield defaults.
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(cfg) => {
                info!("loaded config from {}", path.display());
                cfg
            }
            Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("no config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("{e}; using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.window.width, 1270);
        assert_eq!(cfg.window.height, 900);
        assert_eq!(cfg.application_name, "Sandbox");
        assert_eq!(cfg.render.validation, cfg!(debug_assertions));
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            application_name = "Demo"
            [window]
            width = 640
            [render]
            present_mode = "fifo"
            validation = false
            [shaders]
            root = "assets"
            [timing]
            target_fps = 60
            "#,
        )
        .unwrap();
        assert_eq!(cfg.application_name, "Demo");
        assert_eq!(cfg.engine_name, "Ember");
        assert_eq!(cfg.window.width, 640);
        assert_eq!(cfg.window.height, 900);
        assert_eq!(cfg.render.present_mode, PresentModePreference::Fifo);
        assert!(!cfg.render.validation);
        assert_eq!(cfg.shaders.root, Some(PathBuf::from("assets")));
        assert_eq!(cfg.shaders.vertex, "Engine:Shaders/triangle.vert");
        assert_eq!(cfg.timing.target_fps, 60);
    }

    #[test]
    fn unknown_present_mode_is_a_parse_error() {
        let err = EngineConfig::from_toml_str("[render]\npresent_mode = \"immediate\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("ember-config-does-not-exist.toml");
        assert!(matches!(
            EngineConfig::read(&path),
            Err(ConfigError::Read { .. })
        ));
        assert_eq!(EngineConfig::load(&path), EngineConfig::default());
    }

    #[test]
    fn malformed_file_loads_defaults() {
        let dir = std::env::temp_dir().join(format!("ember-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.toml");
        fs::write(&path, "[window\nwidth = ").unwrap();
        assert_eq!(EngineConfig::load(&path), EngineConfig::default());
        fs::remove_dir_all(&dir).unwrap();
    }
}
