//! Shader binaries by logical path.
//!
//! Logical paths look like `Engine:Shaders/triangle.vert`. [`BuiltinShaders`]
//! serves the two shaders compiled by `build.rs`; [`DirectoryShaders`] maps
//! `Engine:` onto a directory and reads `<path>.spv` from it.
use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use ash::util::read_spv;
use ember_render::{ShaderError, ShaderSource};
use tracing::{debug, info};

use crate::error::VkInitError;

pub const VERTEX_SHADER: &str = "Engine:Shaders/triangle.vert";
pub const FRAGMENT_SHADER: &str = "Engine:Shaders/triangle.frag";

const ENGINE_PREFIX: &str = "Engine:";
const SPIRV_MAGIC: u32 = 0x0723_0203;

static TRIANGLE_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/triangle.vert.spv"));
static TRIANGLE_FRAG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/triangle.frag.spv"));

#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinShaders;

impl ShaderSource for BuiltinShaders {
    fn load(&self, logical_path: &str) -> Result<Vec<u8>, ShaderError> {
        match logical_path {
            VERTEX_SHADER => Ok(TRIANGLE_VERT.to_vec()),
            FRAGMENT_SHADER => Ok(TRIANGLE_FRAG.to_vec()),
            other => Err(ShaderError::UnknownPath(other.to_owned())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DirectoryShaders {
    root: PathBuf,
}

impl DirectoryShaders {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `Engine:Shaders/x.vert` -> `<root>/Shaders/x.vert.spv`. Paths that
    /// would climb out of the root are refused.
    pub fn resolve(&self, logical_path: &str) -> Result<PathBuf, ShaderError> {
        let unknown = || ShaderError::UnknownPath(logical_path.to_owned());
        let rel = Path::new(logical_path.strip_prefix(ENGINE_PREFIX).ok_or_else(unknown)?);
        if rel.as_os_str().is_empty()
            || !rel.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(unknown());
        }
        let mut file = self.root.join(rel).into_os_string();
        file.push(".spv");
        Ok(PathBuf::from(file))
    }

    fn compile_file(compiler: &shaderc::Compiler, path: &Path) -> Result<(), ShaderError> {
        let kind = match path.extension().and_then(|e| e.to_str()) {
            Some("vert") => shaderc::ShaderKind::Vertex,
            Some("frag") => shaderc::ShaderKind::Fragment,
            _ => return Ok(()),
        };
        let source = fs::read_to_string(path).map_err(|source| ShaderError::Read {
            path: path.to_owned(),
            source,
        })?;
        let name = path.display().to_string();
        let artifact = compiler
            .compile_into_spirv(&source, kind, &name, "main", None)
            .map_err(|e| ShaderError::Compile {
                path: path.to_owned(),
                message: e.to_string(),
            })?;

        let mut out = path.as_os_str().to_owned();
        out.push(".spv");
        let out = PathBuf::from(out);
        fs::write(&out, artifact.as_binary_u8()).map_err(|source| ShaderError::Write {
            path: out.clone(),
            source,
        })?;
        debug!("compiled {name}");
        Ok(())
    }
}

fn collect_sources(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), ShaderError> {
    let entries = fs::read_dir(dir).map_err(|source| ShaderError::Read {
        path: dir.to_owned(),
        source,
    })?;
    for entry in entries {
        let path = entry
            .map_err(|source| ShaderError::Read {
                path: dir.to_owned(),
                source,
            })?
            .path();
        if path.is_dir() {
            collect_sources(&path, found)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("vert" | "frag")
        ) {
            found.push(path);
        }
    }
    Ok(())
}

impl ShaderSource for DirectoryShaders {
    fn load(&self, logical_path: &str) -> Result<Vec<u8>, ShaderError> {
        let path = self.resolve(logical_path)?;
        fs::read(&path).map_err(|source| ShaderError::Read { path, source })
    }

    /// Debug builds only: GLSL under `<root>/Shaders` becomes sibling `.spv` files.
    fn compile_all(&self) -> Result<(), ShaderError> {
        if !cfg!(debug_assertions) {
            return Ok(());
        }
        let dir = self.root.join("Shaders");
        if !dir.is_dir() {
            return Ok(());
        }

        let mut sources = Vec::new();
        collect_sources(&dir, &mut sources)?;
        if sources.is_empty() {
            return Ok(());
        }
        sources.sort();

        let compiler = shaderc::Compiler::new()
            .into_iter()
            .next()
            .ok_or_else(|| ShaderError::Compile {
                path: dir.clone(),
                message: "shaderc compiler unavailable".to_owned(),
            })?;
        for path in &sources {
            Self::compile_file(&compiler, path)?;
        }
        info!("compiled {} shader(s) under {}", sources.len(), dir.display());
        Ok(())
    }
}

/// Words of a SPIR-V blob, endian-corrected.
pub fn decode_spirv(path: &str, bytes: &[u8]) -> Result<Vec<u32>, VkInitError> {
    let invalid = |reason: &str| VkInitError::InvalidSpirv {
        path: path.to_owned(),
        reason: reason.to_owned(),
    };
    if bytes.len() % 4 != 0 {
        return Err(invalid("length is not a multiple of 4"));
    }
    let words = read_spv(&mut Cursor::new(bytes)).map_err(|e| invalid(&e.to_string()))?;
    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        Some(_) => Err(invalid("bad magic number")),
        None => Err(invalid("empty")),
    }
}
