use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::RenderError;
use crate::renderer::{Gpu, ShaderId};

pub const BASIC_SHADER: &str = "basic";

/// A named WGSL module with `vs_main` and `fs_main` entry points taking
/// [`SpriteVertex`](crate::renderer::SpriteVertex) input.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSource {
    pub name: String,
    pub wgsl: String,
}

impl ShaderSource {
    pub fn new(name: impl Into<String>, wgsl: impl Into<String>) -> Self {
        Self { name: name.into(), wgsl: wgsl.into() }
    }

    /// Textured, tinted quads.
    pub fn basic() -> Self {
        Self::new(BASIC_SHADER, include_str!("../renderer/shaders/basic.wgsl"))
    }
}

struct ShaderNode {
    id: ShaderId,
    reference_count: usize,
}

/// Registered shader sources plus reference-counted compiled programs.
pub struct ShaderManager {
    gpu: Gpu,
    sources: HashMap<String, ShaderSource>,
    compiled: HashMap<String, ShaderNode>,
}

impl ShaderManager {
    /// Creates a manager with the built-in [`BASIC_SHADER`] registered.
    pub fn new(gpu: Gpu) -> Self {
        let mut manager = Self { gpu, sources: HashMap::new(), compiled: HashMap::new() };
        manager.register(ShaderSource::basic());
        manager
    }

    pub fn register(&mut self, source: ShaderSource) {
        if self.sources.contains_key(&source.name) {
            warn!(shader = %source.name, "a shader with this name already exists; registration ignored");
            return;
        }
        self.sources.insert(source.name.clone(), source);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Compiles on first use, then counts references.
    ///
    /// `Ok(None)` (with a warning) when no source is registered under `name`.
    pub fn get_shader(&mut self, name: &str) -> Result<Option<ShaderId>, RenderError> {
        if let Some(node) = self.compiled.get_mut(name) {
            node.reference_count += 1;
            return Ok(Some(node.id));
        }
        let Some(source) = self.sources.get(name) else {
            warn!(shader = name, "no shader source registered under this name");
            return Ok(None);
        };
        let id = self.gpu.borrow_mut().compile_shader(source)?;
        debug!(shader = name, "shader compiled");
        self.compiled.insert(name.to_owned(), ShaderNode { id, reference_count: 1 });
        Ok(Some(id))
    }

    pub fn release_shader(&mut self, name: &str) {
        let Some(node) = self.compiled.get_mut(name) else {
            warn!(shader = name, "a shader named {name} does not exist and therefore cannot be released");
            return;
        };
        node.reference_count = node.reference_count.saturating_sub(1);
        if node.reference_count < 1 {
            if let Some(node) = self.compiled.remove(name) {
                self.gpu.borrow_mut().destroy_shader(node.id);
                debug!(shader = name, "shader destroyed");
            }
        }
    }

    /// Compiled program for `name` without touching its reference count.
    pub fn shader_id(&self, name: &str) -> Option<ShaderId> {
        self.compiled.get(name).map(|node| node.id)
    }

    pub fn reference_count(&self, name: &str) -> Option<usize> {
        self.compiled.get(name).map(|node| node.reference_count)
    }
}
