use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{BASIC_SHADER, Color, ShaderManager, Texture, TextureManager};
use crate::error::{RenderError, SceneError};

/// Material definition as it appears in a material manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialConfig {
    pub name: String,
    pub shader: String,
    pub diffuse: String,
    pub specular: Option<String>,
    pub tint: Color,
}

#[derive(Deserialize)]
struct RawMaterialConfig {
    name: Option<String>,
    shader: Option<String>,
    diffuse: Option<String>,
    specular: Option<String>,
    tint: Option<Color>,
}

impl MaterialConfig {
    pub fn new(name: impl Into<String>, diffuse: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: BASIC_SHADER.to_owned(),
            diffuse: diffuse.into(),
            specular: None,
            tint: Color::WHITE,
        }
    }

    pub fn from_json(json: &Value) -> Result<Self, SceneError> {
        let raw = RawMaterialConfig::deserialize(json).map_err(SceneError::json("material"))?;
        Ok(Self {
            name: raw.name.ok_or(SceneError::MissingField { kind: "material", field: "name" })?,
            shader: raw.shader.unwrap_or_else(|| BASIC_SHADER.to_owned()),
            diffuse: raw.diffuse.ok_or(SceneError::MissingField { kind: "material", field: "diffuse" })?,
            specular: raw.specular,
            tint: raw.tint.unwrap_or(Color::WHITE),
        })
    }
}

/// A live material: shader name, diffuse texture and tint.
pub struct Material {
    name: String,
    shader: String,
    diffuse_texture_name: String,
    diffuse: Rc<Texture>,
    pub tint: Color,
}

impl Material {
    pub fn name(&self) -> &str { &self.name }
    pub fn shader(&self) -> &str { &self.shader }
    pub fn diffuse_texture_name(&self) -> &str { &self.diffuse_texture_name }
    pub fn diffuse_texture(&self) -> &Rc<Texture> { &self.diffuse }

    /// Swaps the diffuse texture, releasing the previous one.
    pub fn set_diffuse_texture_name(&mut self, name: &str, textures: &mut TextureManager) {
        if name == self.diffuse_texture_name {
            return;
        }
        textures.release_texture(&self.diffuse_texture_name);
        self.diffuse = textures.get_texture(name);
        self.diffuse_texture_name = name.to_owned();
    }

    fn destroy(self, textures: &mut TextureManager, shaders: &mut ShaderManager) {
        textures.release_texture(&self.diffuse_texture_name);
        shaders.release_shader(&self.shader);
    }
}

struct MaterialNode {
    material: Material,
    reference_count: usize,
}

/// Registered material configs and the reference-counted materials built
/// from them.
#[derive(Default)]
pub struct MaterialManager {
    configs: HashMap<String, MaterialConfig>,
    materials: HashMap<String, MaterialNode>,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_config(&mut self, config: MaterialConfig) {
        if self.configs.contains_key(&config.name) {
            warn!(material = %config.name, "material config already registered; keeping the first one");
            return;
        }
        self.configs.insert(config.name.clone(), config);
    }

    /// Registers every entry of `{ "materials": [...] }`. Returns how many were read.
    pub fn load_manifest(&mut self, json: &Value) -> Result<usize, SceneError> {
        let entries = json
            .get("materials")
            .and_then(Value::as_array)
            .ok_or(SceneError::MissingField { kind: "material manifest", field: "materials" })?;
        for entry in entries {
            self.register_config(MaterialConfig::from_json(entry)?);
        }
        Ok(entries.len())
    }

    pub fn config(&self, name: &str) -> Option<&MaterialConfig> {
        self.configs.get(name)
    }

    /// Builds the material on first use, then counts references.
    ///
    /// `Ok(None)` when no config is registered under `name`.
    pub fn get_material(
        &mut self,
        name: &str,
        textures: &mut TextureManager,
        shaders: &mut ShaderManager,
    ) -> Result<Option<&Material>, RenderError> {
        if self.materials.contains_key(name) {
            let node = self.materials.get_mut(name).map(|node| {
                node.reference_count += 1;
                &node.material
            });
            return Ok(node);
        }

        let Some(config) = self.configs.get(name) else {
            warn!(material = name, "no material config registered under this name");
            return Ok(None);
        };

        if shaders.get_shader(&config.shader)?.is_none() {
            warn!(material = name, shader = %config.shader, "material references an unknown shader");
        }
        let material = Material {
            name: config.name.clone(),
            shader: config.shader.clone(),
            diffuse_texture_name: config.diffuse.clone(),
            diffuse: textures.get_texture(&config.diffuse),
            tint: config.tint,
        };
        debug!(material = name, "material created");

        let node = self
            .materials
            .entry(name.to_owned())
            .or_insert(MaterialNode { material, reference_count: 1 });
        Ok(Some(&node.material))
    }

    pub fn release_material(&mut self, name: &str, textures: &mut TextureManager, shaders: &mut ShaderManager) {
        let Some(node) = self.materials.get_mut(name) else {
            warn!(material = name, "cannot release a material which has not been registered");
            return;
        };
        node.reference_count = node.reference_count.saturating_sub(1);
        if node.reference_count < 1 {
            if let Some(node) = self.materials.remove(name) {
                node.material.destroy(textures, shaders);
                debug!(material = name, "material destroyed");
            }
        }
    }

    /// Live material without touching its reference count.
    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name).map(|node| &node.material)
    }

    pub fn reference_count(&self, name: &str) -> Option<usize> {
        self.materials.get(name).map(|node| node.reference_count)
    }

    /// Changes the tint of the config and of the live material, if any.
    pub fn set_material_tint(&mut self, name: &str, tint: Color) -> bool {
        let mut found = false;
        if let Some(config) = self.configs.get_mut(name) {
            config.tint = tint;
            found = true;
        }
        if let Some(node) = self.materials.get_mut(name) {
            node.material.tint = tint;
            found = true;
        }
        if !found {
            warn!(material = name, "cannot change the color of an unknown material");
        }
        found
    }

    /// Points the config and the live material, if any, at another texture.
    pub fn set_material_texture(&mut self, name: &str, texture: &str, textures: &mut TextureManager) -> bool {
        let mut found = false;
        if let Some(config) = self.configs.get_mut(name) {
            config.diffuse = texture.to_owned();
            found = true;
        }
        if let Some(node) = self.materials.get_mut(name) {
            node.material.set_diffuse_texture_name(texture, textures);
            found = true;
        }
        if !found {
            warn!(material = name, "cannot change the texture of an unknown material");
        }
        found
    }
}
