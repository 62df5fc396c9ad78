use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::EngineContext;
use crate::error::{RenderError, SceneError};
use crate::graphics::{DEFAULT_SPRITE_SIZE, Sprite};
use crate::math::{Matrix4x4, Vector3};
use crate::renderer::RenderView;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteComponentData {
    pub name: String,
    pub material_name: String,
    pub width: f32,
    pub height: f32,
    pub origin: Vector3,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpriteData {
    name: Option<String>,
    material_name: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
    origin: Option<Value>,
}

impl SpriteComponentData {
    /// `materialName` is required; `name` falls back to the material name.
    pub fn from_json(json: &Value) -> Result<Self, SceneError> {
        let raw = RawSpriteData::deserialize(json).map_err(SceneError::json("sprite component"))?;
        let material_name = raw
            .material_name
            .ok_or(SceneError::MissingField { kind: "sprite component", field: "materialName" })?;
        let mut origin = Vector3::zero();
        if let Some(value) = &raw.origin {
            origin.set_from_json(value)?;
        }
        Ok(Self {
            name: raw.name.unwrap_or_else(|| material_name.clone()),
            material_name,
            width: raw.width.unwrap_or(DEFAULT_SPRITE_SIZE),
            height: raw.height.unwrap_or(DEFAULT_SPRITE_SIZE),
            origin,
        })
    }
}

/// Draws a textured quad at the owner's world transform.
pub struct SpriteComponent {
    data: SpriteComponentData,
    sprite: Sprite,
}

impl SpriteComponent {
    pub fn new(data: SpriteComponentData) -> Self {
        let mut sprite = Sprite::new(&data.name, &data.material_name, data.width, data.height);
        sprite.set_origin(data.origin);
        Self { data, sprite }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn data(&self) -> &SpriteComponentData {
        &self.data
    }

    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    pub(super) fn load(&mut self, ctx: &mut EngineContext) -> Result<(), RenderError> {
        self.sprite.load(&mut ctx.materials, &mut ctx.textures, &mut ctx.shaders)
    }

    pub(super) fn update(&mut self, ctx: &mut EngineContext) {
        self.sprite.acquire_if_registered(&mut ctx.materials, &mut ctx.textures, &mut ctx.shaders);
    }

    pub(super) fn render(&self, world: &Matrix4x4, view: &RenderView, ctx: &EngineContext) {
        self.sprite.draw(world, view, &ctx.materials, &ctx.shaders, &ctx.gpu);
    }

    pub(super) fn dispose(&mut self, ctx: &mut EngineContext) {
        self.sprite.destroy(&mut ctx.materials, &mut ctx.textures, &mut ctx.shaders);
    }
}
