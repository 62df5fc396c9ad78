//! The page backdrop drawn behind a level's objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::EngineContext;
use crate::error::{RenderError, SceneError};
use crate::graphics::Sprite;
use crate::math::{Matrix4x4, Vector3};
use crate::message::MessageBus;
use crate::registry::BuilderRegistry;
use crate::renderer::RenderView;

pub const PAGE: &str = "page";

/// The editor shows pages at two thirds of their nominal size.
pub const PAGE_DISPLAY_SCALE: f32 = 1.5;

/// Horizontal room kept free for the inspector panel.
pub const PAGE_SIDE_PANEL_WIDTH: f32 = 350.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub name: String,
    pub material_name: String,
    pub width: f32,
    pub height: f32,
    pub origin: Vector3,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageData {
    name: Option<String>,
    material_name: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
    origin: Option<Value>,
}

impl PageData {
    pub fn from_json(json: &Value) -> Result<Self, SceneError> {
        let raw = RawPageData::deserialize(json).map_err(SceneError::json("page config"))?;
        let mut origin = Vector3::zero();
        if let Some(value) = &raw.origin {
            origin.set_from_json(value)?;
        }
        Ok(Self {
            name: raw.name.ok_or(SceneError::MissingField { kind: "page config", field: "name" })?,
            material_name: raw
                .material_name
                .ok_or(SceneError::MissingField { kind: "page config", field: "materialName" })?,
            width: raw.width.ok_or(SceneError::MissingField { kind: "page config", field: "width" })?,
            height: raw.height.ok_or(SceneError::MissingField { kind: "page config", field: "height" })?,
            origin,
        })
    }
}

/// A sheet of paper: a sprite scaled down by [`PAGE_DISPLAY_SCALE`].
pub struct PagePanel {
    data: PageData,
    sprite: Sprite,
}

impl PagePanel {
    pub fn new(data: PageData) -> Self {
        let mut sprite = Sprite::new(
            &data.name,
            &data.material_name,
            data.width / PAGE_DISPLAY_SCALE,
            data.height / PAGE_DISPLAY_SCALE,
        );
        sprite.set_origin(data.origin);
        Self { data, sprite }
    }

    pub fn data(&self) -> &PageData {
        &self.data
    }

    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }
}

pub enum PageConfig {
    Page(PagePanel),
}

fn build_page(json: &Value, _bus: &MessageBus) -> Result<PageConfig, SceneError> {
    Ok(PageConfig::Page(PagePanel::new(PageData::from_json(json)?)))
}

impl PageConfig {
    pub fn registry() -> Result<BuilderRegistry<PageConfig>, SceneError> {
        let mut registry = BuilderRegistry::new("page");
        registry.register(PAGE, build_page)?;
        Ok(registry)
    }

    pub fn name(&self) -> &str {
        match self {
            PageConfig::Page(p) => &p.data.name,
        }
    }

    pub fn load(&mut self, ctx: &mut EngineContext) -> Result<(), RenderError> {
        match self {
            PageConfig::Page(p) => p.sprite.load(&mut ctx.materials, &mut ctx.textures, &mut ctx.shaders),
        }
    }

    pub fn update(&mut self, ctx: &mut EngineContext) {
        match self {
            PageConfig::Page(p) => p.sprite.acquire_if_registered(&mut ctx.materials, &mut ctx.textures, &mut ctx.shaders),
        }
    }

    pub fn render(&self, world: &Matrix4x4, view: &RenderView, ctx: &EngineContext) {
        match self {
            PageConfig::Page(p) => p.sprite.draw(world, view, &ctx.materials, &ctx.shaders, &ctx.gpu),
        }
    }

    pub fn dispose(&mut self, ctx: &mut EngineContext) {
        match self {
            PageConfig::Page(p) => p.sprite.destroy(&mut ctx.materials, &mut ctx.textures, &mut ctx.shaders),
        }
    }
}

impl std::fmt::Debug for PageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PageConfig").field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn page_is_shown_at_two_thirds_size() {
        let registry = PageConfig::registry().unwrap();
        let page = registry
            .extract(
                &json!({"type": "page", "name": "p", "materialName": "paper", "width": 600, "height": 900}),
                &MessageBus::default(),
            )
            .unwrap();
        let PageConfig::Page(panel) = page;
        assert_eq!(panel.sprite().width(), 400.0);
        assert_eq!(panel.sprite().height(), 600.0);
    }

    #[test]
    fn unknown_page_type_is_rejected() {
        let registry = PageConfig::registry().unwrap();
        let result = registry.extract(&json!({"type": "poster", "name": "p"}), &MessageBus::default());
        assert!(matches!(result, Err(SceneError::UnknownType { .. })));
    }
}
