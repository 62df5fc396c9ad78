//! Events exchanged with the editor UI around the engine.
//!
//! Both directions use `{"event": <name>, "detail": {...}}` objects, one per
//! line when carried over a byte stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::context::EngineContext;
use crate::error::EngineError;
use crate::graphics::Color;
use crate::math::Transform;
use crate::scene::{EntityId, SceneGraph};

/// Requests from the UI that mutate engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "detail", rename_all = "camelCase")]
pub enum EditorEvent {
    ChangeMatColor { name: String, r: u8, g: u8, b: u8 },
    ChangeMatTexture { name: String, texture: String },
}

impl EditorEvent {
    pub fn parse(line: &str) -> Result<Self, EngineError> {
        serde_json::from_str(line).map_err(EngineError::Event)
    }

    /// Applies the event. Returns `false` when it names an unknown material.
    pub fn apply(&self, ctx: &mut EngineContext) -> bool {
        let applied = match self {
            EditorEvent::ChangeMatColor { name, r, g, b } => {
                ctx.materials.set_material_tint(name, Color::new(*r, *g, *b, 255))
            }
            EditorEvent::ChangeMatTexture { name, texture } => {
                ctx.materials.set_material_texture(name, texture, &mut ctx.textures)
            }
        };
        if !applied {
            warn!(event = ?self, "editor event targets an unknown material");
        }
        applied
    }
}

/// Notifications from the engine to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "detail", rename_all = "camelCase")]
pub enum OutboundEvent {
    SelectObject {
        name: String,
        transform: Transform,
        components: Vec<Value>,
        behaviors: Vec<Value>,
    },
}

impl OutboundEvent {
    /// Describes entity `id` for the inspector panel.
    pub fn select_object(scene: &SceneGraph, id: EntityId) -> Option<Self> {
        let node = scene.get(id)?;
        Some(OutboundEvent::SelectObject {
            name: node.name().to_owned(),
            transform: node.transform,
            components: node.components().iter().map(|c| c.describe()).collect(),
            behaviors: node.behaviors().iter().map(|b| b.describe()).collect(),
        })
    }

    pub fn to_json_line(&self) -> Result<String, EngineError> {
        serde_json::to_string(self).map_err(EngineError::Event)
    }
}
