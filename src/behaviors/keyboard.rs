use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SceneError;
use crate::input::{InputManager, KeyCode};
use crate::math::Transform;

pub const DEFAULT_SPEED: f32 = 0.1;

/// Moves the owner with the arrow keys by `speed` units per update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyboardMovementBehavior {
    pub name: String,
    pub speed: f32,
}

#[derive(Deserialize)]
struct RawKeyboardMovement {
    name: Option<String>,
    speed: Option<f32>,
}

impl KeyboardMovementBehavior {
    pub fn from_json(json: &Value) -> Result<Self, SceneError> {
        let raw = RawKeyboardMovement::deserialize(json).map_err(SceneError::json("keyboard movement behavior"))?;
        Ok(Self {
            name: raw.name.ok_or(SceneError::MissingField { kind: "behavior", field: "name" })?,
            speed: raw.speed.unwrap_or(DEFAULT_SPEED),
        })
    }

    pub(super) fn update(&self, transform: &mut Transform, input: &InputManager) {
        if input.is_key_held(KeyCode::ArrowLeft) {
            transform.position.x -= self.speed;
        }
        if input.is_key_held(KeyCode::ArrowRight) {
            transform.position.x += self.speed;
        }
        // y grows downwards
        if input.is_key_held(KeyCode::ArrowUp) {
            transform.position.y -= self.speed;
        }
        if input.is_key_held(KeyCode::ArrowDown) {
            transform.position.y += self.speed;
        }
    }
}
