use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SceneError;
use crate::math::{Transform, Vector3};

/// Adds a fixed rotation (radians per axis) on every update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationBehavior {
    pub name: String,
    pub rotation: Vector3,
}

#[derive(Deserialize)]
struct RawRotation {
    name: Option<String>,
    rotation: Option<Value>,
}

impl RotationBehavior {
    pub fn from_json(json: &Value) -> Result<Self, SceneError> {
        let raw = RawRotation::deserialize(json).map_err(SceneError::json("rotation behavior"))?;
        let mut rotation = Vector3::zero();
        if let Some(value) = &raw.rotation {
            rotation.set_from_json(value)?;
        }
        Ok(Self {
            name: raw.name.ok_or(SceneError::MissingField { kind: "behavior", field: "name" })?,
            rotation,
        })
    }

    pub(super) fn update(&self, transform: &mut Transform) {
        transform.rotation.add(self.rotation);
    }
}
