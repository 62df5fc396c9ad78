use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Matrix4x4, Vector3, VectorJson};
use crate::error::SceneError;

/// Position, rotation (radians, applied x then y then z) and scale of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub position: Vector3,
    pub rotation: Vector3,
    pub scale: Vector3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Vector3::zero(),
            scale: Vector3::one(),
        }
    }
}

#[derive(Deserialize)]
struct TransformJson {
    position: Option<VectorJson>,
    rotation: Option<VectorJson>,
    scale: Option<VectorJson>,
}

impl Transform {
    /// `translation * rotation * scale`, rebuilt on every call.
    pub fn transformation_matrix(&self) -> Matrix4x4 {
        let translation = Matrix4x4::translation(self.position);
        let rotation = Matrix4x4::rotation_xyz(self.rotation.x, self.rotation.y, self.rotation.z);
        let scale = Matrix4x4::scale(self.scale);
        translation * rotation * scale
    }

    pub fn set_from_json(&mut self, json: &Value) -> Result<(), SceneError> {
        let raw = TransformJson::deserialize(json).map_err(SceneError::json("transform"))?;
        if let Some(position) = raw.position {
            self.position.apply_json(position);
        }
        if let Some(rotation) = raw.rotation {
            self.rotation.apply_json(rotation);
        }
        if let Some(scale) = raw.scale {
            self.scale.apply_json(scale);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_matrix_is_identity() {
        assert_eq!(Transform::default().transformation_matrix(), Matrix4x4::identity());
    }

    #[test]
    fn scale_applies_before_translation() {
        let mut t = Transform::default();
        t.position = Vector3::new(5.0, 0.0, 0.0);
        t.scale = Vector3::new(3.0, 1.0, 1.0);
        let p = t.transformation_matrix().transform_point4([1.0, 0.0, 0.0]);
        assert_eq!(p, [8.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn json_only_touches_present_parts() {
        let mut t = Transform::default();
        t.set_from_json(&json!({ "position": { "x": 10, "y": 5 } })).unwrap();
        assert_eq!(t.position, Vector3::new(10.0, 5.0, 0.0));
        assert_eq!(t.scale, Vector3::one());
    }
}
