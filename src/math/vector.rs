use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SceneError;

/// Partially specified vector as it appears in scene JSON.
///
/// Absent components keep whatever the target vector already holds, so a
/// `scale` of `{ "x": 2 }` leaves y and z at 1.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct VectorJson {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl VectorJson {
    pub fn from_value(json: &Value) -> Result<Self, SceneError> {
        VectorJson::deserialize(json).map_err(SceneError::json("vector"))
    }
}

// =============================================================================
// VECTOR2
// =============================================================================

/// Mutable 2D vector. Arithmetic methods mutate in place and return `&mut Self`
/// so calls can be chained; the type is `Copy` for value-semantics use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    pub const fn one() -> Self {
        Self::new(1.0, 1.0)
    }

    pub fn set(&mut self, x: f32, y: f32) -> &mut Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn copy_from(&mut self, other: Vector2) -> &mut Self {
        *self = other;
        self
    }

    pub fn add(&mut self, other: Vector2) -> &mut Self {
        self.x += other.x;
        self.y += other.y;
        self
    }

    pub fn subtract(&mut self, other: Vector2) -> &mut Self {
        self.x -= other.x;
        self.y -= other.y;
        self
    }

    pub fn multiply(&mut self, other: Vector2) -> &mut Self {
        self.x *= other.x;
        self.y *= other.y;
        self
    }

    pub fn divide(&mut self, other: Vector2) -> &mut Self {
        self.x /= other.x;
        self.y /= other.y;
        self
    }

    pub fn distance(a: Vector2, b: Vector2) -> f32 {
        Vec2::from(a).distance(Vec2::from(b))
    }

    pub fn to_vector3(self) -> Vector3 {
        Vector3::new(self.x, self.y, 0.0)
    }

    pub fn set_from_json(&mut self, json: &Value) -> Result<&mut Self, SceneError> {
        let raw = VectorJson::from_value(json)?;
        if let Some(x) = raw.x {
            self.x = x;
        }
        if let Some(y) = raw.y {
            self.y = y;
        }
        Ok(self)
    }
}

impl From<Vector2> for Vec2 {
    fn from(v: Vector2) -> Self {
        Vec2::new(v.x, v.y)
    }
}

impl From<Vec2> for Vector2 {
    fn from(v: Vec2) -> Self {
        Vector2::new(v.x, v.y)
    }
}

// =============================================================================
// VECTOR3
// =============================================================================

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn one() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    pub fn set(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self
    }

    pub fn copy_from(&mut self, other: Vector3) -> &mut Self {
        *self = other;
        self
    }

    pub fn add(&mut self, other: Vector3) -> &mut Self {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
        self
    }

    pub fn subtract(&mut self, other: Vector3) -> &mut Self {
        self.x -= other.x;
        self.y -= other.y;
        self.z -= other.z;
        self
    }

    pub fn multiply(&mut self, other: Vector3) -> &mut Self {
        self.x *= other.x;
        self.y *= other.y;
        self.z *= other.z;
        self
    }

    pub fn divide(&mut self, other: Vector3) -> &mut Self {
        self.x /= other.x;
        self.y /= other.y;
        self.z /= other.z;
        self
    }

    pub fn distance(a: Vector3, b: Vector3) -> f32 {
        Vec3::from(a).distance(Vec3::from(b))
    }

    pub fn to_vector2(self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    pub fn set_from_json(&mut self, json: &Value) -> Result<&mut Self, SceneError> {
        let raw = VectorJson::from_value(json)?;
        Ok(self.apply_json(raw))
    }

    pub fn apply_json(&mut self, raw: VectorJson) -> &mut Self {
        if let Some(x) = raw.x {
            self.x = x;
        }
        if let Some(y) = raw.y {
            self.y = y;
        }
        if let Some(z) = raw.z {
            self.z = z;
        }
        self
    }
}

impl From<Vector3> for Vec3 {
    fn from(v: Vector3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for Vector3 {
    fn from(v: Vec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}
