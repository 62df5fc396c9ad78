use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collision::{ColliderKey, Shape2D};
use crate::error::SceneError;
use crate::math::{Matrix4x4, Vector2};
use crate::scene::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionComponentData {
    pub name: String,
    pub shape: Shape2D,
    #[serde(rename = "static")]
    pub is_static: bool,
}

#[derive(Deserialize)]
struct RawCollisionData {
    name: Option<String>,
    shape: Option<Value>,
    #[serde(rename = "static")]
    is_static: Option<bool>,
}

impl CollisionComponentData {
    pub fn from_json(json: &Value) -> Result<Self, SceneError> {
        let raw = RawCollisionData::deserialize(json).map_err(SceneError::json("collision component"))?;
        let shape = raw
            .shape
            .as_ref()
            .ok_or(SceneError::MissingField { kind: "collision component", field: "shape" })?;
        Ok(Self {
            name: raw.name.unwrap_or_else(|| "collision".to_owned()),
            shape: Shape2D::from_json(shape)?,
            is_static: raw.is_static.unwrap_or(true),
        })
    }
}

/// A shape that follows its owner and takes part in collision and hover
/// detection once loaded.
pub struct CollisionComponent {
    data: CollisionComponentData,
    shape: Shape2D,
    /// Overlapping colliders, with the number of scans each has stayed in
    /// contact since its entry.
    contacts: BTreeMap<ColliderKey, u32>,
    registered: bool,
}

impl CollisionComponent {
    pub fn new(data: CollisionComponentData) -> Self {
        Self { shape: data.shape, data, contacts: BTreeMap::new(), registered: false }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn data(&self) -> &CollisionComponentData {
        &self.data
    }

    /// The shape in scene space, as of the last update.
    pub fn shape(&self) -> &Shape2D {
        &self.shape
    }

    pub fn is_static(&self) -> bool {
        self.data.is_static
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub(crate) fn set_registered(&mut self, registered: bool) {
        self.registered = registered;
    }

    /// Colliders currently overlapping this one.
    pub fn contacts(&self) -> impl Iterator<Item = ColliderKey> + '_ {
        self.contacts.keys().copied()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_touching(&self, entity: EntityId) -> bool {
        self.contacts.keys().any(|key| key.entity == entity)
    }

    /// Scans `other` has stayed in contact since entering, or `None` when
    /// it is not touching.
    pub fn contact_updates(&self, other: ColliderKey) -> Option<u32> {
        self.contacts.get(&other).copied()
    }

    pub(crate) fn on_collision_entry(&mut self, other: ColliderKey) {
        self.contacts.insert(other, 0);
    }

    pub(crate) fn on_collision_update(&mut self, other: ColliderKey) {
        *self.contacts.entry(other).or_insert(0) += 1;
    }

    pub(crate) fn on_collision_exit(&mut self, other: ColliderKey) {
        self.contacts.remove(&other);
    }

    /// Moves the shape to the owner's world position plus the shape offset.
    pub(super) fn follow(&mut self, world: &Matrix4x4) {
        let anchor: Vector2 = world.translation_part().to_vector2();
        self.shape.place_at(anchor);
    }
}
