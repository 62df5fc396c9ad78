//! Behaviors: per-frame logic attached to an entity, independent of rendering.

mod drag;
mod keyboard;
mod rotation;

pub use drag::{PointerDragBehavior, PointerDragData};
pub use keyboard::{DEFAULT_SPEED, KeyboardMovementBehavior};
pub use rotation::RotationBehavior;

use serde_json::{Value, json};

use crate::error::SceneError;
use crate::input::InputManager;
use crate::math::Transform;
use crate::message::MessageBus;
use crate::registry::BuilderRegistry;

pub const KEYBOARD_MOVEMENT: &str = "keyboardMovement";
pub const POINTER_DRAG: &str = "ComponentMovement";
pub const ROTATION: &str = "rotation";

#[derive(Debug)]
pub enum Behavior {
    KeyboardMovement(KeyboardMovementBehavior),
    PointerDrag(PointerDragBehavior),
    Rotation(RotationBehavior),
}

fn build_keyboard(json: &Value, _bus: &MessageBus) -> Result<Behavior, SceneError> {
    Ok(Behavior::KeyboardMovement(KeyboardMovementBehavior::from_json(json)?))
}

fn build_drag(json: &Value, bus: &MessageBus) -> Result<Behavior, SceneError> {
    Ok(Behavior::PointerDrag(PointerDragBehavior::from_json(json, bus)?))
}

fn build_rotation(json: &Value, _bus: &MessageBus) -> Result<Behavior, SceneError> {
    Ok(Behavior::Rotation(RotationBehavior::from_json(json)?))
}

impl Behavior {
    pub fn registry() -> Result<BuilderRegistry<Behavior>, SceneError> {
        let mut registry = BuilderRegistry::new("behavior");
        registry.register(KEYBOARD_MOVEMENT, build_keyboard)?;
        registry.register(POINTER_DRAG, build_drag)?;
        registry.register(ROTATION, build_rotation)?;
        Ok(registry)
    }

    pub fn name(&self) -> &str {
        match self {
            Behavior::KeyboardMovement(b) => &b.name,
            Behavior::PointerDrag(b) => &b.data().name,
            Behavior::Rotation(b) => &b.name,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Behavior::KeyboardMovement(_) => KEYBOARD_MOVEMENT,
            Behavior::PointerDrag(_) => POINTER_DRAG,
            Behavior::Rotation(_) => ROTATION,
        }
    }

    /// Runs after the owner's components; changes to `transform` show up in
    /// the next frame's matrices.
    pub fn update(&mut self, _delta_time: f32, transform: &mut Transform, input: &InputManager) {
        match self {
            Behavior::KeyboardMovement(b) => b.update(transform, input),
            Behavior::PointerDrag(b) => b.update(transform, input),
            Behavior::Rotation(b) => b.update(transform),
        }
    }

    /// Drops every bus subscription taken at build time.
    pub fn dispose(&mut self, bus: &MessageBus) {
        if let Behavior::PointerDrag(b) = self {
            b.dispose(bus);
        }
    }

    pub fn describe(&self) -> Value {
        let data = match self {
            Behavior::KeyboardMovement(b) => serde_json::to_value(b),
            Behavior::PointerDrag(b) => serde_json::to_value(b.data()),
            Behavior::Rotation(b) => serde_json::to_value(b),
        };
        let mut value = data.unwrap_or_else(|_| json!({ "name": self.name() }));
        if let Value::Object(map) = &mut value {
            map.insert("type".into(), Value::String(self.type_tag().into()));
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyCode;
    use crate::math::Vector3;
    use crate::message::{MOUSE_DOWN, Payload, hover_code};

    #[test]
    fn behaviors_require_a_name() {
        let registry = Behavior::registry().unwrap();
        let result = registry.extract(&json!({"type": "rotation"}), &MessageBus::default());
        assert!(matches!(result, Err(SceneError::MissingField { field: "name", .. })));
    }

    #[test]
    fn keyboard_movement_uses_default_speed() {
        let registry = Behavior::registry().unwrap();
        let bus = MessageBus::default();
        let mut behavior = registry.extract(&json!({"type": "keyboardMovement", "name": "k"}), &bus).unwrap();
        let mut input = InputManager::new(bus);
        input.key_down(KeyCode::ArrowUp);
        input.key_down(KeyCode::ArrowRight);
        let mut transform = Transform::default();
        behavior.update(0.016, &mut transform, &input);
        assert_eq!(transform.position, Vector3::new(0.1, -0.1, 0.0));
    }

    #[test]
    fn rotation_accumulates() {
        let registry = Behavior::registry().unwrap();
        let bus = MessageBus::default();
        let mut behavior = registry
            .extract(&json!({"type": "rotation", "name": "r", "rotation": {"z": 0.5}}), &bus)
            .unwrap();
        let mut transform = Transform::default();
        let input = InputManager::new(bus);
        behavior.update(0.0, &mut transform, &input);
        behavior.update(0.0, &mut transform, &input);
        assert_eq!(transform.rotation.z, 1.0);
    }

    #[test]
    fn pointer_drag_follows_pointer_when_armed() {
        let registry = Behavior::registry().unwrap();
        let bus = MessageBus::default();
        let mut behavior = registry
            .extract(&json!({"type": "ComponentMovement", "name": "d", "ownerName": "box"}), &bus)
            .unwrap();
        let mut input = InputManager::new(bus.clone());
        input.mouse_moved(40.0, 30.0);
        input.key_down(KeyCode::ControlLeft);

        let mut transform = Transform::default();
        behavior.update(0.0, &mut transform, &input);
        assert_eq!(transform.position, Vector3::zero());

        bus.send_priority(MOUSE_DOWN, None, Payload::None);
        bus.send_priority(hover_code("box"), None, Payload::None);
        behavior.update(0.0, &mut transform, &input);
        assert_eq!(transform.position, Vector3::new(40.0, 30.0, 0.0));
    }

    #[test]
    fn dispose_drops_subscriptions() {
        let registry = Behavior::registry().unwrap();
        let bus = MessageBus::default();
        let mut behavior = registry
            .extract(&json!({"type": "ComponentMovement", "name": "d", "ownerName": "box"}), &bus)
            .unwrap();
        assert_eq!(bus.subscriber_count(MOUSE_DOWN), 1);
        behavior.dispose(&bus);
        assert_eq!(bus.subscriber_count(MOUSE_DOWN), 0);
        assert_eq!(bus.subscriber_count(&hover_code("box")), 0);
    }
}
