use std::collections::HashSet;

pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

use crate::math::Vector2;
use crate::message::{MOUSE_DOWN, MOUSE_UP, MessageBus, Payload};

/// Pointer state attached to `MOUSE_DOWN` / `MOUSE_UP` messages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseContext {
    pub left_down: bool,
    pub right_down: bool,
    pub position: Vector2,
}

/// Keyboard and pointer state for one engine.
///
/// Button transitions are announced on the message bus; everything else is
/// polled by behaviors during their update.
pub struct InputManager {
    bus: MessageBus,

    pub keys_held: HashSet<KeyCode>,
    pub keys_pressed: HashSet<KeyCode>,
    pub keys_released: HashSet<KeyCode>,

    mouse_position: Vector2,
    previous_mouse_position: Vector2,
    left_down: bool,
    right_down: bool,
    /// Multiplier from window pixels to scene units.
    resolution_scale: Vector2,
    pointer_inside: bool,
}

impl InputManager {
    pub fn new(bus: MessageBus) -> Self {
        Self {
            bus,
            keys_held: HashSet::new(),
            keys_pressed: HashSet::new(),
            keys_released: HashSet::new(),
            mouse_position: Vector2::zero(),
            previous_mouse_position: Vector2::zero(),
            left_down: false,
            right_down: false,
            resolution_scale: Vector2::one(),
            pointer_inside: false,
        }
    }

    pub fn clear_frame_state(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.previous_mouse_position = self.mouse_position;
    }

    pub fn key_down(&mut self, key: KeyCode) {
        if self.keys_held.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: KeyCode) {
        self.keys_held.remove(&key);
        self.keys_released.insert(key);
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool { self.keys_held.contains(&key) }
    pub fn is_key_pressed(&self, key: KeyCode) -> bool { self.keys_pressed.contains(&key) }
    pub fn is_key_released(&self, key: KeyCode) -> bool { self.keys_released.contains(&key) }

    /// Records a pointer move given in window pixels.
    pub fn mouse_moved(&mut self, x: f32, y: f32) {
        self.mouse_position = Vector2::new(x * self.resolution_scale.x, y * self.resolution_scale.y);
        self.pointer_inside = true;
    }

    pub fn mouse_left_window(&mut self) {
        self.pointer_inside = false;
    }

    pub fn mouse_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.left_down = pressed,
            MouseButton::Right => self.right_down = pressed,
            _ => return,
        }
        let code = if pressed { MOUSE_DOWN } else { MOUSE_UP };
        self.bus.send(code, Some("input"), Payload::Mouse(self.mouse_context()));
    }

    pub fn mouse_context(&self) -> MouseContext {
        MouseContext {
            left_down: self.left_down,
            right_down: self.right_down,
            position: self.mouse_position,
        }
    }

    pub fn mouse_position(&self) -> Vector2 {
        self.mouse_position
    }

    /// Pointer position while it is over the window.
    pub fn pointer(&self) -> Option<Vector2> {
        self.pointer_inside.then_some(self.mouse_position)
    }

    pub fn mouse_delta(&self) -> Vector2 {
        let mut delta = self.mouse_position;
        delta.subtract(self.previous_mouse_position);
        delta
    }

    pub fn is_left_down(&self) -> bool { self.left_down }
    pub fn is_right_down(&self) -> bool { self.right_down }

    pub fn set_resolution_scale(&mut self, scale: Vector2) {
        self.resolution_scale = scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Mailbox, Subscriber};

    #[test]
    fn key_press_is_reported_once() {
        let mut input = InputManager::new(MessageBus::default());
        input.key_down(KeyCode::ArrowLeft);
        input.key_down(KeyCode::ArrowLeft);
        assert!(input.is_key_pressed(KeyCode::ArrowLeft));
        input.clear_frame_state();
        input.key_down(KeyCode::ArrowLeft);
        assert!(!input.is_key_pressed(KeyCode::ArrowLeft));
        assert!(input.is_key_held(KeyCode::ArrowLeft));
    }

    #[test]
    fn button_transitions_are_announced() {
        let bus = MessageBus::default();
        let mailbox = Mailbox::new();
        bus.subscribe(MOUSE_DOWN, Subscriber::handler(&mailbox));
        let mut input = InputManager::new(bus.clone());

        input.mouse_moved(40.0, 30.0);
        input.mouse_button(MouseButton::Left, true);
        bus.update(0.0);

        let messages = mailbox.drain();
        assert_eq!(messages.len(), 1);
        match messages[0].payload {
            Payload::Mouse(ctx) => {
                assert!(ctx.left_down);
                assert_eq!(ctx.position, Vector2::new(40.0, 30.0));
            }
            ref other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn resolution_scale_applies_to_pointer() {
        let mut input = InputManager::new(MessageBus::default());
        input.set_resolution_scale(Vector2::new(0.5, 2.0));
        input.mouse_moved(100.0, 10.0);
        assert_eq!(input.pointer(), Some(Vector2::new(50.0, 20.0)));
    }
}
