use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SceneError;
use crate::input::{InputManager, KeyCode};
use crate::math::Transform;
use crate::message::{MOUSE_DOWN, MOUSE_UP, Message, MessageBus, MessageHandler, Subscriber, hover_code, hover_exit_code};

#[derive(Debug, Default)]
struct DragState {
    owner: String,
    holding: Cell<bool>,
    hovering: Cell<bool>,
}

impl MessageHandler for DragState {
    fn on_message(&self, message: &Message) {
        match message.code.as_str() {
            MOUSE_DOWN => self.holding.set(true),
            MOUSE_UP => self.holding.set(false),
            code if code == hover_code(&self.owner) => self.hovering.set(true),
            code if code == hover_exit_code(&self.owner) => self.hovering.set(false),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerDragData {
    pub name: String,
    pub owner_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPointerDrag {
    name: Option<String>,
    owner_name: Option<String>,
}

/// Moves its owner to the pointer while the owner is hovered, the left button
/// is held and Left Control is down.
#[derive(Debug)]
pub struct PointerDragBehavior {
    data: PointerDragData,
    state: Rc<DragState>,
    subscribed: bool,
}

impl PointerDragBehavior {
    pub fn from_json(json: &Value, bus: &MessageBus) -> Result<Self, SceneError> {
        let raw = RawPointerDrag::deserialize(json).map_err(SceneError::json("pointer drag behavior"))?;
        let data = PointerDragData {
            name: raw.name.ok_or(SceneError::MissingField { kind: "behavior", field: "name" })?,
            owner_name: raw
                .owner_name
                .ok_or(SceneError::MissingField { kind: "behavior", field: "ownerName" })?,
        };
        let state = Rc::new(DragState { owner: data.owner_name.clone(), ..DragState::default() });
        for code in Self::codes(&data.owner_name) {
            bus.subscribe(code, Subscriber::handler(&state));
        }
        Ok(Self { data, state, subscribed: true })
    }

    fn codes(owner: &str) -> [String; 4] {
        [MOUSE_DOWN.to_owned(), MOUSE_UP.to_owned(), hover_code(owner), hover_exit_code(owner)]
    }

    pub fn data(&self) -> &PointerDragData {
        &self.data
    }

    pub fn is_holding(&self) -> bool {
        self.state.holding.get()
    }

    pub fn is_hovering(&self) -> bool {
        self.state.hovering.get()
    }

    pub(super) fn update(&self, transform: &mut Transform, input: &InputManager) {
        if self.is_holding() && self.is_hovering() && input.is_key_held(KeyCode::ControlLeft) {
            let pointer = input.mouse_position();
            transform.position.x = pointer.x;
            transform.position.y = pointer.y;
        }
    }

    pub(super) fn dispose(&mut self, bus: &MessageBus) {
        if std::mem::take(&mut self.subscribed) {
            let subscriber = Subscriber::handler(&self.state);
            for code in Self::codes(&self.data.owner_name) {
                bus.unsubscribe(&code, &subscriber);
            }
        }
    }
}
