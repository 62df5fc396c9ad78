//! Publish/subscribe messaging between engine subsystems.
//!
//! Two tiers: [`MessagePriority::High`] messages reach every subscriber before
//! `send_priority` returns, [`MessagePriority::Normal`] messages are queued and
//! drained a bounded number at a time by [`MessageBus::update`].

mod bus;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub use bus::{DEFAULT_MESSAGES_PER_UPDATE, MessageBus};

use crate::assets::Asset;
use crate::input::MouseContext;

// ── Well-known codes ────────────────────────────────────────────────────────

pub const ASSET_LOADED_PREFIX: &str = "MESSAGE_ASSET_LOADER_ASSET_LOADED::";
pub const ASSET_FAILED_PREFIX: &str = "MESSAGE_ASSET_LOADER_ASSET_FAILED::";
pub const MOUSE_DOWN: &str = "MOUSE_DOWN";
pub const MOUSE_UP: &str = "MOUSE_UP";
pub const LEVEL_LOADED: &str = "LEVEL_LOADED";

pub fn asset_loaded_code(asset_name: &str) -> String {
    format!("{ASSET_LOADED_PREFIX}{asset_name}")
}

pub fn asset_failed_code(asset_name: &str) -> String {
    format!("{ASSET_FAILED_PREFIX}{asset_name}")
}

pub fn hover_code(entity: &str) -> String {
    format!("MOUSE_HOVER: {entity}")
}

pub fn hover_exit_code(entity: &str) -> String {
    format!("MOUSE_HOVER_EXIT: {entity}")
}

pub fn collision_entry_code(entity: &str) -> String {
    format!("COLLISION_ENTRY: {entity}")
}

pub fn collision_exit_code(entity: &str) -> String {
    format!("COLLISION_EXIT: {entity}")
}

pub fn set_text_code(component: &str) -> String {
    format!("{component}:SetText")
}

// ── Message ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePriority {
    Normal,
    High,
}

/// Data carried alongside a message code.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    None,
    Asset(Rc<Asset>),
    Mouse(MouseContext),
    Text(String),
    /// Name of an entity related to the message (e.g. the other side of a collision).
    Entity(String),
}

#[derive(Debug, Clone)]
pub struct Message {
    pub code: String,
    pub sender: Option<String>,
    pub payload: Payload,
    pub priority: MessagePriority,
}

impl Message {
    pub fn new(code: impl Into<String>, sender: Option<&str>, payload: Payload, priority: MessagePriority) -> Self {
        Self {
            code: code.into(),
            sender: sender.map(str::to_owned),
            payload,
            priority,
        }
    }

    pub fn asset(&self) -> Option<&Rc<Asset>> {
        match &self.payload {
            Payload::Asset(asset) => Some(asset),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) | Payload::Entity(text) => Some(text),
            _ => None,
        }
    }
}

// ── Subscribers ─────────────────────────────────────────────────────────────

/// An object that reacts to messages.
///
/// Handlers receive `&self`; implementors keep mutable state behind `Cell` or
/// `RefCell` so a handler may itself send or subscribe while being notified.
pub trait MessageHandler {
    fn on_message(&self, message: &Message);
}

/// Either a handler object or a bare callback. Identity (for duplicate
/// detection and unsubscription) is the address of the shared allocation.
#[derive(Clone)]
pub enum Subscriber {
    Handler(Rc<dyn MessageHandler>),
    Callback(Rc<dyn Fn(&Message)>),
}

impl Subscriber {
    pub fn handler<H: MessageHandler + 'static>(handler: &Rc<H>) -> Self {
        let handler: Rc<dyn MessageHandler> = handler.clone();
        Subscriber::Handler(handler)
    }

    pub fn callback(callback: impl Fn(&Message) + 'static) -> Self {
        Subscriber::Callback(Rc::new(callback))
    }

    pub fn same_as(&self, other: &Subscriber) -> bool {
        match (self, other) {
            (Subscriber::Handler(a), Subscriber::Handler(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            (Subscriber::Callback(a), Subscriber::Callback(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }

    pub(crate) fn deliver(&self, message: &Message) {
        match self {
            Subscriber::Handler(handler) => handler.on_message(message),
            Subscriber::Callback(callback) => callback(message),
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subscriber::Handler(_) => f.write_str("Subscriber::Handler"),
            Subscriber::Callback(_) => f.write_str("Subscriber::Callback"),
        }
    }
}

/// Buffers delivered messages until their owner drains them.
///
/// Used by state that lives inside the scene arena or an engine-owned manager,
/// which the bus cannot hold a reference to.
#[derive(Debug, Default)]
pub struct Mailbox {
    messages: RefCell<VecDeque<Message>>,
}

impl Mailbox {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn drain(&self) -> Vec<Message> {
        self.messages.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

impl MessageHandler for Mailbox {
    fn on_message(&self, message: &Message) {
        self.messages.borrow_mut().push_back(message.clone());
    }
}
