use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tracing::{trace, warn};

use super::{Message, MessagePriority, Payload, Subscriber};

pub const DEFAULT_MESSAGES_PER_UPDATE: usize = 10;

struct Delivery {
    message: Rc<Message>,
    subscriber: Subscriber,
}

struct BusState {
    subscriptions: HashMap<String, Vec<Subscriber>>,
    queue: VecDeque<Delivery>,
    messages_per_update: usize,
}

/// Shared handle to one engine's message bus.
///
/// Cloning the handle is cheap and every clone talks to the same subscription
/// table and queue. The bus is single-threaded (`Rc`), and no borrow is held
/// while subscribers run, so handlers may send, subscribe or unsubscribe.
///
/// Queued deliveries drain oldest first.
#[derive(Clone)]
pub struct MessageBus {
    inner: Rc<RefCell<BusState>>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGES_PER_UPDATE)
    }
}

impl MessageBus {
    pub fn new(messages_per_update: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusState {
                subscriptions: HashMap::new(),
                queue: VecDeque::new(),
                messages_per_update: messages_per_update.max(1),
            })),
        }
    }

    pub fn messages_per_update(&self) -> usize {
        self.inner.borrow().messages_per_update
    }

    pub fn set_messages_per_update(&self, cap: usize) {
        self.inner.borrow_mut().messages_per_update = cap.max(1);
    }

    pub fn subscribe(&self, code: impl Into<String>, subscriber: Subscriber) {
        let code = code.into();
        let mut state = self.inner.borrow_mut();
        let subscribers = state.subscriptions.entry(code).or_default();
        if subscribers.iter().any(|s| s.same_as(&subscriber)) {
            warn!("attempted to add a duplicate subscriber; subscription not added");
            return;
        }
        subscribers.push(subscriber);
    }

    pub fn unsubscribe(&self, code: &str, subscriber: &Subscriber) {
        let mut state = self.inner.borrow_mut();
        let Some(subscribers) = state.subscriptions.get_mut(code) else {
            warn!(code, "cannot unsubscribe from a code that has no subscriptions");
            return;
        };
        match subscribers.iter().position(|s| s.same_as(subscriber)) {
            Some(index) => {
                subscribers.remove(index);
                if subscribers.is_empty() {
                    state.subscriptions.remove(code);
                }
            }
            None => warn!(code, "subscriber is not registered for this code"),
        }
    }

    /// Queues `code` for every current subscriber; delivered by [`update`](Self::update).
    pub fn send(&self, code: impl Into<String>, sender: Option<&str>, payload: Payload) {
        self.post(Message::new(code, sender, payload, MessagePriority::Normal));
    }

    /// Delivers `code` to every current subscriber before returning.
    pub fn send_priority(&self, code: impl Into<String>, sender: Option<&str>, payload: Payload) {
        self.post(Message::new(code, sender, payload, MessagePriority::High));
    }

    pub fn post(&self, message: Message) {
        let subscribers = match self.inner.borrow().subscriptions.get(&message.code) {
            Some(subscribers) => subscribers.clone(),
            None => return,
        };

        match message.priority {
            MessagePriority::High => {
                for subscriber in &subscribers {
                    subscriber.deliver(&message);
                }
            }
            MessagePriority::Normal => {
                let message = Rc::new(message);
                let mut state = self.inner.borrow_mut();
                for subscriber in subscribers {
                    state.queue.push_back(Delivery {
                        message: Rc::clone(&message),
                        subscriber,
                    });
                }
            }
        }
    }

    /// Delivers at most `messages_per_update` queued messages. Anything sent
    /// while this runs waits for the next call.
    pub fn update(&self, _delta_time: f32) {
        let batch: Vec<Delivery> = {
            let mut state = self.inner.borrow_mut();
            if state.queue.is_empty() {
                return;
            }
            let count = state.messages_per_update.min(state.queue.len());
            state.queue.drain(..count).collect()
        };

        trace!(count = batch.len(), "delivering queued messages");
        for delivery in batch {
            delivery.subscriber.deliver(&delivery.message);
        }
    }

    pub fn queued_len(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    pub fn subscriber_count(&self, code: &str) -> usize {
        self.inner
            .borrow()
            .subscriptions
            .get(code)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::message::{Mailbox, MessageHandler};

    struct Counter(Cell<usize>);

    impl MessageHandler for Counter {
        fn on_message(&self, _message: &Message) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn duplicate_subscription_is_ignored() {
        let bus = MessageBus::default();
        let counter = Rc::new(Counter(Cell::new(0)));
        bus.subscribe("A", Subscriber::handler(&counter));
        bus.subscribe("A", Subscriber::handler(&counter));
        assert_eq!(bus.subscriber_count("A"), 1);

        bus.send_priority("A", None, Payload::None);
        assert_eq!(counter.0.get(), 1);
    }

    #[test]
    fn unknown_unsubscribe_is_a_no_op() {
        let bus = MessageBus::default();
        let counter = Rc::new(Counter(Cell::new(0)));
        bus.unsubscribe("nothing", &Subscriber::handler(&counter));
        assert_eq!(bus.subscriber_count("nothing"), 0);
    }

    #[test]
    fn normal_messages_drain_in_send_order() {
        let bus = MessageBus::default();
        let mailbox = Mailbox::new();
        bus.subscribe("A", Subscriber::handler(&mailbox));
        bus.send("A", None, Payload::Text("first".into()));
        bus.send("A", None, Payload::Text("second".into()));
        bus.update(0.0);

        let texts: Vec<_> = mailbox.drain().iter().map(|m| m.text().unwrap().to_owned()).collect();
        assert_eq!(texts, ["first", "second"]);
    }

    #[test]
    fn handler_may_send_while_being_notified() {
        let bus = MessageBus::default();
        let echo_bus = bus.clone();
        bus.subscribe(
            "ping",
            Subscriber::callback(move |_| echo_bus.send("pong", None, Payload::None)),
        );
        let mailbox = Mailbox::new();
        bus.subscribe("pong", Subscriber::handler(&mailbox));

        bus.send_priority("ping", None, Payload::None);
        assert_eq!(bus.queued_len(), 1);
        bus.update(0.0);
        assert_eq!(mailbox.drain().len(), 1);
    }

    #[test]
    fn send_without_subscribers_queues_nothing() {
        let bus = MessageBus::default();
        bus.send("nobody", None, Payload::None);
        assert_eq!(bus.queued_len(), 0);
    }
}
