use std::cell::RefCell;
use std::rc::Rc;

use pagecraft::message::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &MessageBus, code: &str) -> Rc<RefCell<Vec<String>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(
            code,
            Subscriber::callback(move |message: &Message| {
                sink.borrow_mut().push(message.text().unwrap_or_default().to_owned());
            }),
        );
        seen
    }

    // -- priorities ------------------------------------------------------

    #[test]
    fn high_priority_is_delivered_before_send_returns() {
        let bus = MessageBus::new(10);
        let seen = recorder(&bus, "PING");
        bus.send_priority("PING", None, Payload::Text("now".into()));
        assert_eq!(*seen.borrow(), vec!["now".to_string()]);
        assert_eq!(bus.queued_len(), 0);
    }

    #[test]
    fn normal_priority_waits_for_update() {
        let bus = MessageBus::new(10);
        let seen = recorder(&bus, "PING");
        bus.send("PING", None, Payload::Text("later".into()));
        assert!(seen.borrow().is_empty());
        bus.update(0.016);
        assert_eq!(*seen.borrow(), vec!["later".to_string()]);
    }

    // -- throttling ------------------------------------------------------

    #[test]
    fn queue_drains_in_ceil_k_over_c_updates() {
        let bus = MessageBus::new(3);
        let seen = recorder(&bus, "TICK");
        for i in 0..7 {
            bus.send("TICK", None, Payload::Text(i.to_string()));
        }

        let mut updates = 0;
        while bus.queued_len() > 0 {
            bus.update(0.0);
            updates += 1;
        }
        assert_eq!(updates, 3);
        let expected: Vec<String> = (0..7).map(|i| i.to_string()).collect();
        assert_eq!(*seen.borrow(), expected);
    }

    #[test]
    fn update_on_empty_queue_does_nothing() {
        let bus = MessageBus::new(3);
        let seen = recorder(&bus, "TICK");
        bus.update(0.0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn messages_sent_during_delivery_wait_for_next_update() {
        let bus = MessageBus::new(10);
        let seen = recorder(&bus, "SECOND");
        let relay = bus.clone();
        bus.subscribe(
            "FIRST",
            Subscriber::callback(move |_: &Message| relay.send("SECOND", None, Payload::Text("relayed".into()))),
        );

        bus.send("FIRST", None, Payload::None);
        bus.update(0.0);
        assert!(seen.borrow().is_empty());
        bus.update(0.0);
        assert_eq!(*seen.borrow(), vec!["relayed".to_string()]);
    }

    // -- subscriptions ---------------------------------------------------

    #[test]
    fn duplicate_subscription_is_ignored() {
        let bus = MessageBus::default();
        let mailbox = Mailbox::new();
        bus.subscribe("CODE", Subscriber::handler(&mailbox));
        bus.subscribe("CODE", Subscriber::handler(&mailbox));
        assert_eq!(bus.subscriber_count("CODE"), 1);

        bus.send_priority("CODE", Some("tester"), Payload::None);
        let delivered = mailbox.drain();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].sender.as_deref(), Some("tester"));
    }

    #[test]
    fn unsubscribing_an_unknown_subscriber_is_harmless() {
        let bus = MessageBus::default();
        let mailbox = Mailbox::new();
        bus.unsubscribe("NOBODY", &Subscriber::handler(&mailbox));
        assert_eq!(bus.subscriber_count("NOBODY"), 0);
    }

    #[test]
    fn unsubscribed_handler_receives_nothing_already_queued() {
        let bus = MessageBus::default();
        let mailbox = Mailbox::new();
        bus.subscribe("CODE", Subscriber::handler(&mailbox));
        bus.send("CODE", None, Payload::None);
        bus.unsubscribe("CODE", &Subscriber::handler(&mailbox));
        bus.send("CODE", None, Payload::None);
        bus.update(0.0);
        // Deliveries are bound when the message is sent.
        assert_eq!(mailbox.drain().len(), 1);
    }
}
