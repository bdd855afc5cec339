//! Event fan-out and optional by-name delivery.

use std::sync::Arc;

use serde_json::json;
use sourced_dispatch::{
    BusKind, ConfigurationSnapshot, DispatchError, DispatchSettings, HandlerEndpoint,
    HandlerPipelineBuilder, Message, MessagingSystem, Payload, QueueChannel, Result,
};

use crate::support::{self, OrderPlaced};

struct Subscribers {
    audit: QueueChannel,
    mail: QueueChannel,
}

fn subscriber(name: &str, output: &str) -> HandlerEndpoint {
    let pipeline = HandlerPipelineBuilder::new(name)
        .with_handler(|message: Message| -> Result<Option<Message>> { Ok(Some(message)) })
        .with_output_channel(output);
    HandlerEndpoint::new(format!("{name}.in"), pipeline).handles(BusKind::Event, "OrderPlaced")
}

fn snapshot() -> (ConfigurationSnapshot, Subscribers) {
    let subscribers = Subscribers {
        audit: QueueChannel::new(),
        mail: QueueChannel::new(),
    };
    let snapshot = ConfigurationSnapshot::new()
        .with_identity(support::identity())
        .with_channel("audit-log", Arc::new(subscribers.audit.clone()))
        .with_channel("mail-log", Arc::new(subscribers.mail.clone()))
        .with_handler(subscriber("audit", "audit-log"))
        .with_handler(subscriber("mailer", "mail-log"));
    (snapshot, subscribers)
}

#[test]
fn event_reaches_every_subscriber() {
    let (snapshot, subscribers) = snapshot();
    let system = MessagingSystem::build(&snapshot).unwrap();

    system
        .event_bus()
        .publish(&OrderPlaced {
            order_id: "42".into(),
        })
        .unwrap();

    assert_eq!(subscribers.audit.payload_types().unwrap(), ["OrderPlaced"]);
    assert_eq!(subscribers.mail.payload_types().unwrap(), ["OrderPlaced"]);
    let delivered = subscribers.audit.receive().unwrap().unwrap();
    assert_eq!(delivered.payload().body(), &json!({ "orderId": "42" }));
}

#[test]
fn event_without_subscribers_is_dropped() {
    let (snapshot, subscribers) = snapshot();
    let system = MessagingSystem::build(&snapshot).unwrap();

    system
        .event_bus()
        .publish_payload(Payload::new("OrderCancelled", json!({})))
        .unwrap();
    assert!(subscribers.audit.is_empty());
    assert!(subscribers.mail.is_empty());
}

#[test]
fn publish_with_routing_reaches_one_channel() {
    let (snapshot, subscribers) = snapshot();
    let system = MessagingSystem::build(&snapshot).unwrap();

    system
        .event_bus()
        .publish_with_routing("mail-log", Payload::new("Reminder", json!({})))
        .unwrap();
    assert!(subscribers.audit.is_empty());
    assert_eq!(subscribers.mail.payload_types().unwrap(), ["Reminder"]);
}

#[test]
fn unknown_event_channel_fails_unless_optional() {
    let (snapshot, _) = snapshot();
    let strict = MessagingSystem::build(&snapshot).unwrap();
    let err = strict
        .event_bus()
        .publish_with_routing("nowhere", Payload::new("Reminder", json!({})))
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::RoutingResolution {
            bus: BusKind::Event,
            ..
        }
    ));

    let lenient = MessagingSystem::build(&snapshot.with_settings(DispatchSettings {
        event_by_name_resolution_required: false,
        ..DispatchSettings::default()
    }))
    .unwrap();
    lenient
        .event_bus()
        .publish_with_routing("nowhere", Payload::new("Reminder", json!({})))
        .unwrap();
}
