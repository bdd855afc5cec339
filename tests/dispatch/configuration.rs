//! Building a messaging system from snapshots and settings.

use std::sync::Arc;

use rstest::rstest;
use serde_json::json;
use sourced_dispatch::{
    DispatchError, DispatchSettings, InMemoryAggregateRepository, MessagingSystem, Payload,
    QueueChannel,
};

use crate::support::{self, PlaceOrder};

fn configuration_error(result: sourced_dispatch::Result<MessagingSystem>) -> String {
    match result {
        Err(DispatchError::Configuration(reason)) => reason,
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a configuration error"),
    }
}

#[rstest]
#[case::aggregate_input("Order.ship")]
#[case::router_input("command-bus.by-object")]
fn duplicate_input_channel_is_rejected(#[case] channel: &str) {
    let repository = InMemoryAggregateRepository::new();
    let snapshot = support::orders(&repository).with_channel(channel, Arc::new(QueueChannel::new()));

    let reason = configuration_error(MessagingSystem::build(&snapshot));
    assert!(reason.contains(channel), "{reason}");
}

#[test]
fn missing_repository_is_rejected() {
    let repository = InMemoryAggregateRepository::for_types(["Invoice"]);
    let reason = configuration_error(MessagingSystem::build(&support::orders(&repository)));
    assert!(reason.contains("Order"), "{reason}");
}

#[test]
fn endpoint_ids_default_to_input_channels() {
    let repository = InMemoryAggregateRepository::new();
    let system = MessagingSystem::build(&support::orders(&repository)).unwrap();
    assert_eq!(
        system.endpoint_ids(),
        ["Order.place", "order.ship", "Order.status"]
    );
    assert!(system.resolver().contains("event-bus.by-name"));
}

#[test]
fn async_endpoints_skip_queries() {
    let repository = InMemoryAggregateRepository::new();
    let snapshot = support::orders(&repository)
        .with_async_endpoint("orders-async", "order.ship")
        .with_async_endpoint("orders-async", "Order.status");
    let system = MessagingSystem::build(&snapshot).unwrap();

    let endpoints = system.async_endpoints();
    assert_eq!(endpoints.endpoints_for("orders-async"), ["order.ship"]);
    assert!(endpoints.is_async("order.ship"));
    assert!(!endpoints.is_async("Order.status"));
}

#[rstest]
#[case::empty_id("")]
#[case::unknown_id("Order.cancel")]
#[case::defaulted_id("Order.place")]
fn invalid_async_endpoint_is_rejected(#[case] endpoint_id: &str) {
    let repository = InMemoryAggregateRepository::new();
    let snapshot = support::orders(&repository).with_async_endpoint("orders-async", endpoint_id);
    configuration_error(MessagingSystem::build(&snapshot));
}

#[test]
fn defaulted_endpoint_id_cannot_be_async() {
    let repository = InMemoryAggregateRepository::new();
    let snapshot = support::orders(&repository).with_async_endpoint("orders-async", "Order.place");
    let reason = configuration_error(MessagingSystem::build(&snapshot));
    assert!(reason.contains("explicit endpoint id"), "{reason}");
}

#[test]
fn required_consumers_are_recorded_once() {
    let repository = InMemoryAggregateRepository::new();
    let snapshot = support::orders(&repository)
        .with_required_consumer("order.ship")
        .with_required_consumer("Order.status")
        .with_required_consumer("order.ship");
    let system = MessagingSystem::build(&snapshot).unwrap();
    assert_eq!(system.required_consumers(), ["order.ship", "Order.status"]);
}

#[test]
fn unknown_required_consumer_is_rejected() {
    let repository = InMemoryAggregateRepository::new();
    let snapshot = support::orders(&repository).with_required_consumer("order.cancel");
    let reason = configuration_error(MessagingSystem::build(&snapshot));
    assert!(reason.contains("order.cancel"), "{reason}");
}

#[test]
fn settings_from_json_drive_routing() {
    let settings = DispatchSettings::from_json(
        r#"{
            "name_headers": { "command": "x-target" },
            "routes": { "event": { "OrderPlaced": ["audit-log"] } }
        }"#,
    )
    .unwrap();
    let audit = QueueChannel::new();
    let repository = InMemoryAggregateRepository::new();
    let snapshot = support::orders(&repository)
        .with_settings(settings)
        .with_channel("audit-log", Arc::new(audit.clone()));
    let system = MessagingSystem::build(&snapshot).unwrap();

    let reply = system
        .command_bus()
        .send_with_routing(
            "Order.place",
            Payload::encode(&PlaceOrder {
                order_id: "7".into(),
                customer: "grace".into(),
            })
            .unwrap(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(reply.headers().get_str("x-target").unwrap(), "Order.place");
    assert!(!reply.headers().contains("command-bus.name"));

    system
        .event_bus()
        .publish_payload(Payload::new("OrderPlaced", json!({ "orderId": "7" })))
        .unwrap();
    assert_eq!(audit.payload_types().unwrap(), ["OrderPlaced"]);
}
