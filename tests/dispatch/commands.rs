//! Commands and queries routed by payload type and by channel name.

use serde_json::json;
use sourced_dispatch::aggregate::IDENTIFIERS_PAYLOAD;
use sourced_dispatch::interceptor::{self, InterceptorEntry};
use sourced_dispatch::{
    DispatchError, InMemoryAggregateRepository, Message, MessageBuilder, MessagingSystem,
    NotFoundReason, Payload, TargetSignature,
};

use crate::support::{self, GetOrderStatus, OrderStatus, PlaceOrder, ShipOrder};

fn place(system: &MessagingSystem, order_id: &str) -> Message {
    system
        .command_bus()
        .send(&PlaceOrder {
            order_id: order_id.into(),
            customer: "ada".into(),
        })
        .unwrap()
        .unwrap()
}

#[test]
fn place_ship_and_query() {
    let repository = InMemoryAggregateRepository::new();
    let system = MessagingSystem::build(&support::orders(&repository)).unwrap();

    let placed = place(&system, "42");
    assert_eq!(placed.payload().payload_type(), IDENTIFIERS_PAYLOAD);
    assert_eq!(placed.payload().body(), &json!({ "orderId": "42" }));

    let shipped = system
        .command_bus()
        .send(&ShipOrder {
            order_id: "42".into(),
        })
        .unwrap();
    assert!(shipped.is_none());
    assert!(support::load(&repository, "42").unwrap().shipped);

    let status = system
        .query_bus()
        .send(&GetOrderStatus {
            order_id: "42".into(),
        })
        .unwrap()
        .unwrap();
    assert_eq!(
        status.payload().decode::<OrderStatus>().unwrap(),
        OrderStatus {
            customer: "ada".into(),
            shipped: true,
        }
    );
}

#[test]
fn gateway_messages_use_injected_identity() {
    let repository = InMemoryAggregateRepository::new();
    let system = MessagingSystem::build(&support::orders(&repository)).unwrap();

    let first = place(&system, "1");
    let second = place(&system, "2");
    assert_eq!(first.id(), "msg-1");
    assert_eq!(second.id(), "msg-2");
    assert_eq!(first.timestamp(), 1_700_000_000_000);
}

#[test]
fn replies_carry_no_internal_headers() {
    let repository = InMemoryAggregateRepository::new();
    let system = MessagingSystem::build(&support::orders(&repository)).unwrap();
    place(&system, "42");

    let status = system
        .query_bus()
        .send(&GetOrderStatus {
            order_id: "42".into(),
        })
        .unwrap()
        .unwrap();
    for name in sourced_dispatch::aggregate::INTERNAL_HEADERS {
        assert!(!status.headers().contains(name), "{name} leaked");
    }
}

#[test]
fn shipping_unknown_order_is_not_found() {
    let repository = InMemoryAggregateRepository::new();
    let system = MessagingSystem::build(&support::orders(&repository)).unwrap();

    let err = system
        .command_bus()
        .send(&ShipOrder {
            order_id: "missing".into(),
        })
        .unwrap_err();
    match err {
        DispatchError::AggregateNotFound {
            aggregate_type,
            reason: NotFoundReason::NoInstance { identifiers },
            ..
        } => {
            assert_eq!(aggregate_type, "Order");
            assert_eq!(identifiers.get("orderId"), Some(&json!("missing")));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unrouted_command_is_a_routing_error() {
    let repository = InMemoryAggregateRepository::new();
    let system = MessagingSystem::build(&support::orders(&repository)).unwrap();

    let err = system
        .command_bus()
        .send_payload(Payload::new("CancelOrder", json!({ "orderId": "42" })))
        .unwrap_err();
    assert!(matches!(err, DispatchError::RoutingResolution { .. }), "{err}");
}

#[test]
fn send_with_routing_targets_input_channel() {
    let repository = InMemoryAggregateRepository::new();
    let system = MessagingSystem::build(&support::orders(&repository)).unwrap();
    place(&system, "42");

    system
        .command_bus()
        .send_with_routing("Order.ship", Payload::new("Anything", json!({ "orderId": "42" })))
        .unwrap();
    assert!(support::load(&repository, "42").unwrap().shipped);

    let err = system
        .command_bus()
        .send_with_routing("Order.cancel", Payload::new("Anything", json!({})))
        .unwrap_err();
    assert!(matches!(err, DispatchError::RoutingResolution { .. }), "{err}");
}

#[test]
fn interceptor_guards_aggregate_method() {
    let repository = InMemoryAggregateRepository::new();
    let guard = interceptor::around(|message: Message, next| {
        if message.headers().contains("tenant") {
            next.proceed(message)
        } else {
            Err(DispatchError::Rejected("tenant header required".into()))
        }
    });
    let snapshot = support::orders(&repository).with_interceptor(InterceptorEntry::new(
        0,
        guard,
        TargetSignature::new("Order", "ship"),
    ));
    let system = MessagingSystem::build(&snapshot).unwrap();
    place(&system, "42");

    let ship = || Payload::encode(&ShipOrder { order_id: "42".into() }).unwrap();
    let err = system.command_bus().send_payload(ship()).unwrap_err();
    assert!(matches!(err, DispatchError::Rejected(_)));
    assert!(!support::load(&repository, "42").unwrap().shipped);

    system
        .command_bus()
        .send_message(MessageBuilder::with_payload(ship()).with_header("tenant", "acme"))
        .unwrap();
    assert!(support::load(&repository, "42").unwrap().shipped);
}
