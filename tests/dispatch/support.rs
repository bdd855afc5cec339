//! Test domain: an Order aggregate wired through a full messaging system.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sourced_dispatch::aggregate::decode_argument;
use sourced_dispatch::{
    AggregateDescriptor, AggregateRoot, ConfigurationSnapshot, FactoryMethod, IdGenerator,
    Identifiers, Identity, InMemoryAggregateRepository, InstanceMethod, Invocation, PayloadType,
    Result,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer: String,
    pub shipped: bool,
}

impl AggregateRoot for Order {
    const AGGREGATE_TYPE: &'static str = "Order";
    const IDENTIFIERS: &'static [&'static str] = &["orderId"];

    fn identifiers(&self) -> Identifiers {
        Identifiers::new().with("orderId", json!(self.order_id))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub order_id: String,
    pub customer: String,
}

impl PayloadType for PlaceOrder {
    const PAYLOAD_TYPE: &'static str = "PlaceOrder";
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipOrder {
    pub order_id: String,
}

impl PayloadType for ShipOrder {
    const PAYLOAD_TYPE: &'static str = "ShipOrder";
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOrderStatus {
    pub order_id: String,
}

impl PayloadType for GetOrderStatus {
    const PAYLOAD_TYPE: &'static str = "GetOrderStatus";
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub customer: String,
    pub shipped: bool,
}

impl PayloadType for OrderStatus {
    const PAYLOAD_TYPE: &'static str = "OrderStatus";
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub order_id: String,
}

impl PayloadType for OrderPlaced {
    const PAYLOAD_TYPE: &'static str = "OrderPlaced";
}

/// Always reports the same instant.
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0).unwrap()
    }
}

/// `msg-1`, `msg-2`, ...
#[derive(Default)]
pub struct SequentialIds(AtomicU64);

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        format!("msg-{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

pub fn identity() -> Identity {
    Identity::new(
        Arc::new(FixedClock(1_700_000_000_000)),
        Arc::new(SequentialIds::default()),
    )
}

/// Place, ship and status endpoints for `Order`, backed by `repository`.
pub fn orders(repository: &InMemoryAggregateRepository) -> ConfigurationSnapshot {
    let place = FactoryMethod::new(|args: Vec<Value>| -> Result<Order> {
        let command: PlaceOrder = decode_argument(&args, 0)?;
        Ok(Order {
            order_id: command.order_id,
            customer: command.customer,
            shipped: false,
        })
    });
    let ship = InstanceMethod::new(|order: &mut Order, _args: Vec<Value>| {
        order.shipped = true;
        Ok(Invocation::Void)
    });
    let status = InstanceMethod::new(|order: &mut Order, _args: Vec<Value>| {
        Invocation::value(&OrderStatus {
            customer: order.customer.clone(),
            shipped: order.shipped,
        })
    });

    ConfigurationSnapshot::new()
        .with_identity(identity())
        .with_repository("orders", Arc::new(repository.clone()))
        .with_aggregate(
            AggregateDescriptor::command::<Order, _>("place", place)
                .factory()
                .handles::<PlaceOrder>()
                .build()
                .unwrap(),
        )
        .with_aggregate(
            AggregateDescriptor::command::<Order, _>("ship", ship)
                .void_return()
                .with_identifier("orderId", "orderId")
                .with_endpoint_id("order.ship")
                .handles::<ShipOrder>()
                .build()
                .unwrap(),
        )
        .with_aggregate(
            AggregateDescriptor::query::<Order, _>("status", status)
                .with_identifier("orderId", "orderId")
                .handles::<GetOrderStatus>()
                .build()
                .unwrap(),
        )
}

pub fn load(repository: &InMemoryAggregateRepository, order_id: &str) -> Option<Order> {
    use sourced_dispatch::AggregateRepository;

    repository
        .find_by("Order", &Identifiers::new().with("orderId", json!(order_id)))
        .unwrap()
        .and_then(|instance| instance.downcast_ref::<Order>().cloned())
}
