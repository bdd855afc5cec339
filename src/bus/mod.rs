//! CQRS buses - routing commands, queries and events to their handlers.
//!
//! Each bus kind has two routers, registered under fixed input channels:
//!
//! ```text
//!                 by-object (payload type)          by-name (header)
//!   command  ──►  exactly one destination           named channel, required
//!   query    ──►  exactly one destination           named channel, required
//!   event    ──►  every subscriber, zero is fine    named channel, configurable
//! ```
//!
//! Routers forward the message as-is, so correlation, reply and error headers
//! reach the handler unchanged. The gateways ([`CommandBus`], [`QueryBus`],
//! [`EventBus`]) build messages and hand them to the routers.

mod gateway;
mod router;
mod routing;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use gateway::{CommandBus, EventBus, QueryBus};
pub use router::{Addressing, BusRouter, BusRouterBuilder};
pub use routing::RoutingTable;

/// The three message kinds a bus can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    Command,
    Query,
    Event,
}

impl BusKind {
    pub const ALL: [BusKind; 3] = [BusKind::Command, BusKind::Query, BusKind::Event];

    /// Default header holding the destination name for by-name routing.
    pub fn default_name_header(&self) -> &'static str {
        match self {
            BusKind::Command => "command-bus.name",
            BusKind::Query => "query-bus.name",
            BusKind::Event => "event-bus.name",
        }
    }

    /// Input channel of this bus's by-object router.
    pub fn by_object_channel(&self) -> &'static str {
        match self {
            BusKind::Command => "command-bus.by-object",
            BusKind::Query => "query-bus.by-object",
            BusKind::Event => "event-bus.by-object",
        }
    }

    /// Input channel of this bus's by-name router.
    pub fn by_name_channel(&self) -> &'static str {
        match self {
            BusKind::Command => "command-bus.by-name",
            BusKind::Query => "query-bus.by-name",
            BusKind::Event => "event-bus.by-name",
        }
    }
}

impl fmt::Display for BusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BusKind::Command => "command",
            BusKind::Query => "query",
            BusKind::Event => "event",
        })
    }
}
