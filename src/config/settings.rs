use serde::{Deserialize, Serialize};

use crate::bus::{BusKind, RoutingTable};
use crate::error::Result;

/// Per-bus header names read by the by-name routers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameHeaders {
    pub command: Option<String>,
    pub query: Option<String>,
    pub event: Option<String>,
}

/// Explicit type routes, merged after the routes derived from handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    pub command: RoutingTable,
    pub query: RoutingTable,
    pub event: RoutingTable,
}

/// Marks an endpoint as consumed asynchronously from `channel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncEndpointSetting {
    pub channel: String,
    pub endpoint_id: String,
}

/// Settings for a messaging system.
///
/// ```json
/// {
///   "name_headers": { "command": "x-command" },
///   "event_by_name_resolution_required": false,
///   "routes": { "event": { "OrderPlaced": ["audit"] } },
///   "async_endpoints": [{ "channel": "orders", "endpoint_id": "order.place" }],
///   "required_consumers": ["order.place"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub name_headers: NameHeaders,
    pub event_by_name_resolution_required: bool,
    pub routes: RouteSettings,
    pub async_endpoints: Vec<AsyncEndpointSetting>,
    /// Endpoint ids that must have a running consumer.
    pub required_consumers: Vec<String>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            name_headers: NameHeaders::default(),
            event_by_name_resolution_required: true,
            routes: RouteSettings::default(),
            async_endpoints: Vec::new(),
            required_consumers: Vec::new(),
        }
    }
}

impl DispatchSettings {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// The configured by-name header for `kind`, or the bus default.
    pub fn name_header(&self, kind: BusKind) -> &str {
        let configured = match kind {
            BusKind::Command => &self.name_headers.command,
            BusKind::Query => &self.name_headers.query,
            BusKind::Event => &self.name_headers.event,
        };
        configured
            .as_deref()
            .unwrap_or_else(|| kind.default_name_header())
    }

    pub fn routes(&self, kind: BusKind) -> &RoutingTable {
        match kind {
            BusKind::Command => &self.routes.command,
            BusKind::Query => &self.routes.query,
            BusKind::Event => &self.routes.event,
        }
    }
}
