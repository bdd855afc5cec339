use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Payload type to destination names, for by-object routing.
///
/// Destinations keep insertion order without duplicates. Names are not
/// checked against any resolver here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct RoutingTable {
    routes: BTreeMap<String, Vec<String>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, payload_type: impl Into<String>, destination: impl Into<String>) -> Self {
        self.add(payload_type.into(), destination.into());
        self
    }

    /// Every route of `other` appended after this table's routes.
    pub fn merged(mut self, other: &RoutingTable) -> Self {
        for (payload_type, destinations) in &other.routes {
            for destination in destinations {
                self.add(payload_type.clone(), destination.clone());
            }
        }
        self
    }

    pub fn destinations(&self, payload_type: &str) -> &[String] {
        self.routes
            .get(payload_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn payload_types(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn add(&mut self, payload_type: String, destination: String) {
        let destinations = self.routes.entry(payload_type).or_default();
        if !destinations.contains(&destination) {
            destinations.push(destination);
        }
    }
}

impl From<BTreeMap<String, Vec<String>>> for RoutingTable {
    fn from(raw: BTreeMap<String, Vec<String>>) -> Self {
        raw.into_iter()
            .flat_map(|(payload_type, destinations)| {
                destinations
                    .into_iter()
                    .map(move |destination| (payload_type.clone(), destination))
            })
            .fold(RoutingTable::new(), |table, (payload_type, destination)| {
                table.with_route(payload_type, destination)
            })
    }
}

impl From<RoutingTable> for BTreeMap<String, Vec<String>> {
    fn from(table: RoutingTable) -> Self {
        table.routes
    }
}
