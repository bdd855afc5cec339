use std::collections::BTreeMap;

use crate::error::{DispatchError, Result};

/// Channel to endpoint ids consumed asynchronously from it.
///
/// Recorded for an external consumer runtime; nothing here changes how
/// messages are dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsyncEndpoints {
    by_channel: BTreeMap<String, Vec<String>>,
}

impl AsyncEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, channel: &str, endpoint_id: &str) -> Result<()> {
        if endpoint_id.is_empty() {
            return Err(DispatchError::configuration(format!(
                "async endpoint on channel {} has no endpoint id",
                channel
            )));
        }
        let endpoints = self.by_channel.entry(channel.to_string()).or_default();
        if !endpoints.iter().any(|id| id == endpoint_id) {
            endpoints.push(endpoint_id.to_string());
        }
        Ok(())
    }

    pub fn endpoints_for(&self, channel: &str) -> &[String] {
        self.by_channel
            .get(channel)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_async(&self, endpoint_id: &str) -> bool {
        self.by_channel
            .values()
            .any(|ids| ids.iter().any(|id| id == endpoint_id))
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.by_channel.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_channel.is_empty()
    }
}
