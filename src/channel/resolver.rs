use std::collections::HashMap;
use std::sync::Arc;

use super::{ChannelRef, NullChannel, NULL_CHANNEL};
use crate::error::{DispatchError, Result};

/// Immutable name → destination lookup.
///
/// Cheap to clone. Resolution is deterministic for the lifetime of the value.
#[derive(Clone)]
pub struct ChannelResolver {
    channels: Arc<HashMap<String, ChannelRef>>,
}

impl ChannelResolver {
    pub fn builder() -> ChannelResolverBuilder {
        ChannelResolverBuilder::default()
    }

    /// Look up a destination by name.
    pub fn resolve(&self, name: &str) -> Result<ChannelRef> {
        self.channels
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownChannel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ChannelResolver {
    fn default() -> Self {
        Self::builder().build_unchecked()
    }
}

/// Collects channels before freezing them into a [`ChannelResolver`].
#[derive(Clone, Default)]
pub struct ChannelResolverBuilder {
    channels: Vec<(String, ChannelRef)>,
}

impl ChannelResolverBuilder {
    pub fn with_channel(mut self, name: impl Into<String>, channel: ChannelRef) -> Self {
        self.channels.push((name.into(), channel));
        self
    }

    /// Freeze the registrations.
    ///
    /// Two registrations under one name are a configuration error: exactly one
    /// destination may own an input channel. `nullChannel` is always present.
    pub fn build(self) -> Result<ChannelResolver> {
        let mut channels: HashMap<String, ChannelRef> = HashMap::new();
        channels.insert(NULL_CHANNEL.to_string(), Arc::new(NullChannel));
        for (name, channel) in self.channels {
            if channels.contains_key(&name) {
                return Err(DispatchError::configuration(format!(
                    "channel `{}` is claimed by more than one destination",
                    name
                )));
            }
            channels.insert(name, channel);
        }
        Ok(ChannelResolver {
            channels: Arc::new(channels),
        })
    }

    fn build_unchecked(self) -> ChannelResolver {
        let mut channels: HashMap<String, ChannelRef> = HashMap::new();
        channels.insert(NULL_CHANNEL.to_string(), Arc::new(NullChannel));
        channels.extend(self.channels);
        ChannelResolver {
            channels: Arc::new(channels),
        }
    }
}
