//! Header container and reserved header names.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::aggregate::AggregateInstance;
use crate::channel::ChannelRef;
use crate::error::{DispatchError, Result};

use super::Message;

/// Unique message id, assigned at build time.
pub const ID: &str = "id";
/// Epoch milliseconds, assigned at build time.
pub const TIMESTAMP: &str = "timestamp";
/// Where a reply should go: a channel name or a direct channel reference.
pub const REPLY_DESTINATION: &str = "reply-destination";
/// Where an error should go: a channel name or a direct channel reference.
pub const ERROR_DESTINATION: &str = "error-destination";
pub const CORRELATION_ID: &str = "correlation-id";
pub const CAUSATION_ID: &str = "causation-id";

/// Header names owned by the messaging layer rather than the application.
pub const RESERVED: [&str; 6] = [
    ID,
    TIMESTAMP,
    REPLY_DESTINATION,
    ERROR_DESTINATION,
    CORRELATION_ID,
    CAUSATION_ID,
];

/// A single header value.
///
/// Business headers are plain JSON values. Channel references, nested
/// messages and aggregate instances only appear in framework headers.
#[derive(Clone)]
pub enum HeaderValue {
    Value(Value),
    Channel(ChannelRef),
    Message(Box<Message>),
    Aggregate(AggregateInstance),
}

impl HeaderValue {
    /// The JSON value, if this is a plain value header.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            HeaderValue::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The string, if this is a plain string header.
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_channel(&self) -> Option<&ChannelRef> {
        match self {
            HeaderValue::Channel(channel) => Some(channel),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            HeaderValue::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_aggregate(&self) -> Option<&AggregateInstance> {
        match self {
            HeaderValue::Aggregate(instance) => Some(instance),
            _ => None,
        }
    }
}

impl fmt::Debug for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Value(value) => write!(f, "{}", value),
            HeaderValue::Channel(_) => f.write_str("<channel>"),
            HeaderValue::Message(message) => write!(f, "<message {}>", message.id()),
            HeaderValue::Aggregate(instance) => {
                write!(f, "<aggregate {}>", instance.aggregate_type())
            }
        }
    }
}

impl From<Value> for HeaderValue {
    fn from(value: Value) -> Self {
        HeaderValue::Value(value)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Value(Value::String(value.to_string()))
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Value(Value::String(value))
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        HeaderValue::Value(Value::Bool(value))
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Value(Value::from(value))
    }
}

impl From<u64> for HeaderValue {
    fn from(value: u64) -> Self {
        HeaderValue::Value(Value::from(value))
    }
}

impl From<Message> for HeaderValue {
    fn from(message: Message) -> Self {
        HeaderValue::Message(Box::new(message))
    }
}

impl From<AggregateInstance> for HeaderValue {
    fn from(instance: AggregateInstance) -> Self {
        HeaderValue::Aggregate(instance)
    }
}

impl From<ChannelRef> for HeaderValue {
    fn from(channel: ChannelRef) -> Self {
        HeaderValue::Channel(channel)
    }
}

/// Read-only header map. Keys are unique.
#[derive(Clone, Debug, Default)]
pub struct Headers {
    entries: BTreeMap<String, HeaderValue>,
}

impl Headers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        self.entries.remove(name)
    }

    /// Required accessor. Fails with [`DispatchError::HeaderNotFound`].
    pub fn get(&self, name: &str) -> Result<&HeaderValue> {
        self.entries
            .get(name)
            .ok_or_else(|| DispatchError::HeaderNotFound(name.to_string()))
    }

    /// Optional accessor.
    pub fn find(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.get(name)
    }

    /// Required string accessor.
    pub fn get_str(&self, name: &str) -> Result<&str> {
        self.get(name)?
            .as_str()
            .ok_or_else(|| DispatchError::HeaderNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Headers the application set, excluding the reserved ones.
    pub fn business(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.iter().filter(|(name, _)| !RESERVED.contains(name))
    }
}
