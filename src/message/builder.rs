//! Persistent message builder.
//!
//! Every `with_*` call returns a new builder value; `build()` assigns the id
//! and timestamp exactly once.

use serde_json::Value;

use crate::channel::ChannelRef;

use super::headers::{self, HeaderValue, Headers};
use super::identity::Identity;
use super::{Message, Payload};

/// Builds immutable [`Message`] values.
#[derive(Clone)]
pub struct MessageBuilder {
    payload: Payload,
    headers: Headers,
    identity: Identity,
    /// Id and timestamp carried over by `from_message`.
    fixed: Option<(String, i64)>,
}

impl MessageBuilder {
    /// Start a new message around a payload.
    pub fn with_payload(payload: Payload) -> Self {
        Self {
            payload,
            headers: Headers::new(),
            identity: Identity::default(),
            fixed: None,
        }
    }

    /// Rebuild an existing message, keeping its id and timestamp.
    pub fn from_message(message: &Message) -> Self {
        let fixed = Some((message.id().to_string(), message.timestamp()));
        let mut headers = message.headers().clone();
        headers.remove(headers::ID);
        headers.remove(headers::TIMESTAMP);
        Self {
            payload: message.payload().clone(),
            headers,
            identity: Identity::default(),
            fixed,
        }
    }

    /// Derive a message caused by `parent`.
    ///
    /// The new message gets its own id and timestamp, `causation-id` is the
    /// parent's id, and `correlation-id` is inherited (or the parent's id when
    /// the parent had none). Business headers are copied.
    pub fn from_causation(parent: &Message) -> Self {
        let correlation = parent
            .correlation_id()
            .unwrap_or_else(|| parent.id())
            .to_string();
        Self::derived(parent)
            .with_header(headers::CAUSATION_ID, parent.id())
            .with_header(headers::CORRELATION_ID, correlation)
    }

    /// Derive a message in the same correlation as `parent`, without a
    /// causation link.
    pub fn from_correlation(parent: &Message) -> Self {
        let builder = Self::derived(parent);
        match parent.correlation_id() {
            Some(correlation) => builder.with_header(headers::CORRELATION_ID, correlation),
            None => builder,
        }
    }

    fn derived(parent: &Message) -> Self {
        let mut headers = Headers::new();
        for (name, value) in parent.headers().business() {
            headers.insert(name, value.clone());
        }
        Self {
            payload: parent.payload().clone(),
            headers,
            identity: Identity::default(),
            fixed: None,
        }
    }

    /// Replace the payload.
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Use the given clock and id generator.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Set a header. Id and timestamp are assigned by `build()` and can't be
    /// set here.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        let name = name.into();
        if name != headers::ID && name != headers::TIMESTAMP {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_header_if_absent(
        self,
        name: impl Into<String>,
        value: impl Into<HeaderValue>,
    ) -> Self {
        let name = name.into();
        if self.headers.contains(&name) {
            self
        } else {
            self.with_header(name, value)
        }
    }

    pub fn without_header(mut self, name: &str) -> Self {
        self.headers.remove(name);
        self
    }

    pub fn with_reply_destination(self, name: impl Into<String>) -> Self {
        self.with_header(headers::REPLY_DESTINATION, Value::String(name.into()))
    }

    pub fn with_reply_channel(self, channel: ChannelRef) -> Self {
        self.with_header(headers::REPLY_DESTINATION, HeaderValue::Channel(channel))
    }

    pub fn with_error_destination(self, name: impl Into<String>) -> Self {
        self.with_header(headers::ERROR_DESTINATION, Value::String(name.into()))
    }

    pub fn with_correlation_id(self, correlation_id: impl Into<String>) -> Self {
        self.with_header(headers::CORRELATION_ID, Value::String(correlation_id.into()))
    }

    pub fn build(self) -> Message {
        let (id, timestamp) = match self.fixed {
            Some(fixed) => fixed,
            None => (self.identity.next_id(), self.identity.now_millis()),
        };
        let mut headers = self.headers;
        headers.insert(headers::ID, Value::String(id));
        headers.insert(headers::TIMESTAMP, Value::from(timestamp));
        Message {
            headers,
            payload: self.payload,
        }
    }
}
