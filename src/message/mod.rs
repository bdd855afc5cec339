//! Message - the immutable envelope every component operates on.
//!
//! A message is a [`Payload`] plus [`Headers`]. It is built once through
//! [`MessageBuilder`] (which assigns `id` and `timestamp`) and never mutated
//! afterwards: the `with_*` methods consume the message and return a new one.
//!
//! ## Example
//!
//! ```
//! use sourced_dispatch::{MessageBuilder, Payload};
//! use serde_json::json;
//!
//! let parent = MessageBuilder::with_payload(Payload::new("PlaceOrder", json!({ "orderId": "42" })))
//!     .build();
//! let child = MessageBuilder::from_causation(&parent).build();
//!
//! assert_eq!(child.causation_id(), Some(parent.id()));
//! assert_eq!(child.correlation_id(), Some(parent.id()));
//! ```

mod builder;
pub mod headers;
mod identity;
mod payload;

pub use builder::MessageBuilder;
pub use headers::{HeaderValue, Headers};
pub use identity::{IdGenerator, Identity, SharedClock, SharedIdGenerator, UuidGenerator};
pub use payload::{Payload, PayloadType};

/// An immutable message.
#[derive(Clone, Debug)]
pub struct Message {
    headers: Headers,
    payload: Payload,
}

impl Message {
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The id assigned at build time.
    pub fn id(&self) -> &str {
        self.headers
            .find(headers::ID)
            .and_then(HeaderValue::as_str)
            .unwrap_or_default()
    }

    /// Epoch milliseconds assigned at build time.
    pub fn timestamp(&self) -> i64 {
        self.headers
            .find(headers::TIMESTAMP)
            .and_then(HeaderValue::as_value)
            .and_then(serde_json::Value::as_i64)
            .unwrap_or_default()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.headers
            .find(headers::CORRELATION_ID)
            .and_then(HeaderValue::as_str)
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.headers
            .find(headers::CAUSATION_ID)
            .and_then(HeaderValue::as_str)
    }

    pub fn reply_destination(&self) -> Option<&HeaderValue> {
        self.headers.find(headers::REPLY_DESTINATION)
    }

    pub fn error_destination(&self) -> Option<&HeaderValue> {
        self.headers.find(headers::ERROR_DESTINATION)
    }

    /// Return a message with the header set. Id and timestamp stay fixed.
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

    /// Return a message without the header. Id and timestamp can't be removed.
    pub fn without_header(self, name: &str) -> Self {
        self.take_header(name).0
    }

    /// Split a header off the message.
    pub fn take_header(mut self, name: &str) -> (Self, Option<HeaderValue>) {
        if name == headers::ID || name == headers::TIMESTAMP {
            return (self, None);
        }
        let value = self.headers.remove(name);
        (self, value)
    }

    /// Return a message carrying a different payload with the same headers.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}
