//! Message payload: a type key plus a JSON body.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Stable routing name for a payload type.
///
/// By-object routing keys on this name, never on `std::any::type_name`, so
/// refactors don't silently change routes.
pub trait PayloadType {
    const PAYLOAD_TYPE: &'static str;
}

/// An opaque payload value tagged with its type key.
#[derive(Clone, Debug, PartialEq)]
pub struct Payload {
    payload_type: String,
    body: Value,
}

impl Payload {
    pub fn new(payload_type: impl Into<String>, body: Value) -> Self {
        Self {
            payload_type: payload_type.into(),
            body,
        }
    }

    /// Encode a typed payload with serde.
    pub fn encode<T: PayloadType + Serialize>(payload: &T) -> Result<Self> {
        Ok(Self::new(T::PAYLOAD_TYPE, serde_json::to_value(payload)?))
    }

    /// Decode the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn payload_type(&self) -> &str {
        &self.payload_type
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Read the value at a dotted property path (`order.id`, `lines.0.sku`).
    ///
    /// `null` counts as absent.
    pub fn property(&self, path: &str) -> Option<&Value> {
        let mut current = &self.body;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }
}
