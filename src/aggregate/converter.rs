use serde_json::Value;

use crate::error::Result;
use crate::interceptor::TargetSignature;
use crate::message::{HeaderValue, Message};

/// Turns a message into the argument list of a target method.
pub trait ParameterConverter: Send + Sync {
    fn resolve_arguments(&self, message: &Message, target: &TargetSignature) -> Result<Vec<Value>>;
}

/// Payload body first, then the configured headers in order.
///
/// Absent or non-JSON headers become `null`.
#[derive(Clone, Debug, Default)]
pub struct PayloadConverter {
    headers: Vec<String>,
}

impl PayloadConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>) -> Self {
        self.headers.push(name.into());
        self
    }
}

impl ParameterConverter for PayloadConverter {
    fn resolve_arguments(&self, message: &Message, _target: &TargetSignature) -> Result<Vec<Value>> {
        let mut arguments = Vec::with_capacity(self.headers.len() + 1);
        arguments.push(message.payload().body().clone());
        for name in &self.headers {
            arguments.push(
                message
                    .headers()
                    .find(name)
                    .and_then(HeaderValue::as_value)
                    .cloned()
                    .unwrap_or(Value::Null),
            );
        }
        Ok(arguments)
    }
}
