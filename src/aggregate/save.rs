use std::sync::Arc;

use tracing::debug;

use super::{
    strip_internal_headers, AggregateDescriptor, AggregateRepository, AGGREGATE_INSTANCE,
    IDENTIFIERS_PAYLOAD,
};
use crate::error::Result;
use crate::message::{HeaderValue, Message, Payload};

/// Persists the aggregate and shapes the reply.
///
/// Factories reply with the new aggregate's identifiers, value-returning
/// methods with their value. Void calls on an existing aggregate don't reply.
/// A message without an aggregate instance, i.e. one an interceptor produced
/// in place of the call, is passed on unsaved.
#[derive(Clone)]
pub struct SaveStage {
    descriptor: AggregateDescriptor,
    repository: Arc<dyn AggregateRepository>,
}

impl SaveStage {
    pub fn new(descriptor: AggregateDescriptor, repository: Arc<dyn AggregateRepository>) -> Self {
        Self {
            descriptor,
            repository,
        }
    }

    pub fn save(&self, message: Message) -> Result<Option<Message>> {
        let (message, instance) = message.take_header(AGGREGATE_INSTANCE);
        let Some(HeaderValue::Aggregate(instance)) = instance else {
            // An interceptor answered without calling the method.
            debug!(
                method = %self.descriptor.method_name,
                "no aggregate instance on the message, save skipped"
            );
            return Ok(Some(strip_internal_headers(message)));
        };

        let version = self.repository.save(&instance)?;
        debug!(
            aggregate = instance.aggregate_type(),
            method = %self.descriptor.method_name,
            version,
            "save stage complete"
        );

        let message = strip_internal_headers(message);
        if self.descriptor.is_factory {
            let identifiers = Payload::new(IDENTIFIERS_PAYLOAD, instance.identifiers().to_value());
            return Ok(Some(message.with_payload(identifiers)));
        }
        if self.descriptor.is_void_return {
            return Ok(None);
        }
        Ok(Some(message))
    }
}
