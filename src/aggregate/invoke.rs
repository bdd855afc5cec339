use std::sync::Arc;

use tracing::debug;

use super::{
    strip_internal_headers, AggregateDescriptor, DescriptorKind, Invocation, ParameterConverter,
    AGGREGATE_INSTANCE,
};
use crate::error::Result;
use crate::interceptor::{InterceptorChain, TargetSignature};
use crate::message::{HeaderValue, Message};

/// Calls the aggregate method through its interceptor chain.
///
/// A void call passes the message on unchanged. A value becomes the new
/// payload. For queries this is the last stage, so internal headers are
/// stripped here.
#[derive(Clone)]
pub struct InvokeStage {
    descriptor: AggregateDescriptor,
    target: TargetSignature,
    converter: Arc<dyn ParameterConverter>,
    interceptors: InterceptorChain,
}

impl InvokeStage {
    pub fn new(
        descriptor: AggregateDescriptor,
        converter: Arc<dyn ParameterConverter>,
        interceptors: InterceptorChain,
    ) -> Self {
        let target = TargetSignature::new(descriptor.aggregate_type, descriptor.method_name.clone());
        Self {
            descriptor,
            target,
            converter,
            interceptors,
        }
    }

    pub fn target(&self) -> &TargetSignature {
        &self.target
    }

    pub fn invoke(&self, message: Message) -> Result<Option<Message>> {
        let result = self.interceptors.run(message, &|message| self.call(message))?;
        if self.descriptor.kind == DescriptorKind::Command {
            return Ok(result);
        }
        Ok(result.map(strip_internal_headers))
    }

    fn call(&self, message: Message) -> Result<Option<Message>> {
        let arguments = self.converter.resolve_arguments(&message, &self.target)?;
        let (mut message, instance) = message.take_header(AGGREGATE_INSTANCE);
        let mut instance = match instance {
            Some(HeaderValue::Aggregate(instance)) => Some(instance),
            _ => None,
        };

        let invocation = self
            .descriptor
            .method
            .invoke(instance.as_mut(), arguments)?;
        debug!(target_method = %self.target, "aggregate method invoked");

        if let Some(instance) = instance {
            message = message.with_header(AGGREGATE_INSTANCE, instance);
        }
        Ok(Some(match invocation {
            Invocation::Void => message,
            Invocation::Created(created) => message.with_header(AGGREGATE_INSTANCE, created),
            Invocation::Value(_) if self.descriptor.is_void_return => message,
            Invocation::Value(payload) => message.with_payload(payload),
        }))
    }
}
