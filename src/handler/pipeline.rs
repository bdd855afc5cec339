use std::sync::Arc;

use tracing::debug;

use super::{MessageHandler, PipelineStage};
use crate::channel::{ChannelRef, ChannelResolver, Destination};
use crate::error::{DispatchError, Result};
use crate::message::{HeaderValue, Message};

/// Collects stages for a [`HandlerPipeline`].
///
/// Every `with_*` call returns a new builder; `build()` validates and freezes.
#[derive(Clone, Default)]
pub struct HandlerPipelineBuilder {
    name: String,
    stages: Vec<PipelineStage>,
    output_channel: Option<String>,
}

impl HandlerPipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_stage(mut self, stage: PipelineStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_handler<H>(self, handler: H) -> Self
    where
        H: MessageHandler + 'static,
    {
        self.with_stage(PipelineStage::Generic(Arc::new(handler)))
    }

    pub fn with_output_channel(mut self, name: impl Into<String>) -> Self {
        self.output_channel = Some(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate and freeze.
    ///
    /// Fails when no stage was added or the output channel doesn't resolve.
    /// The resolver is kept to route replies addressed by channel name.
    pub fn build(&self, resolver: &ChannelResolver) -> Result<HandlerPipeline> {
        if self.stages.is_empty() {
            return Err(DispatchError::configuration(format!(
                "pipeline `{}` has no stages",
                self.name
            )));
        }
        let output = match &self.output_channel {
            Some(name) => Some(resolver.resolve(name).map_err(|_| {
                DispatchError::configuration(format!(
                    "pipeline `{}` has unknown output channel `{}`",
                    self.name, name
                ))
            })?),
            None => None,
        };
        Ok(HandlerPipeline {
            name: self.name.clone(),
            stages: self.stages.clone().into(),
            output,
            replies: resolver.clone(),
        })
    }
}

/// A validated, immutable sequence of stages.
#[derive(Clone)]
pub struct HandlerPipeline {
    name: String,
    stages: Arc<[PipelineStage]>,
    output: Option<ChannelRef>,
    replies: ChannelResolver,
}

impl HandlerPipeline {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(PipelineStage::name).collect()
    }

    /// Run the stages in order.
    ///
    /// Returns the last stage's message when no output channel is configured.
    /// With an output channel the message is delivered there and `None` is
    /// returned.
    pub fn invoke(&self, message: Message) -> Result<Option<Message>> {
        let mut current = message;
        for stage in self.stages.iter() {
            match stage.process(current)? {
                Some(next) => current = next,
                None => {
                    debug!(pipeline = %self.name, stage = stage.name(), "pipeline halted");
                    return Ok(None);
                }
            }
        }
        match &self.output {
            Some(output) => {
                output.send(current)?;
                Ok(None)
            }
            None => Ok(Some(current)),
        }
    }

    fn reply_target(&self, reply: &Message) -> Result<Option<ChannelRef>> {
        match reply.reply_destination() {
            Some(HeaderValue::Channel(channel)) => Ok(Some(channel.clone())),
            Some(value) => match value.as_str() {
                Some(name) => Ok(Some(self.replies.resolve(name)?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }
}

impl MessageHandler for HandlerPipeline {
    fn handle(&self, message: Message) -> Result<Option<Message>> {
        self.invoke(message)
    }
}

/// Used as a channel endpoint, a pipeline sends its reply to the message's
/// reply destination, or drops it when there is none.
impl Destination for HandlerPipeline {
    fn send(&self, message: Message) -> Result<()> {
        let Some(reply) = self.invoke(message)? else {
            return Ok(());
        };
        match self.reply_target(&reply)? {
            Some(target) => target.send(reply),
            None => {
                debug!(pipeline = %self.name, "no reply destination, reply dropped");
                Ok(())
            }
        }
    }
}
