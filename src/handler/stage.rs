use std::sync::Arc;

use super::MessageHandler;
use crate::aggregate::{InvokeStage, LoadStage, SaveStage};
use crate::error::Result;
use crate::message::Message;

/// One step of a pipeline.
#[derive(Clone)]
pub enum PipelineStage {
    /// Resolve identifiers and load the aggregate.
    Load(LoadStage),
    /// Call the aggregate method through its interceptor chain.
    Invoke(InvokeStage),
    /// Persist the aggregate.
    Save(SaveStage),
    /// Any other handler.
    Generic(Arc<dyn MessageHandler>),
}

impl PipelineStage {
    pub fn process(&self, message: Message) -> Result<Option<Message>> {
        match self {
            PipelineStage::Load(stage) => stage.load(message),
            PipelineStage::Invoke(stage) => stage.invoke(message),
            PipelineStage::Save(stage) => stage.save(message),
            PipelineStage::Generic(handler) => handler.handle(message),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Load(_) => "load",
            PipelineStage::Invoke(_) => "invoke",
            PipelineStage::Save(_) => "save",
            PipelineStage::Generic(_) => "generic",
        }
    }
}
