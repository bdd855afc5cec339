use std::sync::Arc;

use tracing::debug;

use super::{
    AggregateDescriptor, DescriptorKind, InvokeStage, LoadStage, ParameterConverter,
    PayloadConverter, RepositoryRegistry, SaveStage,
};
use crate::channel::ChannelResolver;
use crate::error::Result;
use crate::handler::{HandlerPipeline, HandlerPipelineBuilder, PipelineStage};
use crate::interceptor::{InterceptorRegistry, TargetSignature};

/// Compiles an [`AggregateDescriptor`] into a [`HandlerPipeline`].
///
/// The repository is selected and the interceptor chain sorted once, here.
#[derive(Clone)]
pub struct AggregatePipelineBuilder {
    descriptor: AggregateDescriptor,
    repositories: RepositoryRegistry,
    interceptors: InterceptorRegistry,
    converter: Arc<dyn ParameterConverter>,
}

impl AggregatePipelineBuilder {
    pub fn new(descriptor: AggregateDescriptor) -> Self {
        Self {
            descriptor,
            repositories: RepositoryRegistry::new(),
            interceptors: InterceptorRegistry::new(),
            converter: Arc::new(PayloadConverter::new()),
        }
    }

    pub fn with_repositories(mut self, repositories: RepositoryRegistry) -> Self {
        self.repositories = repositories;
        self
    }

    pub fn with_interceptors(mut self, interceptors: InterceptorRegistry) -> Self {
        self.interceptors = interceptors;
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn ParameterConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn descriptor(&self) -> &AggregateDescriptor {
        &self.descriptor
    }

    pub fn build(&self, resolver: &ChannelResolver) -> Result<HandlerPipeline> {
        let descriptor = &self.descriptor;
        let repository = self
            .repositories
            .select(descriptor.aggregate_type, &descriptor.repository_selector)?;
        let chain = self.interceptors.chain_for(&TargetSignature::new(
            descriptor.aggregate_type,
            descriptor.method_name.clone(),
        ));

        let mut pipeline = HandlerPipelineBuilder::new(descriptor.endpoint_id())
            .with_stage(PipelineStage::Load(LoadStage::new(
                descriptor.clone(),
                repository.clone(),
            )))
            .with_stage(PipelineStage::Invoke(InvokeStage::new(
                descriptor.clone(),
                self.converter.clone(),
                chain,
            )));
        if descriptor.kind == DescriptorKind::Command {
            pipeline = pipeline.with_stage(PipelineStage::Save(SaveStage::new(
                descriptor.clone(),
                repository,
            )));
        }
        if let Some(output) = &descriptor.output_channel {
            pipeline = pipeline.with_output_channel(output.clone());
        }

        let pipeline = pipeline.build(resolver)?;
        debug!(
            endpoint = descriptor.endpoint_id(),
            stages = ?pipeline.stage_names(),
            "aggregate pipeline built"
        );
        Ok(pipeline)
    }
}
