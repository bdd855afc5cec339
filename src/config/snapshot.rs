use std::sync::Arc;

use super::{AsyncEndpointSetting, DispatchSettings};
use crate::aggregate::{
    AggregateDescriptor, AggregateRepository, ParameterConverter, PayloadConverter,
    RepositoryRegistry,
};
use crate::bus::BusKind;
use crate::channel::ChannelRef;
use crate::handler::HandlerPipelineBuilder;
use crate::interceptor::{InterceptorEntry, InterceptorRegistry};
use crate::message::Identity;

/// A generic handler pipeline bound to an input channel.
#[derive(Clone)]
pub struct HandlerEndpoint {
    pub(crate) input_channel: String,
    pub(crate) pipeline: HandlerPipelineBuilder,
    pub(crate) handles: Option<(BusKind, String)>,
}

impl HandlerEndpoint {
    /// The pipeline's name doubles as the endpoint id.
    pub fn new(input_channel: impl Into<String>, pipeline: HandlerPipelineBuilder) -> Self {
        Self {
            input_channel: input_channel.into(),
            pipeline,
            handles: None,
        }
    }

    /// Route payloads of `payload_type` on `bus` to this endpoint.
    pub fn handles(mut self, bus: BusKind, payload_type: impl Into<String>) -> Self {
        self.handles = Some((bus, payload_type.into()));
        self
    }

    pub fn input_channel(&self) -> &str {
        &self.input_channel
    }

    pub fn endpoint_id(&self) -> &str {
        self.pipeline.name()
    }
}

/// Everything a [`MessagingSystem`](super::MessagingSystem) is compiled from.
///
/// A persistent builder: each `with_*` returns the extended snapshot.
#[derive(Clone)]
pub struct ConfigurationSnapshot {
    pub(crate) aggregates: Vec<AggregateDescriptor>,
    pub(crate) handlers: Vec<HandlerEndpoint>,
    pub(crate) channels: Vec<(String, ChannelRef)>,
    pub(crate) repositories: RepositoryRegistry,
    pub(crate) interceptors: InterceptorRegistry,
    pub(crate) converter: Arc<dyn ParameterConverter>,
    pub(crate) identity: Identity,
    pub(crate) settings: DispatchSettings,
}

impl Default for ConfigurationSnapshot {
    fn default() -> Self {
        Self {
            aggregates: Vec::new(),
            handlers: Vec::new(),
            channels: Vec::new(),
            repositories: RepositoryRegistry::new(),
            interceptors: InterceptorRegistry::new(),
            converter: Arc::new(PayloadConverter::new()),
            identity: Identity::default(),
            settings: DispatchSettings::default(),
        }
    }
}

impl ConfigurationSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aggregate(mut self, descriptor: AggregateDescriptor) -> Self {
        self.aggregates.push(descriptor);
        self
    }

    pub fn with_handler(mut self, endpoint: HandlerEndpoint) -> Self {
        self.handlers.push(endpoint);
        self
    }

    /// Register an externally provided channel.
    pub fn with_channel(mut self, name: impl Into<String>, channel: ChannelRef) -> Self {
        self.channels.push((name.into(), channel));
        self
    }

    /// Repositories are tried in registration order.
    pub fn with_repository(
        mut self,
        name: impl Into<String>,
        repository: Arc<dyn AggregateRepository>,
    ) -> Self {
        self.repositories = self.repositories.register(name, repository);
        self
    }

    pub fn with_interceptor(mut self, entry: InterceptorEntry) -> Self {
        self.interceptors = self.interceptors.register(entry);
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn ParameterConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Clock and id generator used by the bus gateways.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Replaces all settings, including async endpoints added so far.
    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_async_endpoint(
        mut self,
        channel: impl Into<String>,
        endpoint_id: impl Into<String>,
    ) -> Self {
        self.settings.async_endpoints.push(AsyncEndpointSetting {
            channel: channel.into(),
            endpoint_id: endpoint_id.into(),
        });
        self
    }

    /// Mark an endpoint as needing a running consumer.
    pub fn with_required_consumer(mut self, endpoint_id: impl Into<String>) -> Self {
        self.settings.required_consumers.push(endpoint_id.into());
        self
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }
}
