use std::collections::HashSet;
use std::sync::{Arc, OnceLock, Weak};

use tracing::{debug, warn};

use super::{AsyncEndpoints, ConfigurationSnapshot};
use crate::aggregate::{AggregatePipelineBuilder, DescriptorKind};
use crate::bus::{BusKind, BusRouterBuilder, CommandBus, EventBus, QueryBus, RoutingTable};
use crate::channel::{ChannelRef, ChannelResolver, ChannelResolverBuilder, Destination};
use crate::error::{DispatchError, Result};
use crate::message::Message;

/// Forwards to a channel of the final resolver, which only exists once every
/// pipeline and router has been built.
struct DeferredChannel {
    name: String,
    resolver: Weak<OnceLock<ChannelResolver>>,
}

impl Destination for DeferredChannel {
    fn send(&self, message: Message) -> Result<()> {
        let unknown = || DispatchError::UnknownChannel(self.name.clone());
        let cell = self.resolver.upgrade().ok_or_else(unknown)?;
        let resolver = cell.get().ok_or_else(unknown)?;
        resolver.resolve(&self.name)?.send(message)
    }
}

/// A compiled, immutable messaging system.
pub struct MessagingSystem {
    resolver: ChannelResolver,
    command_bus: CommandBus,
    query_bus: QueryBus,
    event_bus: EventBus,
    async_endpoints: AsyncEndpoints,
    required_consumers: Vec<String>,
    endpoint_ids: Vec<String>,
    _late: Arc<OnceLock<ChannelResolver>>,
}

impl MessagingSystem {
    /// Compile `snapshot` once.
    ///
    /// Fails with [`DispatchError::Configuration`] when two endpoints claim
    /// one input channel, a descriptor has no repository, an output channel
    /// doesn't resolve, an async registration is invalid, or a required
    /// consumer names no endpoint.
    pub fn build(snapshot: &ConfigurationSnapshot) -> Result<Self> {
        let settings = &snapshot.settings;
        let routers = Self::router_builders(snapshot);

        let mut internal = Vec::new();
        internal.extend(snapshot.aggregates.iter().map(|d| d.input_channel().to_string()));
        internal.extend(snapshot.handlers.iter().map(|h| h.input_channel.clone()));
        internal.extend(routers.iter().map(|r| r.input_channel().to_string()));

        let mut claimed = HashSet::new();
        for name in internal
            .iter()
            .chain(snapshot.channels.iter().map(|(name, _)| name))
        {
            if !claimed.insert(name.as_str()) {
                return Err(DispatchError::configuration(format!(
                    "input channel {} is claimed by more than one endpoint",
                    name
                )));
            }
        }

        let late: Arc<OnceLock<ChannelResolver>> = Arc::new(OnceLock::new());
        let provisional = internal
            .iter()
            .fold(Self::external(snapshot), |builder, name| {
                let deferred: ChannelRef = Arc::new(DeferredChannel {
                    name: name.clone(),
                    resolver: Arc::downgrade(&late),
                });
                builder.with_channel(name.clone(), deferred)
            })
            .build()?;

        let mut endpoints: Vec<(String, ChannelRef)> = Vec::new();
        for descriptor in &snapshot.aggregates {
            let pipeline = AggregatePipelineBuilder::new(descriptor.clone())
                .with_repositories(snapshot.repositories.clone())
                .with_interceptors(snapshot.interceptors.clone())
                .with_converter(snapshot.converter.clone())
                .build(&provisional)?;
            let channel: ChannelRef = Arc::new(pipeline);
            endpoints.push((descriptor.input_channel().to_string(), channel));
        }
        for handler in &snapshot.handlers {
            let pipeline = handler.pipeline.build(&provisional)?;
            let channel: ChannelRef = Arc::new(pipeline);
            endpoints.push((handler.input_channel.clone(), channel));
        }
        for router in &routers {
            let channel: ChannelRef = Arc::new(router.build(&provisional)?);
            endpoints.push((router.input_channel().to_string(), channel));
        }

        let resolver = endpoints
            .into_iter()
            .fold(Self::external(snapshot), |builder, (name, channel)| {
                builder.with_channel(name, channel)
            })
            .build()?;
        late.set(resolver.clone())
            .map_err(|_| DispatchError::configuration("resolver was initialised twice"))?;

        let endpoint_ids: Vec<String> = snapshot
            .aggregates
            .iter()
            .map(|d| d.endpoint_id().to_string())
            .chain(snapshot.handlers.iter().map(|h| h.endpoint_id().to_string()))
            .collect();
        let async_endpoints = Self::register_async(snapshot)?;
        let required_consumers = Self::check_required_consumers(snapshot, &endpoint_ids)?;
        let identity = snapshot.identity.clone();
        let system = Self {
            command_bus: CommandBus::new(&resolver, settings.name_header(BusKind::Command), identity.clone())?,
            query_bus: QueryBus::new(&resolver, settings.name_header(BusKind::Query), identity.clone())?,
            event_bus: EventBus::new(&resolver, settings.name_header(BusKind::Event), identity)?,
            async_endpoints,
            required_consumers,
            endpoint_ids,
            resolver,
            _late: late,
        };
        debug!(
            endpoints = system.endpoint_ids.len(),
            channels = system.resolver.names().len(),
            "messaging system built"
        );
        Ok(system)
    }

    pub fn resolver(&self) -> &ChannelResolver {
        &self.resolver
    }

    pub fn command_bus(&self) -> &CommandBus {
        &self.command_bus
    }

    pub fn query_bus(&self) -> &QueryBus {
        &self.query_bus
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn async_endpoints(&self) -> &AsyncEndpoints {
        &self.async_endpoints
    }

    pub fn endpoint_ids(&self) -> &[String] {
        &self.endpoint_ids
    }

    /// Endpoint ids an external runtime must start a consumer for.
    pub fn required_consumers(&self) -> &[String] {
        &self.required_consumers
    }

    fn external(snapshot: &ConfigurationSnapshot) -> ChannelResolverBuilder {
        snapshot
            .channels
            .iter()
            .fold(ChannelResolver::builder(), |builder, (name, channel)| {
                builder.with_channel(name.clone(), channel.clone())
            })
    }

    fn routes(snapshot: &ConfigurationSnapshot, bus: BusKind) -> RoutingTable {
        let from_aggregates = snapshot.aggregates.iter().filter_map(|d| {
            let kind = match d.kind() {
                DescriptorKind::Command => BusKind::Command,
                DescriptorKind::Query => BusKind::Query,
            };
            d.handles()
                .filter(|_| kind == bus)
                .map(|payload_type| (payload_type.to_string(), d.input_channel().to_string()))
        });
        let from_handlers = snapshot.handlers.iter().filter_map(|h| match &h.handles {
            Some((kind, payload_type)) if *kind == bus => {
                Some((payload_type.clone(), h.input_channel.clone()))
            }
            _ => None,
        });
        from_aggregates
            .chain(from_handlers)
            .fold(RoutingTable::new(), |table, (payload_type, destination)| {
                table.with_route(payload_type, destination)
            })
            .merged(snapshot.settings.routes(bus))
    }

    fn router_builders(snapshot: &ConfigurationSnapshot) -> Vec<BusRouterBuilder> {
        let settings = &snapshot.settings;
        vec![
            BusRouterBuilder::command_by_object(Self::routes(snapshot, BusKind::Command)),
            BusRouterBuilder::command_by_name()
                .with_name_header(settings.name_header(BusKind::Command)),
            BusRouterBuilder::query_by_object(Self::routes(snapshot, BusKind::Query)),
            BusRouterBuilder::query_by_name()
                .with_name_header(settings.name_header(BusKind::Query)),
            BusRouterBuilder::event_by_object(Self::routes(snapshot, BusKind::Event)),
            BusRouterBuilder::event_by_name()
                .with_name_header(settings.name_header(BusKind::Event))
                .with_resolution_required(settings.event_by_name_resolution_required),
        ]
    }

    fn check_required_consumers(
        snapshot: &ConfigurationSnapshot,
        endpoint_ids: &[String],
    ) -> Result<Vec<String>> {
        let mut required: Vec<String> = Vec::new();
        for id in &snapshot.settings.required_consumers {
            if !endpoint_ids.contains(id) {
                return Err(DispatchError::configuration(format!(
                    "required consumer {} is not a registered endpoint",
                    id
                )));
            }
            if !required.contains(id) {
                required.push(id.clone());
            }
        }
        Ok(required)
    }

    fn register_async(snapshot: &ConfigurationSnapshot) -> Result<AsyncEndpoints> {
        let mut registered = AsyncEndpoints::new();
        for setting in &snapshot.settings.async_endpoints {
            let descriptor = snapshot
                .aggregates
                .iter()
                .find(|d| d.endpoint_id() == setting.endpoint_id);
            if descriptor.is_some_and(|d| d.kind() == DescriptorKind::Query) {
                warn!(
                    endpoint = %setting.endpoint_id,
                    channel = %setting.channel,
                    "query endpoints are always synchronous, async registration skipped"
                );
                continue;
            }
            if let Some(descriptor) = descriptor {
                if descriptor.explicit_endpoint_id().is_none() {
                    return Err(DispatchError::configuration(format!(
                        "{}::{} needs an explicit endpoint id to be consumed asynchronously",
                        descriptor.aggregate_type(),
                        descriptor.method_name()
                    )));
                }
            }
            let known = descriptor.is_some()
                || snapshot
                    .handlers
                    .iter()
                    .any(|h| h.endpoint_id() == setting.endpoint_id);
            if !known && !setting.endpoint_id.is_empty() {
                return Err(DispatchError::configuration(format!(
                    "async endpoint {} is not registered",
                    setting.endpoint_id
                )));
            }
            registered.register(&setting.channel, &setting.endpoint_id)?;
        }
        Ok(registered)
    }
}
