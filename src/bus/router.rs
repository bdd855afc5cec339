use tracing::debug;

use super::{BusKind, RoutingTable};
use crate::channel::{ChannelRef, ChannelResolver, Destination};
use crate::error::{DispatchError, Result};
use crate::message::{HeaderValue, Message};

/// How a router picks destinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Addressing {
    /// By the payload type, through a [`RoutingTable`].
    ByObject,
    /// By a channel name carried in a header.
    ByName,
}

/// Persistent builder for a [`BusRouter`].
#[derive(Clone, Debug)]
pub struct BusRouterBuilder {
    kind: BusKind,
    addressing: Addressing,
    routes: RoutingTable,
    name_header: String,
    resolution_required: bool,
}

impl BusRouterBuilder {
    fn new(kind: BusKind, addressing: Addressing, routes: RoutingTable) -> Self {
        Self {
            kind,
            addressing,
            routes,
            name_header: kind.default_name_header().to_string(),
            resolution_required: Self::default_resolution(kind, addressing),
        }
    }

    fn default_resolution(kind: BusKind, addressing: Addressing) -> bool {
        !(kind == BusKind::Event && addressing == Addressing::ByObject)
    }

    pub fn command_by_object(routes: RoutingTable) -> Self {
        Self::new(BusKind::Command, Addressing::ByObject, routes)
    }

    pub fn command_by_name() -> Self {
        Self::new(BusKind::Command, Addressing::ByName, RoutingTable::new())
    }

    pub fn query_by_object(routes: RoutingTable) -> Self {
        Self::new(BusKind::Query, Addressing::ByObject, routes)
    }

    pub fn query_by_name() -> Self {
        Self::new(BusKind::Query, Addressing::ByName, RoutingTable::new())
    }

    pub fn event_by_object(routes: RoutingTable) -> Self {
        Self::new(BusKind::Event, Addressing::ByObject, routes)
    }

    pub fn event_by_name() -> Self {
        Self::new(BusKind::Event, Addressing::ByName, RoutingTable::new())
    }

    /// Override the header read by a by-name router.
    pub fn with_name_header(mut self, header: impl Into<String>) -> Self {
        self.name_header = header.into();
        self
    }

    /// Only event-by-name routers may change this.
    pub fn with_resolution_required(mut self, required: bool) -> Self {
        self.resolution_required = required;
        self
    }

    pub fn kind(&self) -> BusKind {
        self.kind
    }

    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    /// The channel this router listens on.
    pub fn input_channel(&self) -> &'static str {
        match self.addressing {
            Addressing::ByObject => self.kind.by_object_channel(),
            Addressing::ByName => self.kind.by_name_channel(),
        }
    }

    /// Freeze the router. Destinations are resolved per message against
    /// `resolver`.
    pub fn build(&self, resolver: &ChannelResolver) -> Result<BusRouter> {
        let configurable = self.kind == BusKind::Event && self.addressing == Addressing::ByName;
        if !configurable
            && self.resolution_required != Self::default_resolution(self.kind, self.addressing)
        {
            return Err(DispatchError::configuration(format!(
                "resolution-required is fixed for the {} bus {:?} router",
                self.kind, self.addressing
            )));
        }
        if self.addressing == Addressing::ByName && self.name_header.is_empty() {
            return Err(DispatchError::configuration(format!(
                "{} bus by-name router has an empty name header",
                self.kind
            )));
        }
        Ok(BusRouter {
            kind: self.kind,
            addressing: self.addressing,
            routes: self.routes.clone(),
            name_header: self.name_header.clone(),
            resolution_required: self.resolution_required,
            resolver: resolver.clone(),
        })
    }
}

/// Routes one bus kind's messages in one addressing mode.
#[derive(Clone)]
pub struct BusRouter {
    kind: BusKind,
    addressing: Addressing,
    routes: RoutingTable,
    name_header: String,
    resolution_required: bool,
    resolver: ChannelResolver,
}

impl BusRouter {
    pub fn kind(&self) -> BusKind {
        self.kind
    }

    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    pub fn name_header(&self) -> &str {
        &self.name_header
    }

    pub fn resolution_required(&self) -> bool {
        self.resolution_required
    }

    /// Destination names for `message`, without delivering it.
    pub fn route(&self, message: &Message) -> Result<Vec<String>> {
        match self.addressing {
            Addressing::ByObject => self.route_by_object(message),
            Addressing::ByName => self.route_by_name(message),
        }
    }

    /// Deliver `message` to every routed destination. Returns how many.
    ///
    /// Every destination is resolved before the first send, so an
    /// unregistered name delivers to nobody.
    pub fn dispatch(&self, message: Message) -> Result<usize> {
        let channels = self
            .route(&message)?
            .into_iter()
            .map(|name| {
                let channel = self.resolver.resolve(&name).map_err(|_| {
                    DispatchError::routing(self.kind, format!("channel {} is not registered", name))
                })?;
                Ok((name, channel))
            })
            .collect::<Result<Vec<(String, ChannelRef)>>>()?;
        for (name, channel) in &channels {
            debug!(bus = %self.kind, destination = %name, "routing message");
            channel.send(message.clone())?;
        }
        Ok(channels.len())
    }

    fn route_by_object(&self, message: &Message) -> Result<Vec<String>> {
        let payload_type = message.payload().payload_type();
        let destinations = self.routes.destinations(payload_type);
        match (self.kind, destinations.len()) {
            (BusKind::Event, 0) => {
                debug!(payload_type, "no event subscribers");
                Ok(Vec::new())
            }
            (BusKind::Event, _) | (_, 1) => Ok(destinations.to_vec()),
            (_, 0) => Err(DispatchError::routing(
                self.kind,
                format!("no handler for {}", payload_type),
            )),
            (_, n) => Err(DispatchError::routing(
                self.kind,
                format!("{} handlers for {}, expected exactly one", n, payload_type),
            )),
        }
    }

    fn route_by_name(&self, message: &Message) -> Result<Vec<String>> {
        let name = message
            .headers()
            .find(&self.name_header)
            .and_then(HeaderValue::as_str);
        let unresolved = match name {
            Some(name) if self.resolver.contains(name) => return Ok(vec![name.to_string()]),
            Some(name) => format!("channel {} is not registered", name),
            None => format!("header {} is missing", self.name_header),
        };
        if self.resolution_required {
            return Err(DispatchError::routing(self.kind, unresolved));
        }
        debug!(bus = %self.kind, reason = %unresolved, "unresolved by-name route ignored");
        Ok(Vec::new())
    }
}

impl Destination for BusRouter {
    fn send(&self, message: Message) -> Result<()> {
        self.dispatch(message).map(|_| ())
    }
}
