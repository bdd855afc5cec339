use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::BusKind;
use crate::channel::{ChannelRef, ChannelResolver, QueueChannel};
use crate::error::Result;
use crate::message::{Identity, Message, MessageBuilder, Payload, PayloadType};

/// Shared plumbing: build the message, send it to a router, collect a reply.
#[derive(Clone)]
struct Gateway {
    kind: BusKind,
    by_object: ChannelRef,
    by_name: ChannelRef,
    name_header: String,
    identity: Identity,
}

impl Gateway {
    fn new(kind: BusKind, resolver: &ChannelResolver, name_header: &str, identity: Identity) -> Result<Self> {
        Ok(Self {
            kind,
            by_object: resolver.resolve(kind.by_object_channel())?,
            by_name: resolver.resolve(kind.by_name_channel())?,
            name_header: name_header.to_string(),
            identity,
        })
    }

    fn builder(&self, payload: Payload) -> MessageBuilder {
        MessageBuilder::with_payload(payload).with_identity(self.identity.clone())
    }

    fn request(&self, channel: &ChannelRef, builder: MessageBuilder) -> Result<Option<Message>> {
        let replies = QueueChannel::new();
        let message = builder.with_reply_channel(Arc::new(replies.clone())).build();
        debug!(bus = %self.kind, payload_type = message.payload().payload_type(), "sending");
        channel.send(message)?;
        replies.receive()
    }

    fn named(&self, destination: &str, payload: Payload) -> MessageBuilder {
        self.builder(payload)
            .with_header(self.name_header.as_str(), destination)
    }
}

/// Sends commands and returns the handler's reply, if any.
#[derive(Clone)]
pub struct CommandBus {
    gateway: Gateway,
}

impl CommandBus {
    /// Bind to the command routers registered in `resolver`.
    pub fn new(resolver: &ChannelResolver, name_header: &str, identity: Identity) -> Result<Self> {
        Ok(Self {
            gateway: Gateway::new(BusKind::Command, resolver, name_header, identity)?,
        })
    }

    pub fn send<C: PayloadType + Serialize>(&self, command: &C) -> Result<Option<Message>> {
        self.send_payload(Payload::encode(command)?)
    }

    pub fn send_payload(&self, payload: Payload) -> Result<Option<Message>> {
        self.send_message(self.gateway.builder(payload))
    }

    /// Send a prepared message, e.g. one carrying metadata headers.
    pub fn send_message(&self, builder: MessageBuilder) -> Result<Option<Message>> {
        self.gateway.request(&self.gateway.by_object, builder)
    }

    /// Send to the channel named `destination`, bypassing type routing.
    pub fn send_with_routing(&self, destination: &str, payload: Payload) -> Result<Option<Message>> {
        let builder = self.gateway.named(destination, payload);
        self.gateway.request(&self.gateway.by_name, builder)
    }
}

/// Sends queries and returns the answer.
#[derive(Clone)]
pub struct QueryBus {
    gateway: Gateway,
}

impl QueryBus {
    pub fn new(resolver: &ChannelResolver, name_header: &str, identity: Identity) -> Result<Self> {
        Ok(Self {
            gateway: Gateway::new(BusKind::Query, resolver, name_header, identity)?,
        })
    }

    pub fn send<Q: PayloadType + Serialize>(&self, query: &Q) -> Result<Option<Message>> {
        self.send_payload(Payload::encode(query)?)
    }

    pub fn send_payload(&self, payload: Payload) -> Result<Option<Message>> {
        self.send_message(self.gateway.builder(payload))
    }

    pub fn send_message(&self, builder: MessageBuilder) -> Result<Option<Message>> {
        self.gateway.request(&self.gateway.by_object, builder)
    }

    pub fn send_with_routing(&self, destination: &str, payload: Payload) -> Result<Option<Message>> {
        let builder = self.gateway.named(destination, payload);
        self.gateway.request(&self.gateway.by_name, builder)
    }
}

/// Publishes events. Fire and forget.
#[derive(Clone)]
pub struct EventBus {
    gateway: Gateway,
}

impl EventBus {
    pub fn new(resolver: &ChannelResolver, name_header: &str, identity: Identity) -> Result<Self> {
        Ok(Self {
            gateway: Gateway::new(BusKind::Event, resolver, name_header, identity)?,
        })
    }

    pub fn publish<E: PayloadType + Serialize>(&self, event: &E) -> Result<()> {
        self.publish_payload(Payload::encode(event)?)
    }

    pub fn publish_payload(&self, payload: Payload) -> Result<()> {
        self.publish_message(self.gateway.builder(payload))
    }

    pub fn publish_message(&self, builder: MessageBuilder) -> Result<()> {
        self.gateway.by_object.send(builder.build())
    }

    pub fn publish_with_routing(&self, destination: &str, payload: Payload) -> Result<()> {
        self.gateway
            .by_name
            .send(self.gateway.named(destination, payload).build())
    }
}
