//! Synchronous CQRS dispatch: messages, channels, handler pipelines,
//! interceptors, aggregate pipelines and the buses that route to them.
//!
//! A [`ConfigurationSnapshot`] is compiled once into a [`MessagingSystem`];
//! after that, everything is immutable and messages are dispatched on the
//! caller's thread.

pub mod aggregate;
pub mod bus;
pub mod channel;
pub mod config;
mod error;
pub mod handler;
pub mod interceptor;
pub mod message;

pub use aggregate::{
    AggregateDescriptor, AggregateDescriptorBuilder, AggregateInstance, AggregateMethod,
    AggregateRepository, AggregateRoot, FactoryMethod, Identifiers, InMemoryAggregateRepository,
    InstanceMethod, Invocation, RepositorySelector,
};
pub use bus::{BusKind, BusRouterBuilder, CommandBus, EventBus, QueryBus, RoutingTable};
pub use channel::{
    ChannelRef, ChannelResolver, ChannelResolverBuilder, Destination, NullChannel, QueueChannel,
};
pub use config::{ConfigurationSnapshot, DispatchSettings, HandlerEndpoint, MessagingSystem};
pub use error::{DispatchError, NotFoundReason, Result};
pub use handler::{HandlerPipeline, HandlerPipelineBuilder, MessageHandler, PipelineStage};
pub use interceptor::{Interceptor, InterceptorEntry, TargetSignature};
pub use message::{
    HeaderValue, Headers, IdGenerator, Identity, Message, MessageBuilder, Payload, PayloadType,
    UuidGenerator,
};
