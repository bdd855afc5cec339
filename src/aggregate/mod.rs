//! Aggregate dispatch - load, invoke and save an aggregate per message.
//!
//! An [`AggregateDescriptor`] says which aggregate method a message calls and
//! how to find the instance. [`AggregatePipelineBuilder`] compiles it into a
//! [`HandlerPipeline`](crate::handler::HandlerPipeline) of up to three stages:
//!
//! ```text
//!   message ──► Load ──► Invoke (interceptors ─► method) ──► Save ──► reply
//!                │                                            │
//!                └── none on filtered miss       command only ┘
//! ```
//!
//! Between stages the aggregate travels in internal headers. They are stripped
//! before a message leaves the pipeline.

mod converter;
mod descriptor;
mod invoke;
mod load;
mod memory;
mod method;
mod pipeline;
mod repository;
mod root;
mod save;

pub use converter::{ParameterConverter, PayloadConverter};
pub use descriptor::{AggregateDescriptor, AggregateDescriptorBuilder, DescriptorKind};
pub use invoke::InvokeStage;
pub use load::LoadStage;
pub use memory::InMemoryAggregateRepository;
pub use method::{decode_argument, AggregateMethod, FactoryMethod, InstanceMethod, Invocation};
pub use pipeline::AggregatePipelineBuilder;
pub use repository::{AggregateRepository, RepositoryRegistry, RepositorySelector};
pub use root::{AggregateInstance, AggregateRoot, Identifiers};
pub use save::SaveStage;

use crate::message::Message;

/// The loaded or created aggregate instance.
pub const AGGREGATE_INSTANCE: &str = "aggregate-instance";
/// Identifiers resolved from the payload.
pub const AGGREGATE_IDENTIFIERS: &str = "aggregate-identifiers";
/// Version token the caller expects the stored aggregate to have.
pub const EXPECTED_VERSION: &str = "expected-version";
pub const AGGREGATE_TYPE: &str = "aggregate-type";
pub const AGGREGATE_METHOD: &str = "aggregate-method";
pub const IS_FACTORY: &str = "is-factory";
/// The inbound message as it entered the pipeline.
pub const CALLING_MESSAGE: &str = "calling-message";

/// Headers scoped to the aggregate pipeline.
pub const INTERNAL_HEADERS: [&str; 7] = [
    AGGREGATE_INSTANCE,
    AGGREGATE_IDENTIFIERS,
    EXPECTED_VERSION,
    AGGREGATE_TYPE,
    AGGREGATE_METHOD,
    IS_FACTORY,
    CALLING_MESSAGE,
];

/// Payload type of the reply a factory call produces.
pub const IDENTIFIERS_PAYLOAD: &str = "AggregateIdentifiers";

pub(crate) fn strip_internal_headers(message: Message) -> Message {
    INTERNAL_HEADERS
        .iter()
        .fold(message, |message, name| message.without_header(name))
}
