//! Error type shared by every dispatch component.

use thiserror::Error;

use crate::aggregate::Identifiers;
use crate::bus::BusKind;

/// Why an aggregate could not be loaded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotFoundReason {
    /// A mapped identifier had no value in the payload.
    #[error("aggregate identifier {identifier} is mapped from {payload_type}, but has no value")]
    MissingIdentifier {
        identifier: String,
        payload_type: String,
    },
    /// The repository returned nothing for the identifiers.
    #[error("no instance found for identifiers {identifiers}")]
    NoInstance { identifiers: Identifiers },
}

/// Error type for dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Build-time misconfiguration. Never raised once the system is running.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The Load stage could not resolve an aggregate instance.
    #[error("aggregate {aggregate_type} can't be loaded to call {method}: {reason}")]
    AggregateNotFound {
        aggregate_type: String,
        method: String,
        reason: NotFoundReason,
    },

    /// The inbound message failed a precondition (e.g. missing expected version).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The stored aggregate version moved on since it was loaded.
    #[error(
        "concurrent write detected for aggregate {aggregate_type} {identifiers} (expected version {expected}, got {actual})"
    )]
    ConcurrencyConflict {
        aggregate_type: String,
        identifiers: Identifiers,
        expected: u64,
        actual: u64,
    },

    /// A bus router could not pick a destination.
    #[error("{bus} bus can't route message: {reason}")]
    RoutingResolution { bus: BusKind, reason: String },

    /// No channel is registered under the name.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// A required header is missing.
    #[error("header not found: {0}")]
    HeaderNotFound(String),

    /// Domain logic refused the call.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Payload or argument (de)serialization failed.
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// An in-memory adapter's lock was poisoned.
    #[error("lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl DispatchError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        DispatchError::Configuration(reason.into())
    }

    pub(crate) fn routing(bus: BusKind, reason: impl Into<String>) -> Self {
        DispatchError::RoutingResolution {
            bus,
            reason: reason.into(),
        }
    }

    /// True for both flavours of [`DispatchError::AggregateNotFound`].
    pub fn is_aggregate_not_found(&self) -> bool {
        matches!(self, DispatchError::AggregateNotFound { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DispatchError>;
