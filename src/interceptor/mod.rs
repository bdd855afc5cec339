//! Interceptors - ordered wrapping of a target invocation.
//!
//! An [`Interceptor`] receives the message and a [`Next`] handle. It may run
//! code before and after `next.proceed(message)`, change the message, or
//! short-circuit by returning its own result without proceeding.
//!
//! The [`InterceptorRegistry`] only guarantees ordering: ascending precedence,
//! registration order on ties. Chains are computed once per target when a
//! pipeline is built.
//!
//! ## Example
//!
//! ```
//! use sourced_dispatch::interceptor::{self, InterceptorEntry, InterceptorRegistry, TargetSignature};
//!
//! let target = TargetSignature::new("Order", "place");
//! let registry = InterceptorRegistry::new()
//!     .register(InterceptorEntry::new(10, interceptor::before(|m| Ok(m)), target.clone()))
//!     .register(InterceptorEntry::new(-5, interceptor::around(|m, next| next.proceed(m)), TargetSignature::any()));
//!
//! assert_eq!(registry.chain_for(&target).len(), 2);
//! ```

mod chain;
mod registry;

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::message::Message;

pub use chain::{InterceptorChain, Next};
pub use registry::{InterceptorEntry, InterceptorRegistry};

/// Wraps the invocation of a target.
pub trait Interceptor: Send + Sync {
    fn around(&self, message: Message, next: Next<'_>) -> Result<Option<Message>>;
}

/// The owner and method an interceptor applies to. `*` matches anything.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TargetSignature {
    owner: String,
    method: String,
}

impl TargetSignature {
    pub const WILDCARD: &'static str = "*";

    pub fn new(owner: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
        }
    }

    /// Matches every target.
    pub fn any() -> Self {
        Self::new(Self::WILDCARD, Self::WILDCARD)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Whether this (possibly wildcarded) signature covers `target`.
    pub fn matches(&self, target: &TargetSignature) -> bool {
        (self.owner == Self::WILDCARD || self.owner == target.owner)
            && (self.method == Self::WILDCARD || self.method == target.method)
    }
}

impl fmt::Display for TargetSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.method)
    }
}

struct AroundFn<F>(F);

impl<F> Interceptor for AroundFn<F>
where
    F: Fn(Message, Next<'_>) -> Result<Option<Message>> + Send + Sync,
{
    fn around(&self, message: Message, next: Next<'_>) -> Result<Option<Message>> {
        (self.0)(message, next)
    }
}

struct BeforeFn<F>(F);

impl<F> Interceptor for BeforeFn<F>
where
    F: Fn(Message) -> Result<Message> + Send + Sync,
{
    fn around(&self, message: Message, next: Next<'_>) -> Result<Option<Message>> {
        next.proceed((self.0)(message)?)
    }
}

/// Interceptor from a closure that decides whether and how to proceed.
pub fn around<F>(f: F) -> Arc<dyn Interceptor>
where
    F: Fn(Message, Next<'_>) -> Result<Option<Message>> + Send + Sync + 'static,
{
    Arc::new(AroundFn(f))
}

/// Interceptor that transforms the message and always proceeds.
pub fn before<F>(f: F) -> Arc<dyn Interceptor>
where
    F: Fn(Message) -> Result<Message> + Send + Sync + 'static,
{
    Arc::new(BeforeFn(f))
}
