use std::sync::Arc;

use super::{Interceptor, InterceptorChain, TargetSignature};

/// An interceptor bound to a target with a precedence.
///
/// Lower precedence runs earlier (further out).
#[derive(Clone)]
pub struct InterceptorEntry {
    precedence: i32,
    interceptor: Arc<dyn Interceptor>,
    target: TargetSignature,
}

impl InterceptorEntry {
    pub fn new(precedence: i32, interceptor: Arc<dyn Interceptor>, target: TargetSignature) -> Self {
        Self {
            precedence,
            interceptor,
            target,
        }
    }

    pub fn precedence(&self) -> i32 {
        self.precedence
    }

    pub fn target(&self) -> &TargetSignature {
        &self.target
    }
}

/// Precedence-ordered interceptor registrations.
#[derive(Clone, Default)]
pub struct InterceptorRegistry {
    entries: Vec<InterceptorEntry>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a registry with the entry appended in registration order.
    pub fn register(mut self, entry: InterceptorEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Interceptors matching `target`, ascending precedence, stable on ties.
    pub fn chain_for(&self, target: &TargetSignature) -> InterceptorChain {
        let mut matching: Vec<&InterceptorEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.target.matches(target))
            .collect();
        matching.sort_by_key(|entry| entry.precedence);
        InterceptorChain::new(
            matching
                .into_iter()
                .map(|entry| entry.interceptor.clone())
                .collect(),
        )
    }
}
