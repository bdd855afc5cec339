use std::sync::Arc;

use tracing::debug;

use super::{AggregateInstance, Identifiers};
use crate::error::{DispatchError, Result};

/// Storage for aggregates, with optimistic version tokens.
pub trait AggregateRepository: Send + Sync {
    fn can_handle(&self, aggregate_type: &str) -> bool;

    fn find_by(
        &self,
        aggregate_type: &str,
        identifiers: &Identifiers,
    ) -> Result<Option<AggregateInstance>>;

    /// Load for a write that must fail if the stored version is no longer
    /// `expected_version` when saved.
    fn find_with_locking_by(
        &self,
        aggregate_type: &str,
        identifiers: &Identifiers,
        expected_version: u64,
    ) -> Result<Option<AggregateInstance>>;

    /// Persist the instance and return its new version.
    ///
    /// Fails with [`DispatchError::ConcurrencyConflict`] when the stored
    /// version moved past the instance's version token.
    fn save(&self, instance: &AggregateInstance) -> Result<u64>;
}

/// Which registered repositories a descriptor may bind to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RepositorySelector {
    /// Every registered repository, in registration order.
    #[default]
    Any,
    /// Only the named repositories, still in registration order.
    Named(Vec<String>),
}

impl RepositorySelector {
    fn admits(&self, name: &str) -> bool {
        match self {
            RepositorySelector::Any => true,
            RepositorySelector::Named(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Named repositories in registration order.
#[derive(Clone, Default)]
pub struct RepositoryRegistry {
    entries: Vec<(String, Arc<dyn AggregateRepository>)>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        name: impl Into<String>,
        repository: Arc<dyn AggregateRepository>,
    ) -> Self {
        self.entries.push((name.into(), repository));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First admitted repository whose `can_handle` accepts the type.
    pub fn select(
        &self,
        aggregate_type: &str,
        selector: &RepositorySelector,
    ) -> Result<Arc<dyn AggregateRepository>> {
        self.entries
            .iter()
            .filter(|(name, _)| selector.admits(name))
            .find(|(_, repository)| repository.can_handle(aggregate_type))
            .map(|(name, repository)| {
                debug!(aggregate = aggregate_type, repository = %name, "repository bound");
                repository.clone()
            })
            .ok_or_else(|| {
                DispatchError::configuration(format!(
                    "no repository can handle aggregate {}",
                    aggregate_type
                ))
            })
    }
}
