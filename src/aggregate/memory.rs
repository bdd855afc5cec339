use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::{AggregateInstance, AggregateRepository, Identifiers};
use crate::error::{DispatchError, Result};

type Key = (String, String);

/// In-memory [`AggregateRepository`] with optimistic versioning.
///
/// A first save stores version 1; every later save increments it. Saving an
/// instance whose version token differs from the stored version fails with
/// [`DispatchError::ConcurrencyConflict`].
#[derive(Clone, Default)]
pub struct InMemoryAggregateRepository {
    handles: Option<Vec<String>>,
    storage: Arc<RwLock<HashMap<Key, AggregateInstance>>>,
}

impl InMemoryAggregateRepository {
    /// Handles every aggregate type.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles only the listed aggregate types.
    pub fn for_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            handles: Some(types.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self
            .storage
            .read()
            .map_err(|_| DispatchError::LockPoisoned("read"))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn key(aggregate_type: &str, identifiers: &Identifiers) -> Key {
        (aggregate_type.to_string(), identifiers.to_string())
    }
}

impl AggregateRepository for InMemoryAggregateRepository {
    fn can_handle(&self, aggregate_type: &str) -> bool {
        match &self.handles {
            Some(types) => types.iter().any(|t| t == aggregate_type),
            None => true,
        }
    }

    fn find_by(
        &self,
        aggregate_type: &str,
        identifiers: &Identifiers,
    ) -> Result<Option<AggregateInstance>> {
        let storage = self
            .storage
            .read()
            .map_err(|_| DispatchError::LockPoisoned("read"))?;
        Ok(storage.get(&Self::key(aggregate_type, identifiers)).cloned())
    }

    fn find_with_locking_by(
        &self,
        aggregate_type: &str,
        identifiers: &Identifiers,
        expected_version: u64,
    ) -> Result<Option<AggregateInstance>> {
        Ok(self
            .find_by(aggregate_type, identifiers)?
            .map(|instance| instance.with_version(expected_version)))
    }

    fn save(&self, instance: &AggregateInstance) -> Result<u64> {
        let identifiers = instance.identifiers();
        let key = Self::key(instance.aggregate_type(), &identifiers);
        let mut storage = self
            .storage
            .write()
            .map_err(|_| DispatchError::LockPoisoned("write"))?;

        let actual = storage
            .get(&key)
            .and_then(AggregateInstance::version)
            .unwrap_or(0);
        let expected = instance.version().unwrap_or(0);
        if expected != actual {
            return Err(DispatchError::ConcurrencyConflict {
                aggregate_type: instance.aggregate_type().to_string(),
                identifiers,
                expected,
                actual,
            });
        }

        let version = actual + 1;
        storage.insert(key, instance.clone().with_version(version));
        debug!(aggregate = instance.aggregate_type(), %identifiers, version, "aggregate saved");
        Ok(version)
    }
}
