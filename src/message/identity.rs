//! Injectable id and clock capabilities used when messages are built.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

/// Produces unique message ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Shared id generator handle.
pub type SharedIdGenerator = Arc<dyn IdGenerator>;

/// The pair of capabilities a message needs at build time.
#[derive(Clone)]
pub struct Identity {
    clock: SharedClock,
    ids: SharedIdGenerator,
}

impl Identity {
    pub fn new(clock: SharedClock, ids: SharedIdGenerator) -> Self {
        Self { clock, ids }
    }

    pub(crate) fn next_id(&self) -> String {
        self.ids.generate()
    }

    pub(crate) fn now_millis(&self) -> i64 {
        self.clock.utc().timestamp_millis()
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock), Arc::new(UuidGenerator))
    }
}
