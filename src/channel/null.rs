use tracing::trace;

use super::Destination;
use crate::error::Result;
use crate::message::Message;

/// Name under which the void sink is always resolvable.
pub const NULL_CHANNEL: &str = "nullChannel";

/// Void sink. Accepts and discards everything.
///
/// Installed as the reply destination of fire-and-forget calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullChannel;

impl Destination for NullChannel {
    fn send(&self, message: Message) -> Result<()> {
        trace!(message_id = message.id(), "discarded by null channel");
        Ok(())
    }
}
