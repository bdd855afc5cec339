//! Channels - named delivery points.
//!
//! Every dispatch eventually hands a message to a [`Destination`]. Names are
//! mapped to destinations by a [`ChannelResolver`] built once from the
//! configuration snapshot.
//!
//! ```text
//! BusRouter ──resolve(name)──► ChannelResolver ──► Destination
//!                                                   ├─ HandlerPipeline
//!                                                   ├─ BusRouter
//!                                                   ├─ QueueChannel
//!                                                   └─ NullChannel
//! ```
//!
//! Transports that defer delivery to another thread or process implement
//! [`Destination`] outside this crate.

mod null;
mod queue;
mod resolver;

use std::sync::Arc;

use crate::error::Result;
use crate::message::Message;

pub use null::{NullChannel, NULL_CHANNEL};
pub use queue::QueueChannel;
pub use resolver::{ChannelResolver, ChannelResolverBuilder};

/// Something a message can be sent to.
pub trait Destination: Send + Sync {
    fn send(&self, message: Message) -> Result<()>;
}

/// Shared handle to a destination.
pub type ChannelRef = Arc<dyn Destination>;
