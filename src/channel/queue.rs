//! In-memory pollable channel for replies, tests and single-process setups.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::Destination;
use crate::error::{DispatchError, Result};
use crate::message::Message;

/// In-memory FIFO channel.
///
/// Clones share the same queue, so one clone can be registered with a
/// resolver while another is polled.
///
/// ```
/// use sourced_dispatch::{Destination, MessageBuilder, Payload, QueueChannel};
/// use serde_json::json;
///
/// let channel = QueueChannel::new();
/// channel.send(MessageBuilder::with_payload(Payload::new("Ping", json!({}))).build()).unwrap();
///
/// let received = channel.receive().unwrap().unwrap();
/// assert_eq!(received.payload().payload_type(), "Ping");
/// assert!(channel.receive().unwrap().is_none());
/// ```
#[derive(Clone, Default)]
pub struct QueueChannel {
    queue: Arc<Mutex<VecDeque<Message>>>,
}

impl QueueChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest message, if any.
    pub fn receive(&self) -> Result<Option<Message>> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| DispatchError::LockPoisoned("queue receive"))?;
        Ok(queue.pop_front())
    }

    /// Take everything queued so far, oldest first.
    pub fn drain(&self) -> Result<Vec<Message>> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| DispatchError::LockPoisoned("queue drain"))?;
        Ok(queue.drain(..).collect())
    }

    /// Payload types of queued messages, oldest first.
    pub fn payload_types(&self) -> Result<Vec<String>> {
        let queue = self
            .queue
            .lock()
            .map_err(|_| DispatchError::LockPoisoned("queue read"))?;
        Ok(queue
            .iter()
            .map(|m| m.payload().payload_type().to_string())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Destination for QueueChannel {
    fn send(&self, message: Message) -> Result<()> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| DispatchError::LockPoisoned("queue send"))?;
        queue.push_back(message);
        Ok(())
    }
}
