//! Handler pipelines - ordered stages composed into one invocable unit.
//!
//! A stage takes one message and produces zero or one message. The first
//! stage that produces nothing halts the pipeline: later stages don't run and
//! nothing reaches the output channel.
//!
//! ## Example
//!
//! ```
//! use sourced_dispatch::{ChannelResolver, HandlerPipelineBuilder, Message, MessageBuilder, Payload};
//! use serde_json::json;
//!
//! let pipeline = HandlerPipelineBuilder::new("greeter")
//!     .with_handler(|message: Message| -> sourced_dispatch::Result<Option<Message>> {
//!         let name = message.payload().body()["name"].as_str().unwrap_or("stranger").to_string();
//!         Ok(Some(message.with_payload(Payload::new("Greeting", json!(format!("hello {}", name))))))
//!     })
//!     .build(&ChannelResolver::default())
//!     .unwrap();
//!
//! let reply = pipeline
//!     .invoke(MessageBuilder::with_payload(Payload::new("Greet", json!({ "name": "Pat" }))).build())
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(reply.payload().body(), &json!("hello Pat"));
//! ```

mod pipeline;
mod stage;

use crate::error::Result;
use crate::message::Message;

pub use pipeline::{HandlerPipeline, HandlerPipelineBuilder};
pub use stage::PipelineStage;

/// Processes one message into zero or one message.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: Message) -> Result<Option<Message>>;
}

impl<F> MessageHandler for F
where
    F: Fn(Message) -> Result<Option<Message>> + Send + Sync,
{
    fn handle(&self, message: Message) -> Result<Option<Message>> {
        self(message)
    }
}
