//! Configuration - compiling a snapshot into a running messaging system.
//!
//! A [`ConfigurationSnapshot`] is the closed set of registrations the system
//! is built from: aggregate descriptors, generic handlers, external channels,
//! repositories, interceptors and [`DispatchSettings`]. [`MessagingSystem`]
//! compiles it once; there is no reload.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use sourced_dispatch::{
//!     ConfigurationSnapshot, HandlerEndpoint, HandlerPipelineBuilder, Message, MessagingSystem,
//!     Payload, BusKind,
//! };
//! use serde_json::json;
//!
//! let greeter = HandlerPipelineBuilder::new("greeter").with_handler(
//!     |m: Message| -> sourced_dispatch::Result<Option<Message>> {
//!         Ok(Some(m.with_payload(Payload::new("Greeting", json!("hello")))))
//!     },
//! );
//! let snapshot = ConfigurationSnapshot::new()
//!     .with_handler(HandlerEndpoint::new("greet", greeter).handles(BusKind::Query, "Greet"));
//!
//! let system = MessagingSystem::build(&snapshot).unwrap();
//! let reply = system
//!     .query_bus()
//!     .send_payload(Payload::new("Greet", json!({})))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(reply.payload().body(), &json!("hello"));
//! ```

mod endpoints;
mod settings;
mod snapshot;
mod system;

pub use endpoints::AsyncEndpoints;
pub use settings::{AsyncEndpointSetting, DispatchSettings, NameHeaders, RouteSettings};
pub use snapshot::{ConfigurationSnapshot, HandlerEndpoint};
pub use system::MessagingSystem;
