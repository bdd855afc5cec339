//! End-to-end dispatch tests through a compiled messaging system.

mod support;
mod commands;
mod events;
mod configuration;
