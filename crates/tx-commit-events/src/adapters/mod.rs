//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits for in-process use.

mod channel_scope;
mod event_hub;

pub use channel_scope::ChannelScopeResolver;
pub use event_hub::{InMemoryEventHub, InMemoryEventHubFactory};
