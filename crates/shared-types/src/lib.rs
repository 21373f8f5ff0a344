//! # Shared Types Crate
//!
//! Identity and membership types shared by the commit event engine, its
//! collaborator adapters and the tooling.
//!
//! ## Design Principles
//!
//! - **Newtyped identities**: peers, organizations (MSPs), channels and
//!   transactions are distinct types, never bare strings.
//! - **Channel as source of truth**: `ChannelConfig` lists every peer with its
//!   owning organization and roles; scope resolution reads only from it.

pub mod channel;
pub mod entities;
pub mod errors;

pub use channel::{ChannelConfig, PeerInfo, PeerRoles};
pub use entities::*;
pub use errors::*;
