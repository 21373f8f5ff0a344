//! Domain module for commit event aggregation
//!
//! ## Core Modules
//! - outcome: per-peer outcomes and the final report
//! - scope: event scope and the frozen peer set
//! - strategy: AllOf / AnyOf quorum policies
//! - preset: the four named (scope, strategy) presets

pub mod outcome;
pub mod preset;
pub mod scope;
pub mod strategy;

pub use outcome::{CommitOutcome, CommitStatus, TransactionOutcome};
pub use preset::EventStrategy;
pub use scope::{EventScope, PeerSet};
pub use strategy::{CommitStrategy, Decision, StrategyKind, StrategyState};
