//! # Commit Event Metrics
//!
//! Prometheus metrics for monitoring commit confirmation.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! tx-commit-events = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `commit_handlers_started_total` - Counter of handlers that started listening
//! - `commit_outcomes_total` - Counter of final outcomes (by status)
//! - `commit_peer_outcomes_total` - Counter of per-peer outcomes at finalization (by outcome)
//! - `commit_connection_errors_total` - Counter of per-peer connection failures

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Handlers that subscribed at least one event source
    pub static ref HANDLERS_STARTED: IntCounter = register_int_counter!(
        "commit_handlers_started_total",
        "Total number of commit event handlers started"
    )
    .expect("Failed to create HANDLERS_STARTED metric");

    /// Final outcomes, labeled by status
    pub static ref OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "commit_outcomes_total",
        "Total number of commit outcomes",
        &["status"]
    )
    .expect("Failed to create OUTCOMES metric");

    /// Per-peer outcomes recorded at finalization, labeled by outcome
    pub static ref PEER_OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "commit_peer_outcomes_total",
        "Total number of per-peer outcomes at finalization",
        &["outcome"]
    )
    .expect("Failed to create PEER_OUTCOMES metric");

    /// Peers whose event source could not be connected
    pub static ref CONNECTION_ERRORS: IntCounter = register_int_counter!(
        "commit_connection_errors_total",
        "Total number of per-peer event source connection failures"
    )
    .expect("Failed to create CONNECTION_ERRORS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_handler_started() {
    HANDLERS_STARTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_outcome(status: &str) {
    OUTCOMES.with_label_values(&[status]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_peer_outcome(outcome: &str) {
    PEER_OUTCOMES.with_label_values(&[outcome]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_connection_error() {
    CONNECTION_ERRORS.inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_handler_started() {}

#[cfg(not(feature = "metrics"))]
pub fn record_outcome(_status: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_peer_outcome(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_connection_error() {}
