//! # Commit Telemetry
//!
//! Logging initialization for Commit-Watch binaries, plus Prometheus text
//! export of the engine counters when built with the `metrics` feature.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use commit_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `COMMIT_SERVICE_NAME` | `commit-watch` | Service name in log lines |
//! | `COMMIT_LOG_LEVEL` | `info` | Log filter, falls back to `RUST_LOG` |
//! | `COMMIT_JSON_LOGS` | `false` | JSON output (default on in containers) |

mod config;
mod logging;
#[cfg(feature = "metrics")]
mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};
#[cfg(feature = "metrics")]
pub use metrics::encode_metrics;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{directive}': {reason}")]
    Filter { directive: String, reason: String },

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),

    #[error("Failed to export metrics: {0}")]
    MetricsExport(String),
}
