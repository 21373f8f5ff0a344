//! Handler and service configuration
//!
//! Options arrive as a loose JSON object from the client. `commitTimeoutMs`
//! is the only key the engine interprets; every other key is kept verbatim
//! in `extensions` for downstream consumers.

use crate::domain::EventStrategy;
use crate::error::{CommitEventError, CommitResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_types::{MspId, TransactionId};
use std::time::Duration;

/// Commit timeout used when the client does not set one (5 minutes).
pub const DEFAULT_COMMIT_TIMEOUT_MS: u64 = 300_000;

fn default_commit_timeout_ms() -> u64 {
    DEFAULT_COMMIT_TIMEOUT_MS
}

/// Client-supplied options for one handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHandlerOptions {
    #[serde(default = "default_commit_timeout_ms")]
    commit_timeout_ms: u64,
    #[serde(flatten)]
    extensions: Map<String, Value>,
}

impl Default for EventHandlerOptions {
    fn default() -> Self {
        Self {
            commit_timeout_ms: DEFAULT_COMMIT_TIMEOUT_MS,
            extensions: Map::new(),
        }
    }
}

impl EventHandlerOptions {
    /// Options with the given timeout and no extensions.
    pub fn new(commit_timeout_ms: u64) -> CommitResult<Self> {
        let options = Self {
            commit_timeout_ms,
            extensions: Map::new(),
        };
        options.validate()?;
        Ok(options)
    }

    /// Parse a JSON options object, keeping unrecognized keys.
    pub fn from_json(value: Value) -> CommitResult<Self> {
        let options: Self =
            serde_json::from_value(value).map_err(|e| CommitEventError::InvalidConfig {
                reason: e.to_string(),
            })?;
        options.validate()?;
        Ok(options)
    }

    /// Attach an extension key for downstream consumers.
    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    pub fn validate(&self) -> CommitResult<()> {
        if self.commit_timeout_ms == 0 {
            return Err(CommitEventError::InvalidConfig {
                reason: "commitTimeoutMs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn commit_timeout_ms(&self) -> u64 {
        self.commit_timeout_ms
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }

    /// Unrecognized keys, exactly as supplied.
    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }
}

/// Everything fixed about a handler at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct EventHandlerConfig {
    pub transaction_id: TransactionId,
    pub strategy: EventStrategy,
    pub options: EventHandlerOptions,
}

/// Configuration of the handler factory for one client identity.
#[derive(Clone, Debug)]
pub struct CommitEventServiceConfig {
    /// Organization of the submitting client
    pub msp_id: MspId,
    /// Preset used when the caller does not name one
    pub default_strategy: EventStrategy,
    /// Options used when the caller passes none
    pub default_options: EventHandlerOptions,
}

impl CommitEventServiceConfig {
    pub fn new(msp_id: MspId) -> Self {
        Self {
            msp_id,
            default_strategy: EventStrategy::default(),
            default_options: EventHandlerOptions::default(),
        }
    }
}
