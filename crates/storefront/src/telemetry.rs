//! Logging subscriber setup for native hosts.
//!
//! Page behaviors emit `tracing` events; which of them are shown, and how, is
//! decided here. Wasm hosts install their own subscriber instead.

use crate::result::{StorefrontError, StorefrontResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Build the filter, preferring `RUST_LOG` when set
pub fn env_filter(default_directives: &str) -> StorefrontResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_directives).map_err(|e| StorefrontError::Logging {
        message: e.to_string(),
    })
}

/// Install the global subscriber
///
/// Fails if `default_directives` is malformed or a subscriber is already set.
pub fn init_logging(default_directives: &str, format: LogFormat) -> StorefrontResult<()> {
    let filter = env_filter(default_directives)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| StorefrontError::Logging {
        message: e.to_string(),
    })
}
