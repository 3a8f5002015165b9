//! Result and error types for the storefront behaviors.

use thiserror::Error;

/// Result type for storefront operations
pub type StorefrontResult<T> = Result<T, StorefrontError>;

/// Errors that can occur while wiring or running page behaviors
///
/// None of these is fatal to the page: components log them and degrade the
/// affected feature to a no-op.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration rejected
    #[error("Invalid configuration: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Selector could not be parsed
    #[error("Invalid selector `{selector}`: {message}")]
    Selector {
        /// Selector source text
        selector: String,
        /// Error message
        message: String,
    },

    /// Root margin could not be parsed
    #[error("Invalid root margin `{margin}`: {message}")]
    RootMargin {
        /// Margin source text
        margin: String,
        /// Error message
        message: String,
    },

    /// Media playback was refused by the host
    #[error("Media playback prevented: {message}")]
    PlaybackPrevented {
        /// Error message
        message: String,
    },

    /// Simulated cart request failed
    #[error("Cart request failed: {message}")]
    CartRequest {
        /// Error message
        message: String,
    },

    /// An analytics sink rejected an event
    #[error("Analytics sink `{sink}` failed: {message}")]
    Sink {
        /// Sink name
        sink: String,
        /// Error message
        message: String,
    },

    /// Service worker registration failed
    #[error("Service worker registration failed: {message}")]
    ServiceWorker {
        /// Error message
        message: String,
    },

    /// Logging subscriber could not be installed
    #[error("Logging setup failed: {message}")]
    Logging {
        /// Error message
        message: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl StorefrontError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a cart request error
    #[must_use]
    pub fn cart_request(message: impl Into<String>) -> Self {
        Self::CartRequest {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorefrontError::Selector {
            selector: ".a[".to_string(),
            message: "unterminated attribute".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid selector `.a[`: unterminated attribute"
        );

        let err = StorefrontError::cart_request("timeout");
        assert_eq!(err.to_string(), "Cart request failed: timeout");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: StorefrontError = parse.unwrap_err().into();
        assert!(matches!(err, StorefrontError::Json(_)));
    }
}
