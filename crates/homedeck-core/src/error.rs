//! Plugin error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Plugin error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Host Connection Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Malformed host frame: {message}")]
    Parse { message: String },

    #[error("Host transport error: {message}")]
    Transport { message: String },

    #[error("Host connection closed")]
    ConnectionClosed,

    #[error("Invalid launch arguments: {message}")]
    LaunchArgs { message: String },

    // ─────────────────────────────────────────────────────────────
    // Cloud API Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Status Code: {status}, Body: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Device does not expose an on/off capability: {device_id}")]
    UnsupportedDevice { device_id: String },

    // ─────────────────────────────────────────────────────────────
    // Local Validation Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No API token configured")]
    MissingCredential,

    #[error("No scenario or device selected")]
    MissingTarget,

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn launch_args(message: impl Into<String>) -> Self {
        Self::LaunchArgs {
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn unsupported_device(device_id: impl Into<String>) -> Self {
        Self::UnsupportedDevice {
            device_id: device_id.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error should terminate the plugin process.
    ///
    /// The host supervises the plugin and restarts it, so a lost connection
    /// is fatal rather than retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. } | Error::ConnectionClosed | Error::LaunchArgs { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_carries_status_and_body() {
        let err = Error::http_status(401, "{\"message\":\"unauthorized\"}");
        assert_eq!(
            err.to_string(),
            "Status Code: 401, Body: {\"message\":\"unauthorized\"}"
        );
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::ConnectionClosed.is_fatal());
        assert!(Error::transport("reset by peer").is_fatal());
        assert!(Error::launch_args("missing -port").is_fatal());
        assert!(!Error::network("dns").is_fatal());
        assert!(!Error::parse("not json").is_fatal());
    }

    #[test]
    fn test_unsupported_device_mentions_id() {
        let err = Error::unsupported_device("lamp-1");
        assert!(err.to_string().contains("lamp-1"));
    }

    #[test]
    fn test_result_ext_preserves_error() {
        let res: std::result::Result<(), Error> = Err(Error::MissingTarget);
        let err = res.context("press").unwrap_err();
        assert!(matches!(err, Error::MissingTarget));
    }

    #[test]
    fn test_result_ext_converts_foreign_errors() {
        let res: std::result::Result<serde_json::Value, serde_json::Error> =
            serde_json::from_str("{");
        let err = res
            .with_context(|| format!("decode frame {}", 1))
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(!err.is_fatal());
    }
}
