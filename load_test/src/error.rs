//! Error types for the load generator.
//!
//! Every variant except `Unreachable` and `InvalidConfig` is recovered locally
//! into a failed `RequestOutcome`; the failure reason recorded in the stats is
//! the `Display` text of the error.

use thiserror::Error;

/// Errors produced while driving a virtual user or the harness itself.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Connection failure, timeout or any other transport-level error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Status code outside the accepted set for the step
    #[error("{context}: {status}")]
    UnexpectedStatus { context: &'static str, status: u16 },

    /// `Location` header matched none of the known paths
    #[error("unexpected redirect target: {0}")]
    UnexpectedRedirect(String),

    /// Seat page bounced the user back instead of rendering
    #[error("access denied, redirected to {0}")]
    AccessDenied(String),

    /// Malformed JSON body
    #[error("payload parse error: {0}")]
    PayloadParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Target host could not be reached at startup
    #[error("Target {host} unreachable: {source}")]
    Unreachable {
        host: String,
        #[source]
        source: reqwest::Error,
    },
}

impl HarnessError {
    pub fn unexpected_status(context: &'static str, status: u16) -> Self {
        HarnessError::UnexpectedStatus { context, status }
    }

    /// True for transport failures (no HTTP response was received)
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            HarnessError::Network(_) | HarnessError::Unreachable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_status_reason_text() {
        let err = HarnessError::unexpected_status("non-redirect status", 200);
        assert_eq!(err.to_string(), "non-redirect status: 200");
        assert!(!err.is_network());
    }

    #[test]
    fn test_parse_error_converts() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: HarnessError = source.into();
        assert!(matches!(err, HarnessError::PayloadParse(_)));
        assert!(err.to_string().starts_with("payload parse error"));
    }
}
