//! Error types for mm-exchange.

use thiserror::Error;

/// Checklist appended to authentication failures. Stale nonces from a
/// skewed clock and copy-paste-corrupted credentials produce the same
/// opaque 401, so the error itself has to carry the triage steps.
pub const AUTH_GUIDANCE: &str = "Possible causes:\n\
  1. API key or secret is incorrect — double-check them on the exchange under Account > API Keys.\n\
  2. Copy-paste error — make sure there are no extra spaces, quotes, or invisible characters.\n\
  3. The API key does not have trading permissions enabled on the exchange.\n\
  4. The API key may have been revoked or expired.\n\
  5. Your system clock may be significantly out of sync (the exchange rejects stale nonces).";

/// Exchange client error types.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Connection-level failure (DNS, TLS, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP 401/403, decorated with actionable diagnostics.
    #[error("Authentication failed ({status}): {body}\n\n{advice}")]
    Auth {
        status: u16,
        body: String,
        advice: &'static str,
    },

    /// Non-2xx response other than an auth failure.
    #[error("API error {status}: {message}")]
    Http { status: u16, message: String },

    /// 2xx response whose JSON body carries an `error` key.
    #[error("Exchange error: {message}")]
    Api { message: String },

    /// Every candidate endpoint for an operation returned an error.
    #[error("All {op} endpoint variants failed: {errors}")]
    AllVariantsFailed { op: &'static str, errors: String },

    /// Response body did not match the expected shape.
    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ExchangeError {
    /// Build an auth error with the diagnostic checklist attached.
    pub fn auth(status: u16, body: impl Into<String>) -> Self {
        Self::Auth {
            status,
            body: body.into(),
            advice: AUTH_GUIDANCE,
        }
    }

    /// Whether this error is an authentication failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

/// Result type alias for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_carries_guidance() {
        let err = ExchangeError::auth(401, "unauthorized");
        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(text.contains("clock"));
        assert!(text.contains("trading permissions"));
        assert!(err.is_auth());
    }

    #[test]
    fn test_api_error_distinct_from_http() {
        let api = ExchangeError::Api {
            message: "insufficient funds".into(),
        };
        assert!(!api.is_auth());
        assert!(api.to_string().contains("insufficient funds"));
    }
}
