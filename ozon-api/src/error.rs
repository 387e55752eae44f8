//! Client error types and domain error codes

use thiserror::Error;

/// Marketplace error codes that mean "the work is already done" and must be
/// treated as success by callers.
pub const POSTING_ALREADY_SHIPPED: &str = "POSTING_ALREADY_SHIPPED";
pub const POSTING_ALREADY_CANCELLED: &str = "POSTING_ALREADY_CANCELLED";
pub const EXEMPLAR_INFO_NOT_FILLED: &str = "EXEMPLAR_INFO_NOT_FILLED_COMPLETELY";
pub const HAS_INCORRECT_STATUS: &str = "HAS_INCORRECT_STATUS";
pub const POSTING_NUMBERS_INCORRECT_FOR_COMPANY: &str = "POSTING_NUMBERS_IS_INCORRECT_FOR_COMPANY";
pub const NO_POSTINGS_FOR_BATCH_DOWNLOAD: &str = "NO_POSTINGS_FOR_BATCH_DOWNLOAD";

/// Client error type
#[derive(Debug, Error)]
pub enum OzonError {
    /// HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Marketplace throttled the request (429); retry the whole message
    /// after ~60 seconds
    #[error("Rate limited by marketplace")]
    RateLimited,

    /// Structured marketplace error that is neither benign nor retry-as-is
    #[error("Marketplace error {code}: {message}")]
    Api { code: i64, message: String },

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller violated the request contract (programmer error)
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Result type for client operations
pub type OzonResult<T> = Result<T, OzonError>;

/// Wrapper outcome: a typed success, or a benign marketplace response that
/// callers treat as success-equivalent (nothing new to persist).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Success(T),
    Benign,
}

impl<T> Outcome<T> {
    pub fn is_benign(&self) -> bool {
        matches!(self, Outcome::Benign)
    }
}

/// Error body returned by the Seller API on non-200 responses
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl ApiErrorBody {
    pub fn parse(body: &serde_json::Value) -> Self {
        serde_json::from_value(body.clone()).unwrap_or(ApiErrorBody {
            code: 0,
            message: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_parse() {
        let body = serde_json::json!({"code": 7, "message": "POSTING_ALREADY_SHIPPED"});
        let parsed = ApiErrorBody::parse(&body);
        assert_eq!(parsed.code, 7);
        assert_eq!(parsed.message, POSTING_ALREADY_SHIPPED);

        // Missing fields fall back to defaults
        let parsed = ApiErrorBody::parse(&serde_json::json!({}));
        assert_eq!(parsed.code, 0);
        assert!(parsed.message.is_empty());
    }
}
