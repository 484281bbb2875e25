//! Error types for the Globus API client.
//!
//! This module provides a single error type covering transport failures,
//! API error responses, token grant problems and pagination misuse.

use serde_json::Value;
use thiserror::Error;

/// A specialized `Result` type for Globus SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all Globus SDK operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem access failed (token storage)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API returned an error response
    #[error("API error: status={status}, code={code:?}, message={message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Optional error code from the API
        code: Option<String>,
        /// Human-readable error message
        message: String,
        /// Raw response body for debugging
        body: Value,
    },

    /// The server rejected the request's credentials and the authorizer
    /// could not recover.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Message extracted from the 401 response body
        message: String,
    },

    /// Rate limited by the API
    #[error("Rate limited; retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Number of seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested number of results exceeds what the API will page through.
    #[error("Paginating {requested} results would overrun the API limit of {max_total}")]
    PaginationOverrun {
        /// Number of results the caller asked for
        requested: u64,
        /// Server-side ceiling for this paging strategy
        max_total: u64,
    },

    /// An unknown paging strategy was configured.
    #[error("Invalid paging strategy: {0:?}")]
    InvalidPagingStrategy(String),

    /// A token grant response could not be turned into a usable access token.
    #[error("Token grant error: {0}")]
    TokenGrant(String),

    /// Invalid input provided to a function
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` if this error is potentially transient and the
    /// operation could be retried.
    ///
    /// # Example
    ///
    /// ```
    /// use globus_sdk::Error;
    ///
    /// fn handle_error(err: Error) {
    ///     if err.is_retryable() {
    ///         println!("Retrying operation...");
    ///     }
    /// }
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is an authentication-related error.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::Unauthorized { .. } | Error::TokenGrant(_) => true,
            Error::Api { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// Returns `true` if this error indicates a client-side issue
    /// (invalid input, bad request, misconfigured pagination).
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status >= 400 && *status < 500,
            Error::InvalidInput(_)
            | Error::Config(_)
            | Error::PaginationOverrun { .. }
            | Error::InvalidPagingStrategy(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this error indicates a server-side issue.
    pub fn is_server_error(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Create an API error from a response body.
    ///
    /// Globus services report errors in a few shapes: a flat
    /// `{"code", "message"}` object, a JSON:API style `errors` array, or the
    /// OAuth2 `{"error", "error_description"}` pair from the token endpoint.
    pub(crate) fn from_api_response(status: u16, body: Value) -> Self {
        let (code, message) = error_fields(&body);

        Error::Api {
            status,
            code,
            message: message.unwrap_or_else(|| "Unknown API error".to_string()),
            body,
        }
    }
}

/// Extract `(code, message)` from a Globus error body.
pub(crate) fn error_fields(body: &Value) -> (Option<String>, Option<String>) {
    let text = |v: &Value, key: &str| v.get(key).and_then(|s| s.as_str()).map(String::from);

    if let Some(first) = body
        .get("errors")
        .and_then(|e| e.as_array())
        .and_then(|errors| errors.first())
    {
        let code = text(first, "code");
        let message = text(first, "detail").or_else(|| text(first, "message"));
        if code.is_some() || message.is_some() {
            return (code, message);
        }
    }

    let code = text(body, "code").or_else(|| text(body, "error"));
    let message = text(body, "message").or_else(|| text(body, "error_description"));
    (code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        assert!(Error::RateLimited { retry_after_secs: 30 }.is_retryable());
        assert!(Error::from_api_response(503, Value::Null).is_retryable());
        assert!(!Error::InvalidInput("bad".into()).is_retryable());
        assert!(!Error::PaginationOverrun { requested: 2, max_total: 1 }.is_retryable());
    }

    #[test]
    fn test_error_auth() {
        assert!(Error::Unauthorized { message: "no".into() }.is_auth_error());
        assert!(Error::TokenGrant("ambiguous".into()).is_auth_error());
        assert!(Error::from_api_response(403, Value::Null).is_auth_error());
        assert!(!Error::NotFound("x".into()).is_auth_error());
    }

    #[test]
    fn test_pagination_errors_are_client_errors() {
        assert!(Error::PaginationOverrun { requested: 1200, max_total: 1000 }.is_client_error());
        assert!(Error::InvalidPagingStrategy("pages".into()).is_client_error());
        assert!(!Error::from_api_response(502, Value::Null).is_client_error());
    }

    #[test]
    fn test_from_flat_error_body() {
        let body = serde_json::json!({
            "code": "ClientError.NotFound",
            "message": "Endpoint not found"
        });

        match Error::from_api_response(404, body) {
            Error::Api { status, code, message, .. } => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("ClientError.NotFound"));
                assert_eq!(message, "Endpoint not found");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_errors_array_body() {
        let body = serde_json::json!({
            "errors": [{"code": "INVALID_PARAMETER", "detail": "limit must be positive"}]
        });

        let (code, message) = error_fields(&body);
        assert_eq!(code.as_deref(), Some("INVALID_PARAMETER"));
        assert_eq!(message.as_deref(), Some("limit must be positive"));
    }

    #[test]
    fn test_from_oauth_error_body() {
        let body = serde_json::json!({
            "error": "invalid_grant",
            "error_description": "refresh token revoked"
        });

        let (code, message) = error_fields(&body);
        assert_eq!(code.as_deref(), Some("invalid_grant"));
        assert_eq!(message.as_deref(), Some("refresh token revoked"));
    }
}
