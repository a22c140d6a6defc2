use std::fmt;

use log::warn;

/// Errors surfaced by the API client.
#[derive(Debug)]
pub enum ApiError {
    /// Client misconfigured (unusable base URL or HTTP client). Not retryable.
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// The server answered with an error status, or a `success: false` body.
    Api { status: u16, message: String },
    /// Failed to decode the response body.
    Parse(String),
    /// Token persistence failed while completing an auth operation.
    Storage(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Config(msg) => write!(f, "config error: {msg}"),
            ApiError::Network(msg) => write!(f, "network error: {msg}"),
            ApiError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            ApiError::Parse(msg) => write!(f, "parse error: {msg}"),
            ApiError::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Error reporter: a logging side channel, never control flow. Every error
/// leaving the client passes through here exactly once.
pub(crate) fn report(context: &str, err: &ApiError) {
    warn!("{context}: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_status_and_message() {
        let err = ApiError::Api {
            status: 401,
            message: "token expired".to_string(),
        };
        assert_eq!(err.to_string(), "API error (HTTP 401): token expired");
    }
}
