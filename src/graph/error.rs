use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryAction;

/// Errors raised by Microsoft Graph calls.
///
/// `retry_action()` separates throttling and transient server failures from
/// permanent ones so metadata requests can back off and try again.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Access token rejected by Graph API (HTTP 401); sign in again")]
    Unauthorized,

    #[error("Graph API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("No download URL returned for {0}")]
    NoDownloadUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid Graph URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl GraphError {
    /// Classify this error for the retry loop.
    ///
    /// Graph signals throttling with 429 (and sometimes 503) plus a
    /// `Retry-After` header; when present, that delay wins over backoff.
    pub fn retry_action(&self) -> RetryAction {
        match self {
            GraphError::Api {
                status,
                retry_after,
                ..
            } if *status == 429 || *status >= 500 => match retry_after {
                Some(delay) => RetryAction::RetryAfter(*delay),
                None => RetryAction::Retry,
            },
            GraphError::Http(e) if e.is_connect() || e.is_timeout() => RetryAction::Retry,
            _ => RetryAction::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, retry_after: Option<Duration>) -> GraphError {
        GraphError::Api {
            status,
            message: "x".into(),
            retry_after,
        }
    }

    #[test]
    fn test_throttled_uses_retry_after() {
        let e = api(429, Some(Duration::from_secs(7)));
        assert_eq!(
            e.retry_action(),
            RetryAction::RetryAfter(Duration::from_secs(7))
        );
    }

    #[test]
    fn test_server_error_retryable() {
        assert_eq!(api(503, None).retry_action(), RetryAction::Retry);
        assert_eq!(api(500, None).retry_action(), RetryAction::Retry);
    }

    #[test]
    fn test_client_errors_abort() {
        assert_eq!(api(404, None).retry_action(), RetryAction::Abort);
        assert_eq!(api(403, None).retry_action(), RetryAction::Abort);
        assert_eq!(GraphError::Unauthorized.retry_action(), RetryAction::Abort);
        assert_eq!(
            GraphError::NoDownloadUrl("a.flac".into()).retry_action(),
            RetryAction::Abort
        );
    }
}
