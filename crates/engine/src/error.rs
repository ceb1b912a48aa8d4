use std::time::Duration;

use shelfwise_store::StoreError;
use thiserror::Error;

/// Retry hint for transient upstream failures.
const SHORT_RETRY: Duration = Duration::from_secs(1);

/// Retry hint for upstream failures unlikely to clear quickly.
const LONG_RETRY: Duration = Duration::from_secs(30);

/// Coarse classification reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UpstreamUnavailable,
    InvalidRequest,
    Cancelled,
}

/// Conditions that abort a recommendation request.
///
/// Model failures and event store failures never appear here; they
/// degrade the affected signal instead.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(#[source] StoreError),

    #[error("request cancelled")]
    Cancelled,
}

impl RecommendError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            Self::CatalogUnavailable(_) => ErrorCategory::UpstreamUnavailable,
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// How long to wait before retrying; only set for upstream failures.
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            Self::CatalogUnavailable(e) if e.is_retryable() => Some(SHORT_RETRY),
            Self::CatalogUnavailable(_) => Some(LONG_RETRY),
            Self::InvalidRequest(_) | Self::Cancelled => None,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self.category() {
            ErrorCategory::InvalidRequest => {
                "The request could not be processed. Check inputs and try again."
            }
            ErrorCategory::UpstreamUnavailable => {
                "Recommendations are temporarily unavailable. Please retry shortly."
            }
            ErrorCategory::Cancelled => "The request was cancelled.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_and_hints() {
        let invalid = RecommendError::InvalidRequest("limit must be positive".into());
        assert_eq!(invalid.category(), ErrorCategory::InvalidRequest);
        assert_eq!(invalid.retry_hint(), None);

        let transient = RecommendError::CatalogUnavailable(StoreError::Unavailable);
        assert_eq!(transient.category(), ErrorCategory::UpstreamUnavailable);
        assert_eq!(transient.retry_hint(), Some(SHORT_RETRY));

        let broken = RecommendError::CatalogUnavailable(StoreError::Parse("bad row".into()));
        assert_eq!(broken.retry_hint(), Some(LONG_RETRY));

        assert_eq!(RecommendError::Cancelled.category(), ErrorCategory::Cancelled);
        assert_eq!(RecommendError::Cancelled.retry_hint(), None);
    }

    #[test]
    fn test_display() {
        let err = RecommendError::CatalogUnavailable(StoreError::Connection("refused".into()));
        assert_eq!(err.to_string(), "catalog unavailable: Connection failed: refused");
    }
}
