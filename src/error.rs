//! Error type surfaced by the throttle middleware.

use std::fmt;
use std::time::Duration;

/// Error returned by [`ThrottleService`](crate::middleware::ThrottleService).
///
/// Generic over the wrapped service's error so callers keep their own error
/// type intact underneath the throttle.
#[derive(Debug, Clone)]
pub enum ThrottleError<E> {
    /// The request was over its limit. `retry_after` is absent only when a
    /// store outage was denied under fail-closed.
    RateLimited { retry_after: Option<Duration> },
    /// The request carried no rate-limit identifier. Retrying the same
    /// request will not help.
    MissingIdentifier,
    /// The wrapped service failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for ThrottleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited { retry_after: Some(wait) } => {
                write!(f, "rate limited, retry after {:?}", wait)
            }
            Self::RateLimited { retry_after: None } => write!(f, "rate limited"),
            Self::MissingIdentifier => write!(f, "missing rate-limit identifier"),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ThrottleError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> ThrottleError<E> {
    /// Check if this error is a throttling denial.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Check if this error is a missing-identifier rejection.
    pub fn is_missing_identifier(&self) -> bool {
        matches!(self, Self::MissingIdentifier)
    }

    /// Retry guidance for a denial, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Get the inner error if this is an `Inner` variant.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn rate_limited_display_includes_retry_hint() {
        let err: ThrottleError<io::Error> =
            ThrottleError::RateLimited { retry_after: Some(Duration::from_secs(3)) };
        let msg = format!("{}", err);
        assert!(msg.contains("rate limited"));
        assert!(msg.contains("3"));
    }

    #[test]
    fn fail_closed_denial_displays_without_retry_hint() {
        let err: ThrottleError<io::Error> = ThrottleError::RateLimited { retry_after: None };
        assert_eq!(format!("{}", err), "rate limited");
    }

    #[test]
    fn missing_identifier_display() {
        let err: ThrottleError<io::Error> = ThrottleError::MissingIdentifier;
        assert!(format!("{}", err).contains("identifier"));
    }

    #[test]
    fn predicates_and_accessors() {
        let limited: ThrottleError<io::Error> =
            ThrottleError::RateLimited { retry_after: Some(Duration::from_secs(1)) };
        assert!(limited.is_rate_limited());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(1)));
        assert!(!limited.is_missing_identifier());

        let missing: ThrottleError<io::Error> = ThrottleError::MissingIdentifier;
        assert!(missing.is_missing_identifier());
        assert_eq!(missing.retry_after(), None);
    }

    #[test]
    fn inner_error_round_trips() {
        let err = ThrottleError::Inner(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(err.as_inner().unwrap().to_string(), "boom");
        assert_eq!(err.into_inner().unwrap().to_string(), "boom");
    }

    #[test]
    fn source_points_at_the_inner_error() {
        use std::error::Error;
        let err = ThrottleError::Inner(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(err.source().is_some());
        let limited: ThrottleError<io::Error> = ThrottleError::RateLimited { retry_after: None };
        assert!(limited.source().is_none());
    }
}
