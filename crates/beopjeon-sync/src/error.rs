use std::time::Duration;

use thiserror::Error;

/// Why a fetch failed. Only `Timeout`, `RateLimited` and
/// `TransientNetworkError` are worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("rate limited by remote{}", retry_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },
    #[error("transient network error: {0}")]
    TransientNetworkError(String),
    #[error("server returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("I/O error: {0}")]
    Io(String),
}

fn retry_suffix(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|d| format!(" (retry after {}s)", d.as_secs()))
        .unwrap_or_default()
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::RateLimited { .. } | Self::TransientNetworkError(_)
        )
    }

    /// Delay requested by the remote, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Short machine-readable name, used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Timeout(_) => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::TransientNetworkError(_) => "transient_network_error",
            Self::Rejected { .. } => "rejected",
            Self::InvalidTarget(_) => "invalid_target",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Io(_) => "io",
        }
    }

    pub(crate) fn from_io(err: std::io::Error, what: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(what.to_string()),
            std::io::ErrorKind::TimedOut => Self::Timeout(what.to_string()),
            _ => Self::Io(format!("{what}: {err}")),
        }
    }
}

/// Source configuration problems, raised while building adapters.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("duplicate source id: {0}")]
    DuplicateId(String),
    #[error("source {id}: {message}")]
    Invalid { id: String, message: String },
    #[cfg(feature = "http")]
    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(FetchError::Timeout("x".into()).is_transient());
        assert!(FetchError::RateLimited { retry_after: None }.is_transient());
        assert!(FetchError::TransientNetworkError("reset".into()).is_transient());
        assert!(!FetchError::NotFound("x".into()).is_transient());
        assert!(!FetchError::Rejected { status: 403, body: String::new() }.is_transient());
        assert!(!FetchError::Io("disk".into()).is_transient());
    }

    #[test]
    fn rate_limit_message_includes_delay() {
        let err = FetchError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.to_string(), "rate limited by remote (retry after 7s)");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(FetchError::from_io(io, "laws/민법.pdf"), FetchError::NotFound("laws/민법.pdf".into()));
    }
}
