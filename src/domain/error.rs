use std::time::Duration;

use thiserror::Error;

use mediaward_types::FailureKind;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("storage layout field `{field}` is invalid: {reason}")]
    InvalidLayout { field: &'static str, reason: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn invalid_layout(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidLayout {
            field,
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Why a single strategy rejected a single URL.
///
/// Always recovered inside the prober; it only surfaces in logs and metrics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeFailure {
    #[error("network error: {0}")]
    Network(String),
    #[error("cross-origin check rejected: {0}")]
    Cors(String),
    #[error("probe exceeded {0:?}")]
    Timeout(Duration),
    #[error("resource missing or expired (status {status})")]
    NotFoundOrExpired { status: u16 },
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16 },
    #[error("response is not a decodable image: {0}")]
    NotAnImage(String),
    #[error("no strategy confirmed the url")]
    Exhausted,
}

impl ProbeFailure {
    /// Map an HTTP status to a failure, or `None` for 2xx.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            400 | 401 | 403 | 404 | 410 => Some(Self::NotFoundOrExpired { status }),
            _ => Some(Self::UpstreamStatus { status }),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) | Self::UpstreamStatus { .. } => FailureKind::Network,
            Self::Cors(_) => FailureKind::Cors,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::NotFoundOrExpired { .. } | Self::NotAnImage(_) => FailureKind::NotFoundOrExpired,
            Self::Exhausted => FailureKind::Exhausted,
        }
    }
}
