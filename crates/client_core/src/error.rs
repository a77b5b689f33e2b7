use thiserror::Error;

use crate::session::SessionId;

/// Prefix of every system entry that reports a failure.
pub const ERROR_MARKER: &str = "❌ Error:";

const TRANSPORT_FALLBACK: &str = "could not reach the audit service";
const TRANSPORT_HINT: &str = "check that it is running and try again";

/// Synchronous rejections from upload staging. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StagingError {
    #[error("'{name}' is not a CSV or PDF file")]
    InvalidFileType { name: String },
    #[error("'{name}' is {size_bytes} bytes, over the {limit_bytes} byte upload limit")]
    FileTooLarge {
        name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },
}

/// Failure reported by an [`AuditTransport`](crate::transport::AuditTransport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response was obtained at all.
    #[error("transport failure: {0}")]
    Transport(String),
    /// A staged document could not be read when the request was built.
    #[error("cannot read '{path}': {reason}")]
    Unreadable { path: String, reason: String },
    /// A success status arrived with a body that could not be decoded.
    #[error("invalid response body: {0}")]
    InvalidResponse(String),
    /// A response arrived with a non-success status.
    #[error("backend returned status {status}")]
    Backend { status: u16, detail: Option<String> },
}

impl TransportError {
    pub fn transport(reason: impl std::fmt::Display) -> Self {
        Self::Transport(reason.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error("cannot read '{path}': {reason}")]
    FileUnavailable { path: String, reason: String },
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("invalid response from the audit service: {0}")]
    InvalidResponse(String),
    #[error("backend error {status}")]
    BackendError { status: u16, detail: Option<String> },
    #[error("audit session {session_id} expired or is unknown to the backend")]
    SessionExpired {
        session_id: SessionId,
        detail: Option<String>,
    },
}

impl ClientError {
    /// Human-readable detail shown in the log. Falls back to a generic
    /// description when the backend supplied nothing usable.
    pub fn user_detail(&self) -> String {
        match self {
            Self::Staging(err) => err.to_string(),
            Self::FileUnavailable { .. } => self.to_string(),
            Self::TransportFailure(reason) => {
                format!("{TRANSPORT_FALLBACK} ({reason}); {TRANSPORT_HINT}")
            }
            Self::InvalidResponse(reason) => {
                format!("the audit service sent a reply that could not be read ({reason})")
            }
            Self::BackendError { status, detail } => detail.clone().unwrap_or_else(|| {
                format!("{TRANSPORT_FALLBACK} (HTTP {status}); {TRANSPORT_HINT}")
            }),
            Self::SessionExpired { detail, .. } => {
                let detail = detail
                    .clone()
                    .unwrap_or_else(|| "the audit session has expired".to_string());
                format!("{detail}. Your next message will start a new audit.")
            }
        }
    }

    /// The system entry appended to the log for this failure.
    pub fn log_line(&self) -> String {
        format!("{ERROR_MARKER} {}", self.user_detail())
    }
}
