//! Upload error types.

use portage_protocol::ServerError;

/// Errors produced by the upload engine and its transports.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// No response was received — a transport-level failure with no
    /// server identifier available.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server answered with a structured rejection.
    #[error("{message}")]
    Rejected {
        message: String,
        identifier: Option<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cancelled")]
    Cancelled,

    #[error("no interrupted upload to resume")]
    NothingToResume,

    #[error("invalid session transition: {op} while {state}")]
    InvalidTransition {
        state: &'static str,
        op: &'static str,
    },
}

impl UploadError {
    /// Human-readable message carried in `upload.error` and
    /// `upload.errorStarting` events. The wording for connection
    /// failures is kept from the legacy client.
    pub fn user_message(&self) -> String {
        match self {
            UploadError::Connection(_) => {
                "Error: Connection to the server interrupted.".to_string()
            }
            UploadError::Rejected { message, .. } => format!("Error: {message}"),
            other => format!("Error: {other}"),
        }
    }

    /// Machine-readable identifier reported by the server, if any.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            UploadError::Rejected { identifier, .. } => identifier.as_deref(),
            _ => None,
        }
    }
}

impl From<ServerError> for UploadError {
    fn from(err: ServerError) -> Self {
        UploadError::Rejected {
            message: err.message,
            identifier: err.identifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_user_message() {
        let err = UploadError::Connection("dns failure".into());
        assert_eq!(err.user_message(), "Error: Connection to the server interrupted.");
        assert!(err.identifier().is_none());
    }

    #[test]
    fn rejection_carries_identifier() {
        let err = UploadError::Rejected {
            message: "Quota exceeded.".into(),
            identifier: Some("QuotaExceeded".into()),
        };
        assert_eq!(err.user_message(), "Error: Quota exceeded.");
        assert_eq!(err.identifier(), Some("QuotaExceeded"));
    }

    #[test]
    fn server_error_converts_to_rejection() {
        let body = ServerError {
            message: "Invalid offset.".into(),
            identifier: None,
        };
        let err = UploadError::from(body);
        assert!(matches!(err, UploadError::Rejected { .. }));
    }
}
