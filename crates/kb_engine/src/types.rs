use chrono::{DateTime, Utc};
use kb_core::fields::{self, Record};
use kb_core::{HistoryRecord, HistorySource, ItemId, Provenance};

/// Message shown when a failed upload carries no backend explanation.
pub const GENERIC_UPLOAD_FAILURE: &str = "Upload failed";

const BACKEND_MESSAGE_KEYS: &[&str] = &["detail", "message", "error"];

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress {
        item_id: ItemId,
        progress: f32,
    },
    Processing {
        item_id: ItemId,
        progress: f32,
    },
    Completed {
        item_id: ItemId,
        chunks: u32,
        uploaded_at: DateTime<Utc>,
        provenance: Provenance,
    },
    Failed {
        item_id: ItemId,
        message: String,
    },
    HistoryLoaded {
        records: Vec<HistoryRecord>,
        source: HistorySource,
    },
}

/// What the backend acknowledged for an accepted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadReceipt {
    pub chunks_created: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// The request never reached the backend.
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("upload rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("upload timed out: {0}")]
    TimedOut(String),
    #[error("invalid upload request: {0}")]
    InvalidRequest(String),
}

impl UploadError {
    /// Text stored on the failed item.
    pub fn item_message(&self) -> String {
        match self {
            UploadError::Rejected { message, .. } => message.clone(),
            UploadError::TimedOut(_) => "Upload timed out".to_string(),
            UploadError::Unreachable(_) | UploadError::InvalidRequest(_) => {
                GENERIC_UPLOAD_FAILURE.to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("request could not be sent: {0}")]
    Transport(String),
    #[error("backend returned status {status}")]
    Backend {
        status: u16,
        message: Option<String>,
    },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Backend-supplied explanation when present, else `default`.
    pub fn user_message(&self, default: &str) -> String {
        match self {
            ApiError::Backend {
                message: Some(message),
                ..
            } => message.clone(),
            ApiError::InvalidInput(message) => message.clone(),
            _ => default.to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start engine runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    Client(#[from] ApiError),
}

/// Extracts the human readable error from a failure body such as `{"detail": "..."}`.
pub(crate) fn backend_message(body: &[u8]) -> Option<String> {
    let record: Record = serde_json::from_slice(body).ok()?;
    fields::first_text(&record, BACKEND_MESSAGE_KEYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_reads_known_fields() {
        assert_eq!(
            backend_message(br#"{"detail":"Something went wrong."}"#).as_deref(),
            Some("Something went wrong.")
        );
        assert_eq!(
            backend_message(br#"{"message":"disk full"}"#).as_deref(),
            Some("disk full")
        );
        // Validation errors carry a list under `detail`; no plain message there.
        assert_eq!(backend_message(br#"{"detail":[{"loc":["body"]}]}"#), None);
        assert_eq!(backend_message(b"<html>502</html>"), None);
    }

    #[test]
    fn user_message_prefers_backend_text() {
        let err = ApiError::Backend {
            status: 500,
            message: Some("boom".into()),
        };
        assert_eq!(err.user_message("Failed to send message"), "boom");

        let err = ApiError::Transport("connection refused".into());
        assert_eq!(err.user_message("Failed to load sessions"), "Failed to load sessions");
        assert!(err.is_transport());
    }
}
