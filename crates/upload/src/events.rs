//! Lifecycle events emitted by the upload engine.
//!
//! The serialized `event` tags are the public contract with UI layers
//! and must not change.

use serde::{Deserialize, Serialize};

/// Payload progress within the current chunk send.
///
/// `loaded` counts file bytes only (envelope bytes excluded) and is
/// non-decreasing within a single chunk; `start_byte` resets it between
/// chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSample {
    pub start_byte: i64,
    pub loaded: i64,
    pub total: i64,
    pub file: String,
}

/// Events delivered to upload subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum UploadEvent {
    /// Terminal success.
    #[serde(rename = "upload.complete")]
    Complete,

    /// The server acknowledged a chunk of `bytes` payload bytes.
    #[serde(rename = "upload.chunkSent")]
    ChunkSent { bytes: i64 },

    #[serde(rename = "upload.progress")]
    Progress(ProgressSample),

    /// A chunk send failed; the upload can be resumed.
    #[serde(rename = "upload.error")]
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identifier: Option<String>,
    },

    /// The ticket request failed; the upload must be restarted, not
    /// resumed.
    #[serde(rename = "upload.errorStarting")]
    ErrorStarting {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identifier: Option<String>,
    },
}

impl UploadEvent {
    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            UploadEvent::Complete => "upload.complete",
            UploadEvent::ChunkSent { .. } => "upload.chunkSent",
            UploadEvent::Progress(_) => "upload.progress",
            UploadEvent::Error { .. } => "upload.error",
            UploadEvent::ErrorStarting { .. } => "upload.errorStarting",
        }
    }
}
