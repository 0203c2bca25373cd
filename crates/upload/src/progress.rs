//! Progress math for chunk requests.
//!
//! Transports report raw byte counters for the whole request body. The
//! multipart envelope (offset and ticket fields, part boundaries) rides
//! along in the same request but must not count as file progress.

use tokio::sync::mpsc;

use crate::events::{ProgressSample, UploadEvent};

/// Converts raw request-body counters into payload-only progress.
///
/// The envelope fields are sent before the payload slice, so once the
/// remaining unsent bytes are all payload the correction
/// `chunk_len + loaded - total_body` is exact. Returns `None` for the
/// early transport events where it would go negative.
pub fn payload_loaded(chunk_len: i64, loaded: i64, total_body: i64) -> Option<i64> {
    let loaded = chunk_len + loaded - total_body;
    (loaded >= 0).then_some(loaded)
}

/// Per-chunk translator from transport counters to progress events.
///
/// Cloneable so a transport can hand it to a streaming body. Samples are
/// delivered with `try_send`; dropping one beats stalling the transport.
#[derive(Clone)]
pub struct ProgressReporter {
    start_byte: i64,
    chunk_len: i64,
    total: i64,
    file: String,
    events: mpsc::Sender<UploadEvent>,
}

impl ProgressReporter {
    pub fn new(
        start_byte: i64,
        chunk_len: i64,
        total: i64,
        file: String,
        events: mpsc::Sender<UploadEvent>,
    ) -> Self {
        Self {
            start_byte,
            chunk_len,
            total,
            file,
            events,
        }
    }

    /// Payload length of the chunk this reporter covers.
    pub fn chunk_len(&self) -> i64 {
        self.chunk_len
    }

    /// Raw transport progress for the current request.
    ///
    /// `total_body` is `None` when the transport cannot compute the body
    /// length; no sample is emitted then — no progress event is better
    /// than a wrong one.
    pub fn transport_progress(&self, loaded: i64, total_body: Option<i64>) {
        let Some(total_body) = total_body else {
            return;
        };
        let Some(loaded) = payload_loaded(self.chunk_len, loaded, total_body) else {
            return;
        };
        let _ = self.events.try_send(UploadEvent::Progress(ProgressSample {
            start_byte: self.start_byte,
            loaded,
            total: self.total,
            file: self.file.clone(),
        }));
    }
}
