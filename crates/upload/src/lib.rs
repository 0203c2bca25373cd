//! Resumable chunked upload engine.
//!
//! This crate implements the **client-side state machine** for uploading
//! a large payload to a Portage server in bounded-size chunks. It is a
//! library crate with no HTTP dependency — `portage-client` provides a
//! `ServerTransport` implementation that bridges to the actual REST
//! surface, and tests use scripted mocks.
//!
//! # Pipeline
//!
//! 1. **Ticket** — request an upload ticket for the target file
//! 2. **Delegate** — hand off to a registered behavior handler if the
//!    ticket names one
//! 3. **Chunks** — otherwise send the payload in strictly sequential
//!    chunks, emitting progress along the way
//! 4. **Recover** — on failure, freeze the session; `resume_upload`
//!    re-queries the server's authoritative offset and continues
//!
//! Callers subscribe to lifecycle events via [`UploadEngine::take_events`]
//! before starting an upload.

pub mod engine;
pub mod error;
pub mod events;
pub mod handler;
pub mod progress;
pub mod session;
pub mod source;
pub mod transport;

// Re-export primary types for convenience.
pub use engine::UploadEngine;
pub use error::UploadError;
pub use events::{ProgressSample, UploadEvent};
pub use handler::{BehaviorHandler, BehaviorTag, HandlerContext, HandlerFactory, HandlerRegistry};
pub use progress::ProgressReporter;
pub use session::{SessionState, TransferSession};
pub use source::{ByteSource, FileSource, MemorySource, chunk_window};
pub use transport::{ChunkUpload, ServerTransport, TransportFuture};

/// Default maximum bytes sent per chunk request: 64 MiB.
///
/// Larger chunks amortize per-request envelope overhead; smaller chunks
/// lose less work when a send fails and the upload is resumed from the
/// last accepted offset.
pub const DEFAULT_CHUNK_SIZE: i64 = 64 * 1024 * 1024;
