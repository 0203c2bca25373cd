//! Server transport trait.
//!
//! `ServerTransport` is implemented by `portage-client` on top of the
//! actual REST surface. Using a trait keeps the engine decoupled from
//! HTTP and testable with scripted mocks.

use std::future::Future;
use std::pin::Pin;

use portage_protocol::{TicketRequest, UploadTicket};

use crate::error::UploadError;
use crate::progress::ProgressReporter;

/// One chunk of payload tied to an upload ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkUpload {
    pub upload_id: String,
    /// Starting byte offset of `data` within the full payload.
    pub offset: i64,
    pub data: Vec<u8>,
}

/// Boxed future returned by transport methods.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, UploadError>> + Send + 'a>>;

/// Abstract connection to the upload REST surface.
pub trait ServerTransport: Send + Sync {
    /// Requests an upload ticket (create-file or update-contents).
    fn request_ticket<'a>(&'a self, req: &'a TicketRequest) -> TransportFuture<'a, UploadTicket>;

    /// Sends one chunk and waits for the server's acknowledgment.
    ///
    /// Implementations report raw body progress through `progress` while
    /// the request streams out.
    fn send_chunk<'a>(
        &'a self,
        chunk: &'a ChunkUpload,
        progress: &'a ProgressReporter,
    ) -> TransportFuture<'a, ()>;

    /// Queries the authoritative last-accepted offset for a ticket.
    fn query_offset<'a>(&'a self, upload_id: &'a str) -> TransportFuture<'a, i64>;

    /// Asks the server to release a ticket. Best-effort; callers ignore
    /// the result beyond logging.
    fn release_upload<'a>(&'a self, upload_id: &'a str) -> TransportFuture<'a, ()>;
}
