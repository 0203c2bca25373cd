//! Upload engine: ticket issuance, the sequential chunk loop, resume
//! and abort.

use std::sync::Arc;

use portage_protocol::{CreateFileRequest, TicketRequest, UploadTarget};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::DEFAULT_CHUNK_SIZE;
use crate::error::UploadError;
use crate::events::UploadEvent;
use crate::handler::{
    BehaviorHandler, BehaviorTag, HandlerContext, HandlerFactory, HandlerRegistry,
};
use crate::progress::ProgressReporter;
use crate::session::TransferSession;
use crate::source::{ByteSource, chunk_window};
use crate::transport::{ChunkUpload, ServerTransport};

/// An interrupted chunked upload kept for a later `resume_upload` call.
struct FrozenUpload {
    session: TransferSession,
    source: Box<dyn ByteSource>,
}

/// A delegated upload whose handler is still alive after an error.
struct ActiveHandler {
    handler: Box<dyn BehaviorHandler>,
    events_rx: mpsc::Receiver<UploadEvent>,
    /// Total source size; handler-local progress totals are rewritten
    /// onto it.
    total: i64,
}

/// Orchestrates one upload at a time against a [`ServerTransport`].
///
/// Callers take the event receiver once via [`take_events`](Self::take_events)
/// and subscribe before starting an upload. Chunk sends are strictly
/// sequential; independent engines may run concurrently for different
/// files.
pub struct UploadEngine {
    transport: Arc<dyn ServerTransport>,
    registry: HandlerRegistry,
    chunk_size: i64,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
    frozen: Option<FrozenUpload>,
    delegate: Option<ActiveHandler>,
}

impl UploadEngine {
    /// Creates an engine with the default chunk size.
    pub fn new(transport: Arc<dyn ServerTransport>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            transport,
            registry: HandlerRegistry::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
            frozen: None,
            delegate: None,
        }
    }

    /// Overrides the maximum bytes sent per chunk request.
    pub fn with_chunk_size(mut self, chunk_size: i64) -> Self {
        debug_assert!(chunk_size > 0);
        self.chunk_size = chunk_size;
        self
    }

    /// Registers an alternate behavior handler factory.
    pub fn register_handler(&mut self, tag: BehaviorTag, factory: HandlerFactory) {
        self.registry.register(tag, factory);
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns a token for cooperative cancellation between chunks.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads `source` as a new file under `target`.
    pub async fn upload(
        &mut self,
        target: &UploadTarget,
        source: Box<dyn ByteSource>,
    ) -> Result<(), UploadError> {
        let req = TicketRequest::CreateFile(CreateFileRequest {
            parent_type: target.parent_type,
            parent_id: target.parent_id.clone(),
            name: source.name().to_string(),
            size: source.len(),
            mime_type: source.mime_type().to_string(),
        });
        self.start(req, source).await
    }

    /// Replaces the contents of the existing file `file_id` with
    /// `source`, keeping its name and MIME type.
    pub async fn update_contents(
        &mut self,
        file_id: &str,
        source: Box<dyn ByteSource>,
    ) -> Result<(), UploadError> {
        let req = TicketRequest::UpdateContents {
            file_id: file_id.to_string(),
            size: source.len(),
        };
        self.start(req, source).await
    }

    async fn start(
        &mut self,
        req: TicketRequest,
        source: Box<dyn ByteSource>,
    ) -> Result<(), UploadError> {
        // A new upload discards any frozen or delegated state.
        self.frozen = None;
        self.delegate = None;

        let mut session = TransferSession::new(source.len());
        session.await_ticket()?;

        let ticket = match self.transport.request_ticket(&req).await {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!(error = %e, "ticket request failed");
                self.emit(UploadEvent::ErrorStarting {
                    message: e.user_message(),
                    identifier: e.identifier().map(str::to_string),
                })
                .await;
                return Err(e);
            }
        };

        debug!(
            upload_id = %ticket.id,
            size = source.len(),
            behavior = ?ticket.behavior,
            "ticket issued"
        );
        session.ticket_issued(ticket.id.clone())?;

        // A ticket naming a registered behavior bypasses chunking.
        if let Some((tag, factory)) = self.registry.resolve(ticket.behavior.as_deref()) {
            debug!(?tag, upload_id = %ticket.id, "delegating to behavior handler");
            let total = source.len();
            let (events, events_rx) = mpsc::channel(64);
            let handler = factory(HandlerContext {
                ticket,
                source,
                events,
            });
            let active = ActiveHandler {
                handler,
                events_rx,
                total,
            };
            return self.run_delegated(active, false).await;
        }

        // Empty source: complete immediately, no chunk is ever sent.
        if source.is_empty() {
            session.complete()?;
            info!(upload_id = %ticket.id, "upload complete (empty source)");
            self.emit(UploadEvent::Complete).await;
            return Ok(());
        }

        self.run_chunks(session, source).await
    }

    /// Sends chunks strictly sequentially until done or interrupted.
    async fn run_chunks(
        &mut self,
        mut session: TransferSession,
        mut source: Box<dyn ByteSource>,
    ) -> Result<(), UploadError> {
        let total = session.total_size();
        let upload_id = match session.ticket_id() {
            Some(id) => id.to_string(),
            None => {
                return Err(UploadError::InvalidTransition {
                    state: session.state().name(),
                    op: "runChunks",
                });
            }
        };

        loop {
            if self.cancel.is_cancelled() {
                info!(upload_id = %upload_id, "upload cancelled");
                self.spawn_release(upload_id.clone());
                session.abort()?;
                return Err(UploadError::Cancelled);
            }

            // A resume may learn the server already holds everything.
            if session.offset() == total {
                session.complete()?;
                self.frozen = None;
                self.emit(UploadEvent::Complete).await;
                return Ok(());
            }

            let (start, end) = chunk_window(session.offset(), total, self.chunk_size);
            session.chunk_started(end - start)?;

            let data = match source.read_range(start, end) {
                Ok(data) => data,
                Err(e) => return self.freeze_on_error(session, source, e).await,
            };
            let chunk = ChunkUpload {
                upload_id: upload_id.clone(),
                offset: start,
                data,
            };
            let reporter = ProgressReporter::new(
                start,
                end - start,
                total,
                source.name().to_string(),
                self.events_tx.clone(),
            );

            match self.transport.send_chunk(&chunk, &reporter).await {
                Ok(()) => {
                    let bytes = end - start;
                    debug!(upload_id = %upload_id, offset = start, bytes, "chunk accepted");
                    self.emit(UploadEvent::ChunkSent { bytes }).await;
                    if session.chunk_acked()? {
                        info!(upload_id = %upload_id, total, "upload complete");
                        self.frozen = None;
                        self.emit(UploadEvent::Complete).await;
                        return Ok(());
                    }
                    // Next chunk immediately; never in parallel.
                }
                Err(e) => return self.freeze_on_error(session, source, e).await,
            }
        }
    }

    /// Freezes the session for a later resume and surfaces the error.
    async fn freeze_on_error(
        &mut self,
        mut session: TransferSession,
        source: Box<dyn ByteSource>,
        err: UploadError,
    ) -> Result<(), UploadError> {
        warn!(error = %err, offset = session.offset(), "chunk send failed, freezing session");
        session.freeze()?;
        self.frozen = Some(FrozenUpload { session, source });
        self.emit(UploadEvent::Error {
            message: err.user_message(),
            identifier: err.identifier().map(str::to_string),
        })
        .await;
        Err(err)
    }

    /// Resumes an upload interrupted by an `error` event.
    ///
    /// The locally remembered offset is not trusted: the previous
    /// failure may have happened after the server committed part of the
    /// chunk, so the authoritative offset is re-queried first.
    pub async fn resume_upload(&mut self) -> Result<(), UploadError> {
        // Delegated uploads resume through their handler when it can.
        if let Some(active) = self.delegate.take() {
            if active.handler.supports_resume() {
                debug!("resuming through behavior handler");
                return self.run_delegated(active, true).await;
            }
            self.delegate = Some(active);
        }

        let Some(FrozenUpload { mut session, source }) = self.frozen.take() else {
            return Err(UploadError::NothingToResume);
        };
        let upload_id = match session.ticket_id() {
            Some(id) => id.to_string(),
            None => return Err(UploadError::NothingToResume),
        };

        match self.transport.query_offset(&upload_id).await {
            Ok(offset) => {
                debug!(upload_id = %upload_id, offset, "resuming at server offset");
                session.thaw(offset)?;
                self.run_chunks(session, source).await
            }
            Err(e) => {
                warn!(upload_id = %upload_id, error = %e, "offset query failed");
                // Keep the frozen state so the caller may retry.
                self.frozen = Some(FrozenUpload { session, source });
                self.emit(UploadEvent::Error {
                    message: e.user_message(),
                    identifier: e.identifier().map(str::to_string),
                })
                .await;
                Err(e)
            }
        }
    }

    /// Releases the frozen ticket, if any. Best-effort and idempotent:
    /// the release is fire-and-forget and at most one request is issued
    /// per frozen session.
    pub fn abort_upload(&mut self) {
        self.delegate = None;
        let Some(frozen) = self.frozen.take() else {
            return;
        };
        if let Some(id) = frozen.session.ticket_id() {
            info!(upload_id = %id, "aborting upload");
            self.spawn_release(id.to_string());
        }
    }

    fn spawn_release(&self, upload_id: String) {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            // The ticket may already be expired server-side; a failure
            // here is not user-visible.
            if let Err(e) = transport.release_upload(&upload_id).await {
                warn!(upload_id = %upload_id, error = %e, "upload release failed");
            }
        });
    }

    /// Runs a delegated handler, forwarding its events to subscribers.
    async fn run_delegated(
        &mut self,
        mut active: ActiveHandler,
        resume: bool,
    ) -> Result<(), UploadError> {
        let result = {
            let mut fut = if resume {
                active.handler.resume()
            } else {
                active.handler.execute()
            };
            loop {
                tokio::select! {
                    res = &mut fut => break res,
                    Some(event) = active.events_rx.recv() => {
                        self.forward_handler_event(event, active.total).await;
                    }
                }
            }
        };

        // Drain anything emitted just before the handler finished.
        while let Ok(event) = active.events_rx.try_recv() {
            self.forward_handler_event(event, active.total).await;
        }

        match result {
            Ok(()) => {
                info!("delegated upload finished");
                // The handler is dropped; a late event cannot revive it.
                Ok(())
            }
            Err(e) => {
                if active.handler.supports_resume() {
                    self.delegate = Some(active);
                }
                Err(e)
            }
        }
    }

    async fn forward_handler_event(&self, event: UploadEvent, total: i64) {
        let event = match event {
            // Handler-local byte counters are mapped onto the full
            // source size.
            UploadEvent::Progress(mut sample) => {
                sample.total = total;
                UploadEvent::Progress(sample)
            }
            other => other,
        };
        self.emit(event).await;
    }

    async fn emit(&self, event: UploadEvent) {
        let _ = self.events_tx.send(event).await;
    }
}
