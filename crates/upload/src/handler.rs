//! Pluggable behavior handlers.
//!
//! Some storage backends accept the payload through a different protocol
//! (e.g. signed direct-to-object-store requests) and bypass chunking
//! entirely. The server signals this with a `behavior` string on the
//! ticket; the engine resolves it against this registry at
//! ticket-receipt time and delegates the whole transfer.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use portage_protocol::UploadTicket;
use tokio::sync::mpsc;

use crate::error::UploadError;
use crate::events::UploadEvent;
use crate::source::ByteSource;

/// Known alternate upload behaviors a ticket can name.
///
/// Behavior strings outside this closed set fall back to the built-in
/// chunked protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorTag {
    /// Direct-to-object-store upload negotiated by the server.
    S3,
}

impl BehaviorTag {
    /// Parses a ticket's `behavior` string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "s3" => Some(BehaviorTag::S3),
            _ => None,
        }
    }
}

/// Everything a behavior handler needs to run an upload on its own.
pub struct HandlerContext {
    pub ticket: UploadTicket,
    pub source: Box<dyn ByteSource>,
    /// Handler-local event channel. The engine forwards these events to
    /// its subscribers, rewriting progress totals onto the source size.
    pub events: mpsc::Sender<UploadEvent>,
}

/// Boxed future for handler operations.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>>;

/// An alternate upload strategy that replaces the chunked protocol.
///
/// Handlers own their source and emit the same lifecycle events as the
/// engine, including their own `complete` on success.
pub trait BehaviorHandler: Send {
    /// Runs the transfer from the beginning.
    fn execute(&mut self) -> HandlerFuture<'_>;

    /// Whether [`resume`](Self::resume) can continue an interrupted run.
    fn supports_resume(&self) -> bool {
        false
    }

    /// Continues an interrupted run.
    fn resume(&mut self) -> HandlerFuture<'_> {
        Box::pin(async { Err(UploadError::NothingToResume) })
    }
}

/// Builds a handler for a ticket naming its behavior.
pub type HandlerFactory = Box<dyn Fn(HandlerContext) -> Box<dyn BehaviorHandler> + Send + Sync>;

/// Maps behavior tags to handler factories.
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<BehaviorTag, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `tag`, replacing any previous one.
    pub fn register(&mut self, tag: BehaviorTag, factory: HandlerFactory) {
        self.factories.insert(tag, factory);
    }

    /// Resolves a ticket's behavior string to a registered factory.
    ///
    /// Returns `None` for absent, unknown, or unregistered behaviors —
    /// the caller then runs the built-in chunked protocol.
    pub fn resolve(&self, behavior: Option<&str>) -> Option<(BehaviorTag, &HandlerFactory)> {
        let tag = BehaviorTag::parse(behavior?)?;
        self.factories.get(&tag).map(|f| (tag, f))
    }

    pub fn contains(&self, tag: BehaviorTag) -> bool {
        self.factories.contains_key(&tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    struct NoopHandler;

    impl BehaviorHandler for NoopHandler {
        fn execute(&mut self) -> HandlerFuture<'_> {
            Box::pin(async { Ok(()) })
        }
    }

    fn noop_factory() -> HandlerFactory {
        Box::new(|_ctx| Box::new(NoopHandler))
    }

    #[test]
    fn parse_known_and_unknown_tags() {
        assert_eq!(BehaviorTag::parse("s3"), Some(BehaviorTag::S3));
        assert_eq!(BehaviorTag::parse("S3"), None);
        assert_eq!(BehaviorTag::parse("gridfs"), None);
    }

    #[test]
    fn resolve_requires_registration() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.resolve(Some("s3")).is_none());

        registry.register(BehaviorTag::S3, noop_factory());
        assert!(registry.contains(BehaviorTag::S3));
        let (tag, _) = registry.resolve(Some("s3")).unwrap();
        assert_eq!(tag, BehaviorTag::S3);

        assert!(registry.resolve(None).is_none());
        assert!(registry.resolve(Some("unknown")).is_none());
    }

    #[tokio::test]
    async fn default_resume_is_unsupported() {
        let mut handler = NoopHandler;
        assert!(!handler.supports_resume());
        assert!(matches!(
            handler.resume().await,
            Err(UploadError::NothingToResume)
        ));
    }

    #[test]
    fn context_carries_source() {
        let (tx, _rx) = mpsc::channel(1);
        let ctx = HandlerContext {
            ticket: serde_json::from_str(r#"{"_id": "u1", "behavior": "s3"}"#).unwrap(),
            source: Box::new(MemorySource::new(vec![1, 2, 3], "x.bin", "application/octet-stream")),
            events: tx,
        };
        assert_eq!(ctx.source.len(), 3);
        assert_eq!(ctx.ticket.behavior.as_deref(), Some("s3"));
    }
}
