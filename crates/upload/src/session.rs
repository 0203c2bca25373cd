//! Transfer session state machine.
//!
//! A session owns the mutable state of one upload attempt. Every change
//! is an explicit transition on [`SessionState`], taken by value, so the
//! legal state graph is checked in one place instead of scattered over
//! callback code.

use crate::error::UploadError;

/// State of one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No upload in flight.
    Idle,
    /// Ticket request issued, waiting for the server.
    AwaitingTicket,
    /// Chunks are being sent sequentially.
    Sending {
        ticket_id: String,
        /// Last byte boundary acknowledged by the server (0 initially).
        offset: i64,
        /// Payload length of the chunk currently in flight (0 between
        /// chunks).
        last_chunk_len: i64,
    },
    /// A send failed; the session keeps the last *attempted* offset.
    /// Resuming must re-query the server's authoritative offset since
    /// the failure may have happened after a partial commit.
    Frozen { ticket_id: String, offset: i64 },
    /// All bytes acknowledged.
    Complete,
    /// Discarded; the server was asked to release the ticket.
    Aborted,
}

impl SessionState {
    /// Short state name used in transition errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingTicket => "awaitingTicket",
            SessionState::Sending { .. } => "sending",
            SessionState::Frozen { .. } => "frozen",
            SessionState::Complete => "complete",
            SessionState::Aborted => "aborted",
        }
    }
}

/// The mutable state of one upload attempt.
///
/// Invariants: `0 <= offset <= total_size`, and the offset only advances
/// when [`chunk_acked`](TransferSession::chunk_acked) confirms the server
/// accepted the chunk ending there.
#[derive(Debug)]
pub struct TransferSession {
    total_size: i64,
    state: SessionState,
}

impl TransferSession {
    /// Creates an idle session for a payload of `total_size` bytes.
    pub fn new(total_size: i64) -> Self {
        Self {
            total_size,
            state: SessionState::Idle,
        }
    }

    pub fn total_size(&self) -> i64 {
        self.total_size
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current byte offset (0 outside of `Sending`/`Frozen`).
    pub fn offset(&self) -> i64 {
        match &self.state {
            SessionState::Sending { offset, .. } | SessionState::Frozen { offset, .. } => *offset,
            _ => 0,
        }
    }

    /// Ticket id, once issued.
    pub fn ticket_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::Sending { ticket_id, .. } | SessionState::Frozen { ticket_id, .. } => {
                Some(ticket_id)
            }
            _ => None,
        }
    }

    /// Applies a transition; restores the previous state on rejection.
    fn step(
        &mut self,
        op: &'static str,
        f: impl FnOnce(SessionState) -> Result<SessionState, SessionState>,
    ) -> Result<(), UploadError> {
        match f(std::mem::replace(&mut self.state, SessionState::Idle)) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(prev) => {
                let state = prev.name();
                self.state = prev;
                Err(UploadError::InvalidTransition { state, op })
            }
        }
    }

    /// Idle → AwaitingTicket.
    pub fn await_ticket(&mut self) -> Result<(), UploadError> {
        self.step("awaitTicket", |s| match s {
            SessionState::Idle => Ok(SessionState::AwaitingTicket),
            other => Err(other),
        })
    }

    /// AwaitingTicket → Sending at offset 0.
    pub fn ticket_issued(&mut self, ticket_id: String) -> Result<(), UploadError> {
        self.step("ticketIssued", |s| match s {
            SessionState::AwaitingTicket => Ok(SessionState::Sending {
                ticket_id,
                offset: 0,
                last_chunk_len: 0,
            }),
            other => Err(other),
        })
    }

    /// Records the payload length of the chunk about to be sent.
    pub fn chunk_started(&mut self, len: i64) -> Result<(), UploadError> {
        let total = self.total_size;
        self.step("chunkStarted", move |s| match s {
            SessionState::Sending {
                ticket_id, offset, ..
            } if len > 0 && offset + len <= total => Ok(SessionState::Sending {
                ticket_id,
                offset,
                last_chunk_len: len,
            }),
            other => Err(other),
        })
    }

    /// The server acknowledged the in-flight chunk; the offset advances
    /// to its end. Returns `true` when the transfer reached `total_size`.
    pub fn chunk_acked(&mut self) -> Result<bool, UploadError> {
        let total = self.total_size;
        self.step("chunkAcked", move |s| match s {
            SessionState::Sending {
                ticket_id,
                offset,
                last_chunk_len,
            } if last_chunk_len > 0 => {
                let next = offset + last_chunk_len;
                if next == total {
                    Ok(SessionState::Complete)
                } else {
                    Ok(SessionState::Sending {
                        ticket_id,
                        offset: next,
                        last_chunk_len: 0,
                    })
                }
            }
            other => Err(other),
        })?;
        Ok(matches!(self.state, SessionState::Complete))
    }

    /// Sending → Frozen at the last attempted offset.
    pub fn freeze(&mut self) -> Result<(), UploadError> {
        self.step("freeze", |s| match s {
            SessionState::Sending {
                ticket_id, offset, ..
            } => Ok(SessionState::Frozen { ticket_id, offset }),
            other => Err(other),
        })
    }

    /// Frozen → Sending at the server-reported offset, which may be
    /// lower than the frozen one.
    pub fn thaw(&mut self, server_offset: i64) -> Result<(), UploadError> {
        let total = self.total_size;
        self.step("thaw", move |s| match s {
            SessionState::Frozen { ticket_id, .. }
                if (0..=total).contains(&server_offset) =>
            {
                Ok(SessionState::Sending {
                    ticket_id,
                    offset: server_offset,
                    last_chunk_len: 0,
                })
            }
            other => Err(other),
        })
    }

    /// Marks an upload that never needed a chunk (empty source) complete.
    pub fn complete(&mut self) -> Result<(), UploadError> {
        let total = self.total_size;
        self.step("complete", move |s| match s {
            SessionState::Sending { offset, .. } if offset == total => Ok(SessionState::Complete),
            other => Err(other),
        })
    }

    /// Discards the session.
    pub fn abort(&mut self) -> Result<(), UploadError> {
        self.step("abort", |s| match s {
            SessionState::AwaitingTicket
            | SessionState::Sending { .. }
            | SessionState::Frozen { .. } => Ok(SessionState::Aborted),
            other => Err(other),
        })
    }
}
