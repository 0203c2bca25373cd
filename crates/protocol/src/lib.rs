//! Wire types for the Portage upload REST surface.
//!
//! These types mirror the server's JSON contract exactly (camelCase keys,
//! `_id` for identifiers). They carry no logic beyond serialization and
//! are shared by the upload engine and the HTTP transport.

pub mod types;

pub use types::{
    CreateFileRequest, OffsetResponse, ParentType, ServerError, TicketRequest, UploadTarget,
    UploadTicket,
};
