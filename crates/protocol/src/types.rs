use serde::{Deserialize, Serialize};

/// Resource type a new file can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentType {
    Folder,
    Item,
}

impl ParentType {
    /// Returns the wire name of this parent type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentType::Folder => "folder",
            ParentType::Item => "item",
        }
    }
}

/// Parent container a new file is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub parent_type: ParentType,
    pub parent_id: String,
}

impl UploadTarget {
    pub fn new(parent_type: ParentType, parent_id: impl Into<String>) -> Self {
        Self {
            parent_type,
            parent_id: parent_id.into(),
        }
    }
}

/// Body of `POST file` — asks the server to open an upload for a new file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest {
    pub parent_type: ParentType,
    pub parent_id: String,
    pub name: String,
    pub size: i64,
    pub mime_type: String,
}

/// A request for an upload ticket.
///
/// `CreateFile` attaches a new file under a folder or item.
/// `UpdateContents` replaces the bytes of an existing file without
/// changing its name or MIME type (`PUT file/{id}/contents`).
#[derive(Debug, Clone, PartialEq)]
pub enum TicketRequest {
    CreateFile(CreateFileRequest),
    UpdateContents { file_id: String, size: i64 },
}

impl TicketRequest {
    /// Total payload size this request announces to the server.
    pub fn size(&self) -> i64 {
        match self {
            TicketRequest::CreateFile(req) => req.size,
            TicketRequest::UpdateContents { size, .. } => *size,
        }
    }
}

/// Upload ticket issued by the server, one per upload attempt.
///
/// Immutable once issued. `behavior` optionally names an alternate
/// upload strategy (e.g. direct-to-object-store) that bypasses the
/// built-in chunked protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
    #[serde(default)]
    pub size: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<ParentType>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_id: String,
}

/// Structured rejection body returned with a 4xx/5xx response.
///
/// `identifier` is a machine-readable error code (e.g. quota exceeded)
/// and is not always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

/// Response of `GET file/offset` — the authoritative last-accepted byte
/// offset for an interrupted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetResponse {
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_type_wire_names() {
        assert_eq!(serde_json::to_string(&ParentType::Folder).unwrap(), "\"folder\"");
        assert_eq!(serde_json::to_string(&ParentType::Item).unwrap(), "\"item\"");
        assert_eq!(ParentType::Item.as_str(), "item");
    }

    #[test]
    fn create_file_request_camel_case() {
        let req = CreateFileRequest {
            parent_type: ParentType::Folder,
            parent_id: "f1".into(),
            name: "data.bin".into(),
            size: 42,
            mime_type: "application/octet-stream".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["parentType"], "folder");
        assert_eq!(json["parentId"], "f1");
        assert_eq!(json["mimeType"], "application/octet-stream");
    }

    #[test]
    fn ticket_parses_underscore_id() {
        let ticket: UploadTicket = serde_json::from_str(
            r#"{"_id": "u123", "size": 1000, "name": "data.bin"}"#,
        )
        .unwrap();
        assert_eq!(ticket.id, "u123");
        assert_eq!(ticket.size, 1000);
        assert!(ticket.behavior.is_none());
    }

    #[test]
    fn ticket_tolerates_unknown_fields() {
        // The server attaches bookkeeping fields the client does not model.
        let ticket: UploadTicket = serde_json::from_str(
            r#"{"_id": "u1", "behavior": "s3", "size": 5, "created": "2024-01-01", "userId": "x"}"#,
        )
        .unwrap();
        assert_eq!(ticket.behavior.as_deref(), Some("s3"));
    }

    #[test]
    fn server_error_identifier_optional() {
        let err: ServerError = serde_json::from_str(r#"{"message": "Invalid offset."}"#).unwrap();
        assert_eq!(err.message, "Invalid offset.");
        assert!(err.identifier.is_none());

        let err: ServerError =
            serde_json::from_str(r#"{"message": "Quota exceeded.", "identifier": "QuotaExceeded"}"#)
                .unwrap();
        assert_eq!(err.identifier.as_deref(), Some("QuotaExceeded"));
    }

    #[test]
    fn ticket_request_size() {
        let req = TicketRequest::UpdateContents {
            file_id: "f9".into(),
            size: 77,
        };
        assert_eq!(req.size(), 77);
    }
}
