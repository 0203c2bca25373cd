//! Hand-rolled multipart/form-data encoding for chunk requests.
//!
//! The chunk endpoint expects `offset` and `uploadId` as plain form
//! fields followed by the payload under `chunk`. Encoding the form
//! up front gives a known body length, which the progress correction
//! in `portage_upload::progress` depends on.

use uuid::Uuid;

/// Encodes one chunk request body.
///
/// Returns the `Content-Type` header value (carrying the boundary) and
/// the full body. Field order is fixed: `offset`, `uploadId`, `chunk`.
pub fn encode_chunk_form(upload_id: &str, offset: i64, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = format!("portage-{}", Uuid::new_v4());
    let content_type = format!("multipart/form-data; boundary={boundary}");

    let mut body = Vec::with_capacity(data.len() + 512);
    push_text_field(&mut body, &boundary, "offset", &offset.to_string());
    push_text_field(&mut body, &boundary, "uploadId", upload_id);

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"chunk\"; filename=\"chunk\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (content_type, body)
}

fn push_text_field(body: &mut Vec<u8>, boundary: &str, name: &str, value: &str) {
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(value.as_bytes());
    body.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .position(|w| w == needle)
            .expect("needle present")
    }

    #[test]
    fn fields_in_protocol_order() {
        let (_, body) = encode_chunk_form("upload-1", 1000, b"payload");
        let offset = position(&body, b"name=\"offset\"");
        let upload_id = position(&body, b"name=\"uploadId\"");
        let chunk = position(&body, b"name=\"chunk\"");
        assert!(offset < upload_id);
        assert!(upload_id < chunk);
    }

    #[test]
    fn carries_values_and_payload_verbatim() {
        let payload: Vec<u8> = (0u16..=255).map(|b| b as u8).collect();
        let (content_type, body) = encode_chunk_form("u-42", 2000, &payload);

        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        assert!(body.starts_with(format!("--{boundary}\r\n").as_bytes()));
        assert!(body.ends_with(format!("--{boundary}--\r\n").as_bytes()));

        position(&body, b"\r\n\r\n2000\r\n");
        position(&body, b"\r\n\r\nu-42\r\n");
        position(&body, &payload);
    }

    #[test]
    fn envelope_size_is_independent_of_payload() {
        let (_, small) = encode_chunk_form("u-1", 0, &[0u8; 10]);
        let (_, large) = encode_chunk_form("u-1", 0, &[0u8; 5000]);
        assert_eq!(small.len() - 10, large.len() - 5000);
    }
}
