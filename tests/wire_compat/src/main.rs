fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and
    /// compares the JSON values (key-order independent).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  server: {fixture}\n  client: {reserialized}"
        );
    }

    // --- Protocol type fixtures ---

    #[test]
    fn fixture_upload_ticket_full() {
        roundtrip_test::<portage_protocol::UploadTicket>("upload_ticket_full.json");
    }

    #[test]
    fn fixture_upload_ticket_minimal() {
        roundtrip_test::<portage_protocol::UploadTicket>("upload_ticket_minimal.json");
    }

    #[test]
    fn fixture_create_file_request() {
        roundtrip_test::<portage_protocol::CreateFileRequest>("create_file_request.json");
    }

    #[test]
    fn fixture_server_error() {
        roundtrip_test::<portage_protocol::ServerError>("server_error.json");
    }

    #[test]
    fn fixture_offset_response() {
        roundtrip_test::<portage_protocol::OffsetResponse>("offset_response.json");
    }

    // --- Event fixtures ---

    #[test]
    fn fixture_event_complete() {
        roundtrip_test::<portage_upload::UploadEvent>("event_complete.json");
    }

    #[test]
    fn fixture_event_chunk_sent() {
        roundtrip_test::<portage_upload::UploadEvent>("event_chunk_sent.json");
    }

    #[test]
    fn fixture_event_progress() {
        roundtrip_test::<portage_upload::UploadEvent>("event_progress.json");
    }

    #[test]
    fn fixture_event_error() {
        roundtrip_test::<portage_upload::UploadEvent>("event_error.json");
    }

    #[test]
    fn fixture_event_error_starting() {
        roundtrip_test::<portage_upload::UploadEvent>("event_error_starting.json");
    }

    // --- Tolerance for server-side bookkeeping fields ---

    #[test]
    fn ticket_with_server_bookkeeping_fields() {
        // Servers attach ids and timestamps the client does not model.
        let json = r#"{
            "_id": "upload-55",
            "size": 1048576,
            "behavior": null,
            "created": "2026-08-30T12:00:00Z",
            "userId": "user-3",
            "received": 0
        }"#;
        let ticket: portage_protocol::UploadTicket = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.id, "upload-55");
        assert_eq!(ticket.size, 1048576);
        assert!(ticket.behavior.is_none(), "null behavior maps to None");
    }

    #[test]
    fn event_tags_match_names() {
        for name in [
            "event_complete.json",
            "event_chunk_sent.json",
            "event_progress.json",
            "event_error.json",
            "event_error_starting.json",
        ] {
            let fixture = load_fixture(name);
            let event: portage_upload::UploadEvent =
                serde_json::from_value(fixture.clone()).unwrap();
            assert_eq!(fixture["event"], event.name(), "tag mismatch in {name}");
        }
    }
}
