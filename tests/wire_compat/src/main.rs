fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use loraota_protocol::{Command, Frame};

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

    /// Deserializes fixture `name` into `T`, serializes it back and checks
    /// the JSON is unchanged.
    fn roundtrip_test<T>(name: &str) -> T
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
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  ours:    {reserialized}"
        );
        parsed
    }

    fn vectors(group: &str) -> Vec<serde_json::Value> {
        load_fixture("frames.json")[group]
            .as_array()
            .unwrap_or_else(|| panic!("frames.json has no {group} array"))
            .clone()
    }

    fn field<'a>(v: &'a serde_json::Value, key: &str) -> &'a serde_json::Value {
        v.get(key)
            .unwrap_or_else(|| panic!("vector {} lacks {key}", v["name"]))
    }

    fn bytes(v: &serde_json::Value, key: &str) -> Vec<u8> {
        hex::decode(field(v, key).as_str().unwrap()).unwrap()
    }

    /// Builds the expected frame from a vector; borrows `payload`.
    fn expected<'a>(v: &serde_json::Value, payload: &'a [u8]) -> Frame<'a> {
        let command: Command = serde_json::from_value(field(v, "command").clone()).unwrap();
        match command {
            Command::Start => Frame::Start {
                firmware_size: field(v, "firmware_size").as_u64().unwrap() as u32,
                total_chunks: field(v, "total_chunks").as_u64().unwrap() as u16,
            },
            Command::Data => Frame::Data {
                seq: field(v, "seq").as_u64().unwrap() as u16,
                payload,
            },
            Command::End => Frame::End,
            Command::Abort => Frame::Abort,
        }
    }

    #[test]
    fn encoder_matches_vectors() {
        for v in vectors("valid") {
            let payload = v.get("payload").map(|_| bytes(&v, "payload")).unwrap_or_default();
            let frame = expected(&v, &payload);
            assert_eq!(
                hex::encode(frame.encode()),
                field(&v, "hex").as_str().unwrap(),
                "encode mismatch for {}",
                v["name"]
            );
        }
    }

    #[test]
    fn decoder_matches_vectors() {
        for v in vectors("valid") {
            let payload = v.get("payload").map(|_| bytes(&v, "payload")).unwrap_or_default();
            let wire = bytes(&v, "hex");
            let decoded = Frame::decode(&wire)
                .unwrap_or_else(|e| panic!("decode failed for {}: {e}", v["name"]));
            assert_eq!(decoded, expected(&v, &payload), "decode mismatch for {}", v["name"]);
        }
    }

    #[test]
    fn decoder_rejects_invalid_vectors() {
        for v in vectors("invalid") {
            let wire = bytes(&v, "hex");
            assert!(
                Frame::decode(&wire).is_err(),
                "{} should not decode",
                v["name"]
            );
        }
    }

    #[test]
    fn command_bytes_are_stable() {
        assert_eq!(Command::Start.as_byte(), 0x01);
        assert_eq!(Command::Data.as_byte(), 0x02);
        assert_eq!(Command::End.as_byte(), 0x03);
        assert_eq!(Command::Abort.as_byte(), 0x04);
    }

    #[test]
    fn fixture_queue_item() {
        let parsed: loraota_chirpstack::EnqueueRequest = roundtrip_test("queue_item.json");
        assert_eq!(parsed.queue_item.f_port, 10);
        assert!(!parsed.queue_item.confirmed);
    }

    #[test]
    fn fixture_enqueue_response() {
        let parsed: loraota_chirpstack::EnqueueResponse = roundtrip_test("enqueue_response.json");
        assert_eq!(parsed.id, "5b1e2c1a-0000-4000-8000-000000000001");
    }
}
