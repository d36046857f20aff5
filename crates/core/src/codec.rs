// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! Bi-directional mapping between `Event` and bus records (spec.md §4.1).
//!
//! JSON is the canonical wire form. Because `Event::meta` is a
//! `serde_json::Value`, unknown fields inside it survive a decode/encode
//! round trip without any hand-written compatibility shim — the open
//! payload *is* the forward-compatibility mechanism.

use crate::event::Event;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decode event: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Encode an event to its canonical wire bytes (newline-free JSON).
pub fn encode(event: &Event) -> Vec<u8> {
    // `Event`'s fields are all known and serializable; encoding cannot
    // fail short of an allocator error, which serde_json surfaces as a
    // panic rather than an Err, so this returns the bytes directly.
    serde_json::to_vec(event).unwrap_or_default()
}

/// Decode an event from wire bytes. Unknown top-level fields are ignored
/// by serde's default behavior (no `deny_unknown_fields`), and unknown
/// `(type, action)` pairs decode fine because `action` is a plain string
/// and `meta` is an open `Value`.
pub fn decode(bytes: &[u8]) -> Result<Event, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    #[test]
    fn round_trips_a_known_event() {
        let ev = Event::new(
            "demo",
            EventType::Task,
            "add",
            serde_json::json!({"status": "remaining"}),
            "t1",
        );
        let bytes = encode(&ev);
        let back = decode(&bytes).unwrap();
        assert_eq!(back.session, ev.session);
        assert_eq!(back.action, ev.action);
        assert_eq!(back.meta, ev.meta);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(b"not json").is_err());
    }

    #[test]
    fn decode_tolerates_unknown_top_level_fields() {
        let raw = br#"{"id":1,"timestamp":"2024-01-01T00:00:00Z","session":"s","type":"task","action":"add","meta":{},"data":"","from_the_future":true}"#;
        let ev = decode(raw).unwrap();
        assert_eq!(ev.session, "s");
    }
}
