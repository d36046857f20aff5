// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! The only persisted unit: an immutable `Event` (spec.md §3.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level discriminator. The bus subject is `iteratr.<session>.<type>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Task,
    Note,
    Inbox,
    Iteration,
    Control,
}

impl EventType {
    /// The wire-format subject segment, e.g. `"task"`.
    pub fn as_subject_segment(&self) -> &'static str {
        match self {
            EventType::Task => "task",
            EventType::Note => "note",
            EventType::Inbox => "inbox",
            EventType::Iteration => "iteration",
            EventType::Control => "control",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_subject_segment())
    }
}

/// An immutable record. `id` is assigned by the bus on publish; `timestamp`
/// is set by the publisher if unset. `meta`'s schema is keyed by
/// `(type, action)` — unknown `(type, action)` pairs round-trip verbatim
/// because `meta` is an open `serde_json::Value` rather than a closed enum
/// (see SPEC_FULL.md §4.1 for why).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number assigned by the bus. `0` until published.
    #[serde(default)]
    pub id: u64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub session: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub action: String,
    #[serde(default = "default_meta")]
    pub meta: serde_json::Value,
    #[serde(default)]
    pub data: String,
}

fn default_meta() -> serde_json::Value {
    serde_json::Value::Null
}

impl Event {
    /// Build an unpublished event (id=0, timestamp=now). The bus assigns
    /// the real id and may overwrite the timestamp if the caller left it
    /// at the default.
    pub fn new(
        session: impl Into<String>,
        kind: EventType,
        action: impl Into<String>,
        meta: serde_json::Value,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            timestamp: Utc::now(),
            session: session.into(),
            kind,
            action: action.into(),
            meta,
            data: data.into(),
        }
    }

    /// The subject this event is published to: `iteratr.<session>.<type>`.
    pub fn subject(&self) -> String {
        format!("iteratr.{}.{}", self.session, self.kind.as_subject_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_is_namespaced_by_session_and_type() {
        let ev = Event::new("demo", EventType::Task, "add", serde_json::json!({}), "t1");
        assert_eq!(ev.subject(), "iteratr.demo.task");
    }

    #[test]
    fn unknown_action_round_trips_meta_verbatim() {
        let ev = Event::new(
            "demo",
            EventType::Control,
            "some_future_action",
            serde_json::json!({"future_field": 42, "nested": {"a": [1,2,3]}}),
            "",
        );
        let bytes = serde_json::to_vec(&ev).unwrap();
        let back: Event = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.action, "some_future_action");
        assert_eq!(back.meta, ev.meta);
    }

    #[test]
    fn event_type_serializes_snake_case() {
        let s = serde_json::to_string(&EventType::Iteration).unwrap();
        assert_eq!(s, "\"iteration\"");
    }
}
