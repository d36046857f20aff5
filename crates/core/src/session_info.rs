// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! `SessionInfo`: the summary `ListSessions()` returns (spec.md §4.2).

use crate::state::SessionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session: String,
    pub tasks_total: usize,
    pub tasks_completed: usize,
    pub notes_total: usize,
    pub inbox_unread: usize,
    pub complete: bool,
    pub last_activity: Option<DateTime<Utc>>,
}

impl SessionInfo {
    pub fn derive(session: &str, state: &SessionState) -> Self {
        Self {
            session: session.to_string(),
            tasks_total: state.tasks.len(),
            tasks_completed: state
                .tasks
                .values()
                .filter(|t| matches!(t.status, crate::state::TaskStatus::Completed))
                .count(),
            notes_total: state.notes.len(),
            inbox_unread: state.unread_inbox().len(),
            complete: state.control.complete,
            last_activity: state.last_activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventType};

    #[test]
    fn derives_counts_from_state() {
        let events = vec![
            Event::new("demo", EventType::Task, "add", serde_json::json!({}), "t1"),
            Event::new("demo", EventType::Note, "add", serde_json::json!({"type":"tip"}), "n1"),
            Event::new("demo", EventType::Inbox, "add", serde_json::json!({}), "hi"),
        ];
        let state = SessionState::fold("demo", &events);
        let info = SessionInfo::derive("demo", &state);
        assert_eq!(info.tasks_total, 1);
        assert_eq!(info.tasks_completed, 0);
        assert_eq!(info.notes_total, 1);
        assert_eq!(info.inbox_unread, 1);
        assert!(!info.complete);
    }
}
