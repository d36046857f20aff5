// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! Derived entities (spec.md §3.2) and the pure fold that builds them from
//! an event sequence (spec.md §4.2 "Fold rules").
//!
//! `State::fold` is a pure function of its input slice: no I/O, no
//! randomness, no current-time sampling beyond what the events themselves
//! carry. This is what Testable Property 1 (fold determinism) checks.

use crate::event::{Event, EventType};
use crate::ids::{MessageId, NoteId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Remaining,
    InProgress,
    Completed,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Blocked | TaskStatus::Cancelled
        )
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Remaining
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Learning,
    Stuck,
    Tip,
    Decision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub content: String,
    pub status: TaskStatus,
    pub priority: i64,
    pub depends_on: BTreeSet<TaskId>,
    pub iteration_created: u64,
    pub iteration_completed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub content: String,
    pub note_type: NoteType,
    pub iteration: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iteration {
    pub number: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub complete: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionControl {
    pub model: Option<String>,
    pub complete: bool,
}

/// The deterministic fold of a session's event sequence (spec.md §3.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub tasks: BTreeMap<TaskId, Task>,
    pub notes: BTreeMap<NoteId, Note>,
    pub inbox: BTreeMap<MessageId, Message>,
    pub iterations: Vec<Iteration>,
    pub control: SessionControl,
    /// Timestamp of the highest-id event folded so far (for `SessionInfo`).
    pub last_activity: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Fold a full, bus-ordered event sequence into a `SessionState`.
    /// Events from other sessions are ignored (session isolation,
    /// Testable Property 10) — callers are expected to have already
    /// filtered by subject, but filtering here too costs nothing and
    /// makes the function safe to call on an unfiltered slice.
    pub fn fold(session: &str, events: &[Event]) -> Self {
        let mut state = SessionState::default();
        for event in events {
            if event.session != session {
                continue;
            }
            state.apply(event);
        }
        state
    }

    fn next_task_id(&self) -> TaskId {
        self.tasks
            .keys()
            .max()
            .map(|id| id.next())
            .unwrap_or_else(TaskId::first)
    }

    fn next_note_id(&self) -> NoteId {
        self.notes
            .keys()
            .max()
            .map(|id| id.next())
            .unwrap_or_else(NoteId::first)
    }

    fn next_message_id(&self) -> MessageId {
        self.inbox
            .keys()
            .max()
            .map(|id| id.next())
            .unwrap_or_else(MessageId::first)
    }

    fn current_iteration_number(&self) -> u64 {
        self.iterations.last().map(|it| it.number).unwrap_or(0)
    }

    /// Apply a single event, mutating `self`. Unknown `(type, action)`
    /// pairs are recorded but inert (spec.md §4.2): they do not panic and
    /// do not change any derived field.
    pub fn apply(&mut self, event: &Event) {
        if let Some(ts) = self.last_activity {
            if event.timestamp > ts {
                self.last_activity = Some(event.timestamp);
            }
        } else {
            self.last_activity = Some(event.timestamp);
        }

        match (event.kind, event.action.as_str()) {
            (EventType::Task, "add") => self.apply_task_add(event),
            (EventType::Task, "status") => self.apply_task_status(event),
            (EventType::Task, "depends") => self.apply_task_depends(event),
            (EventType::Note, "add") => self.apply_note_add(event),
            (EventType::Inbox, "add") => self.apply_inbox_add(event),
            (EventType::Inbox, "mark_read") => self.apply_inbox_mark_read(event),
            (EventType::Iteration, "start") => self.apply_iteration_start(event),
            (EventType::Iteration, "complete") => self.apply_iteration_complete(event),
            (EventType::Control, "session_complete") => self.control.complete = true,
            (EventType::Control, "session_restart") => self.control.complete = false,
            (EventType::Control, "set_model") => self.apply_set_model(event),
            // Unknown action for a known type, or a type this build
            // doesn't special-case: inert by design.
            _ => {}
        }
    }

    fn apply_task_add(&mut self, event: &Event) {
        let id = self.next_task_id();
        let status = event
            .meta
            .get("status")
            .and_then(|v| v.as_str())
            .and_then(parse_task_status)
            .unwrap_or_default();
        let priority = event.meta.get("priority").and_then(|v| v.as_i64()).unwrap_or(0);
        let task = Task {
            id,
            content: event.data.clone(),
            status,
            priority,
            depends_on: BTreeSet::new(),
            iteration_created: self.current_iteration_number(),
            iteration_completed: None,
        };
        self.tasks.insert(id, task);
    }

    fn apply_task_status(&mut self, event: &Event) {
        let Some(id) = event.meta.get("id").and_then(|v| v.as_str()).and_then(|s| s.parse().ok())
        else {
            return;
        };
        let Some(status) = event
            .meta
            .get("status")
            .and_then(|v| v.as_str())
            .and_then(parse_task_status)
        else {
            return;
        };
        if let Some(task) = self.tasks.get_mut(&id) {
            task.status = status;
            if status.is_terminal() {
                task.iteration_completed = Some(self.current_iteration_number());
            } else {
                task.iteration_completed = None;
            }
        }
    }

    fn apply_task_depends(&mut self, event: &Event) {
        let Some(id) = event.meta.get("id").and_then(|v| v.as_str()).and_then(|s| s.parse().ok())
        else {
            return;
        };
        let depends_on: BTreeSet<TaskId> = event
            .meta
            .get("depends_on")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .filter_map(|s| s.parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        if let Some(task) = self.tasks.get_mut(&id) {
            task.depends_on = depends_on;
        }
    }

    fn apply_note_add(&mut self, event: &Event) {
        let id = self.next_note_id();
        let note_type = event
            .meta
            .get("type")
            .and_then(|v| v.as_str())
            .and_then(parse_note_type)
            .unwrap_or(NoteType::Tip);
        self.notes.insert(
            id,
            Note {
                id,
                content: event.data.clone(),
                note_type,
                iteration: self.current_iteration_number(),
                created_at: event.timestamp,
            },
        );
    }

    fn apply_inbox_add(&mut self, event: &Event) {
        let id = self.next_message_id();
        self.inbox.insert(
            id,
            Message {
                id,
                content: event.data.clone(),
                read: false,
                created_at: event.timestamp,
            },
        );
    }

    fn apply_inbox_mark_read(&mut self, event: &Event) {
        let Some(id) = event
            .meta
            .get("id")
            .and_then(|v| v.as_u64())
            .map(MessageId)
        else {
            return;
        };
        if let Some(msg) = self.inbox.get_mut(&id) {
            msg.read = true;
        }
    }

    /// Idempotent across a mid-iteration crash: if the last iteration
    /// never completed, replaying its `start` re-opens it instead of
    /// allocating a new number.
    fn apply_iteration_start(&mut self, event: &Event) {
        if let Some(last) = self.iterations.last_mut() {
            if !last.complete {
                last.started_at = event.timestamp;
                return;
            }
        }
        let number = self.current_iteration_number() + 1;
        self.iterations.push(Iteration {
            number,
            started_at: event.timestamp,
            completed_at: None,
            summary: None,
            complete: false,
        });
    }

    fn apply_iteration_complete(&mut self, event: &Event) {
        let summary = event
            .meta
            .get("summary")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if let Some(it) = self.iterations.last_mut() {
            it.complete = true;
            it.completed_at = Some(event.timestamp);
            it.summary = summary;
        }
    }

    fn apply_set_model(&mut self, event: &Event) {
        if let Some(model) = event.meta.get("model").and_then(|v| v.as_str()) {
            self.control.model = Some(model.to_string());
        }
    }

    /// True iff `session_complete` could be published right now without
    /// violating the terminal-status gate (spec.md §3.3 invariant 5).
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks.values().all(|t| t.status.is_terminal())
    }

    pub fn unread_inbox(&self) -> Vec<&Message> {
        self.inbox.values().filter(|m| !m.read).collect()
    }
}

fn parse_task_status(s: &str) -> Option<TaskStatus> {
    match s {
        "remaining" => Some(TaskStatus::Remaining),
        "in_progress" => Some(TaskStatus::InProgress),
        "completed" => Some(TaskStatus::Completed),
        "blocked" => Some(TaskStatus::Blocked),
        "cancelled" => Some(TaskStatus::Cancelled),
        _ => None,
    }
}

fn parse_note_type(s: &str) -> Option<NoteType> {
    match s {
        "learning" => Some(NoteType::Learning),
        "stuck" => Some(NoteType::Stuck),
        "tip" => Some(NoteType::Tip),
        "decision" => Some(NoteType::Decision),
        _ => None,
    }
}
