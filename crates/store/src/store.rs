// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

use crate::error::StoreError;
use itr_bus::{JournaledBus, Subscription};
use itr_core::{Event, EventType, MessageId, NoteId, SessionInfo, SessionState, TaskId};
use std::sync::Arc;

/// Session-level façade over a `JournaledBus`: every method publishes one
/// event and returns the state folded immediately after it, so callers
/// never have to fold twice (spec.md §4.2).
pub struct Store {
    bus: Arc<dyn JournaledBus>,
}

impl Store {
    pub fn new(bus: Arc<dyn JournaledBus>) -> Self {
        Self { bus }
    }

    pub async fn load_state(&self, session: &str) -> Result<SessionState, StoreError> {
        let events = self.bus.load(session).await?;
        Ok(SessionState::fold(session, &events))
    }

    async fn publish_and_fold(
        &self,
        session: &str,
        kind: EventType,
        action: &str,
        meta: serde_json::Value,
        data: impl Into<String>,
    ) -> Result<SessionState, StoreError> {
        let event = Event::new(session, kind, action, meta, data);
        self.bus.publish(event).await?;
        self.load_state(session).await
    }

    pub async fn add_task(
        &self,
        session: &str,
        content: impl Into<String>,
        priority: i64,
    ) -> Result<SessionState, StoreError> {
        self.add_task_with_status(session, content, None, priority).await
    }

    pub async fn add_task_with_status(
        &self,
        session: &str,
        content: impl Into<String>,
        status: Option<&str>,
        priority: i64,
    ) -> Result<SessionState, StoreError> {
        self.publish_and_fold(
            session,
            EventType::Task,
            "add",
            serde_json::json!({ "status": status, "priority": priority }),
            content.into(),
        )
        .await
    }

    pub async fn set_task_status(
        &self,
        session: &str,
        id: TaskId,
        status: &str,
    ) -> Result<SessionState, StoreError> {
        self.publish_and_fold(
            session,
            EventType::Task,
            "status",
            serde_json::json!({ "id": id.to_string(), "status": status }),
            "",
        )
        .await
    }

    pub async fn set_task_depends(
        &self,
        session: &str,
        id: TaskId,
        depends_on: &[TaskId],
    ) -> Result<SessionState, StoreError> {
        let depends: Vec<String> = depends_on.iter().map(|id| id.to_string()).collect();
        self.publish_and_fold(
            session,
            EventType::Task,
            "depends",
            serde_json::json!({ "id": id.to_string(), "depends_on": depends }),
            "",
        )
        .await
    }

    pub async fn add_note(
        &self,
        session: &str,
        content: impl Into<String>,
        note_type: &str,
    ) -> Result<SessionState, StoreError> {
        self.publish_and_fold(
            session,
            EventType::Note,
            "add",
            serde_json::json!({ "type": note_type }),
            content.into(),
        )
        .await
    }

    pub async fn send_message(
        &self,
        session: &str,
        content: impl Into<String>,
    ) -> Result<SessionState, StoreError> {
        self.publish_and_fold(session, EventType::Inbox, "add", serde_json::json!({}), content.into())
            .await
    }

    pub async fn mark_message_read(
        &self,
        session: &str,
        id: MessageId,
    ) -> Result<SessionState, StoreError> {
        self.publish_and_fold(
            session,
            EventType::Inbox,
            "mark_read",
            serde_json::json!({ "id": id.0 }),
            "",
        )
        .await
    }

    pub async fn start_iteration(&self, session: &str) -> Result<SessionState, StoreError> {
        self.publish_and_fold(session, EventType::Iteration, "start", serde_json::json!({}), "")
            .await
    }

    pub async fn complete_iteration(
        &self,
        session: &str,
        summary: Option<String>,
    ) -> Result<SessionState, StoreError> {
        self.publish_and_fold(
            session,
            EventType::Iteration,
            "complete",
            serde_json::json!({ "summary": summary }),
            "",
        )
        .await
    }

    pub async fn set_model(
        &self,
        session: &str,
        model: impl Into<String>,
    ) -> Result<SessionState, StoreError> {
        self.publish_and_fold(
            session,
            EventType::Control,
            "set_model",
            serde_json::json!({ "model": model.into() }),
            "",
        )
        .await
    }

    /// Mark the session complete. Gated on spec.md §3.3 invariant 5: every
    /// task must already be in a terminal state. Rejected attempts publish
    /// nothing (Testable Property 4).
    pub async fn session_complete(&self, session: &str) -> Result<SessionState, StoreError> {
        let state = self.load_state(session).await?;
        if !state.all_tasks_terminal() {
            return Err(StoreError::PreconditionFailed(format!(
                "session {session} has non-terminal tasks"
            )));
        }
        self.publish_and_fold(
            session,
            EventType::Control,
            "session_complete",
            serde_json::json!({}),
            "",
        )
        .await
    }

    pub async fn session_restart(&self, session: &str) -> Result<SessionState, StoreError> {
        self.publish_and_fold(
            session,
            EventType::Control,
            "session_restart",
            serde_json::json!({}),
            "",
        )
        .await
    }

    pub async fn purge_session(&self, session: &str) -> Result<(), StoreError> {
        self.bus.purge(session).await?;
        Ok(())
    }

    pub async fn subscribe(&self, session: &str) -> Result<Subscription, StoreError> {
        Ok(self.bus.subscribe(session).await?)
    }

    /// All known sessions, most recently active first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>, StoreError> {
        let mut infos = Vec::new();
        for session in self.bus.list_sessions().await? {
            let state = self.load_state(&session).await?;
            infos.push(SessionInfo::derive(&session, &state));
        }
        infos.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(infos)
    }
}
