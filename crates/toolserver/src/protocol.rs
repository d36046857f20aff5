// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! The wire messages the agent subprocess exchanges with the tool server
//! (spec.md §4.3). One request maps 1:1 onto a `itr_store::Store` operation.

use itr_core::{MessageId, TaskId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "tool", rename_all = "kebab-case")]
pub enum ToolRequest {
    TaskAdd {
        content: String,
        status: Option<String>,
        #[serde(default)]
        priority: i64,
    },
    TaskStatus {
        id: TaskId,
        status: String,
    },
    TaskList,
    TaskDepends {
        id: TaskId,
        depends_on: Vec<TaskId>,
    },
    NoteAdd {
        content: String,
        #[serde(rename = "type")]
        note_type: String,
    },
    NoteList {
        #[serde(rename = "type", default)]
        note_type: Option<String>,
    },
    InboxList,
    InboxMarkRead {
        id: MessageId,
    },
    SessionComplete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResponse {
    Ok { result: serde_json::Value },
    Error { error: ToolErrorBody },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolErrorBody {
    pub kind: String,
    pub message: String,
}

impl ToolResponse {
    pub fn ok(result: serde_json::Value) -> Self {
        ToolResponse::Ok { result }
    }

    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        ToolResponse::Error {
            error: ToolErrorBody {
                kind: kind.into(),
                message: message.into(),
            },
        }
    }
}
