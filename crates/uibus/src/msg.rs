// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

use itr_core::SessionState;

/// Everything a UI observer can receive (spec.md §4.6).
#[derive(Debug, Clone)]
pub enum UiMsg {
    StateUpdate(Box<SessionState>),
    IterationStart { number: u64 },
    AgentOutput { line: String },
    AgentToolCall { tool: String, summary: String },
    AgentFinish { exit_code: Option<i32> },
    PauseState { paused: bool, pending: bool },
    SessionComplete,
}

impl UiMsg {
    /// Only `AgentOutput` is ever dropped under back-pressure (spec.md
    /// §4.6: "`StateUpdateMsg` and lifecycle messages are never dropped").
    pub fn is_droppable(&self) -> bool {
        matches!(self, UiMsg::AgentOutput { .. })
    }
}
