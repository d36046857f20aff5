// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! Default prompt rendering (spec.md §4.5.2 step 3: "the template engine is
//! out of scope — it is a pure function"). A minimal but complete variable
//! substitution over the folded state, queued messages, and the last
//! `iteration_end` hook's piped output (`{{extra}}`).

use itr_core::SessionState;

pub fn render(
    session: &str,
    iteration: u64,
    state: &SessionState,
    queued_messages: &[String],
    extra: Option<&str>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("Session: {session}\nIteration: {iteration}\n\n"));

    if !state.tasks.is_empty() {
        out.push_str("Tasks:\n");
        for task in state.tasks.values() {
            out.push_str(&format!(
                "- {} [{:?}] {}\n",
                task.id, task.status, task.content
            ));
        }
        out.push('\n');
    }

    if !state.notes.is_empty() {
        out.push_str("Notes:\n");
        for note in state.notes.values() {
            out.push_str(&format!("- {} ({:?}): {}\n", note.id, note.note_type, note.content));
        }
        out.push('\n');
    }

    if !queued_messages.is_empty() {
        out.push_str("Operator messages:\n");
        for msg in queued_messages {
            out.push_str(&format!("- {msg}\n"));
        }
        out.push('\n');
    }

    if let Some(extra) = extra {
        if !extra.trim().is_empty() {
            out.push_str(&format!("{extra}\n"));
        }
    }

    out
}
