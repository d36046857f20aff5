// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! Subprocess supervision for the agent (spec.md §4.5.5, §6.3).
//!
//! Grounded on `oj_adapters::subprocess::run_with_timeout`'s
//! timeout-wrapped `Command` pattern, adapted here for a long-lived child
//! whose stdout is streamed line by line rather than collected in one shot.

use itr_uibus::{UiBusSender, UiMsg};
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{error, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AgentLine {
    Text { content: String },
    ToolUse { content: ToolUseContent },
    Error { content: String },
    Finish { content: FinishContent },
}

#[derive(Debug, Deserialize)]
struct ToolUseContent {
    name: String,
    #[serde(default)]
    input: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct FinishContent {
    reason: String,
    #[serde(default)]
    error: Option<String>,
}

/// Spawn the agent, write `prompt` to stdin, stream stdout into the UI
/// bus, and wait for exit. Returns the child's exit code (`None` if it was
/// killed without reporting one, e.g. by `Stop`).
///
/// A non-zero exit surfaces only as a `None`-silenced log line and the
/// `AgentFinish` message carrying the exit code; the caller decides
/// whether that is fatal (it is not, per spec.md §4.5.5).
pub async fn run_agent(
    agent_binary: &Path,
    model: Option<&str>,
    work_dir: &Path,
    tool_server_port: u16,
    prompt: &str,
    ui: &UiBusSender,
) -> std::io::Result<Option<i32>> {
    let mut cmd = Command::new(agent_binary);
    cmd.arg("run").arg("--format").arg("json");
    if let Some(model) = model {
        cmd.arg("--model").arg(model);
    }
    cmd.current_dir(work_dir)
        .env("ITERATR_TOOL_PORT", tool_server_port.to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // `Orchestrator::run`'s select! drops this future (and `child`)
        // on `Stop`/cancellation; without this the subprocess survives as
        // an orphan (spec.md §4.5.3, §5).
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(prompt.as_bytes()).await?;
        stdin.shutdown().await?;
    }

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(std::io::Error::other(
            "agent subprocess did not expose piped stdout/stderr",
        ));
    };

    let ui_stdout = ui.clone();
    let stdout_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => forward_line(&line, &ui_stdout).await,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "error reading agent stdout");
                    break;
                }
            }
        }
    });

    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            error!(target: "agent_stderr", "{line}");
        }
    });

    let status = child.wait().await?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    let exit_code = status.code();
    ui.send(UiMsg::AgentFinish { exit_code }).await;
    Ok(exit_code)
}

async fn forward_line(line: &str, ui: &UiBusSender) {
    if line.trim().is_empty() {
        return;
    }
    match serde_json::from_str::<AgentLine>(line) {
        Ok(AgentLine::Text { content }) => ui.send(UiMsg::AgentOutput { line: content }).await,
        Ok(AgentLine::Error { content }) => {
            ui.send(UiMsg::AgentOutput {
                line: format!("[error] {content}"),
            })
            .await
        }
        Ok(AgentLine::ToolUse { content }) => {
            ui.send(UiMsg::AgentToolCall {
                tool: content.name,
                summary: content.input.to_string(),
            })
            .await
        }
        Ok(AgentLine::Finish { content }) => {
            if let Some(err) = content.error {
                ui.send(UiMsg::AgentOutput {
                    line: format!("[finish:{}] {err}", content.reason),
                })
                .await;
            }
        }
        Err(e) => {
            // Malformed lines are logged but never kill the iteration
            // (spec.md §4.5.5).
            warn!(error = %e, line, "malformed agent output line");
        }
    }
}
