// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! Sequential hook execution for one phase (spec.md §4.4).

use crate::config::{Hook, HookPhase, HooksConfig};
use crate::error::HookError;
use crate::template::interpolate;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct HookRunner {
    config: HooksConfig,
}

impl HookRunner {
    pub fn new(config: HooksConfig) -> Self {
        Self { config }
    }

    /// Run every hook declared for `phase`, in order. Returns the stdout of
    /// the last hook with `pipe_output=true` (becomes `{{extra}}` in the
    /// next prompt — the orchestrator ignores this for `SessionEnd`).
    ///
    /// The first hook to fail aborts the remaining hooks in the phase
    /// (spec.md §8 Testable Property 8).
    pub async fn run_phase(
        &self,
        phase: HookPhase,
        vars: &HashMap<String, String>,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, HookError> {
        let mut piped_output = None;
        for hook in self.config.phase(phase) {
            let output = self.run_one(hook, vars, work_dir, cancel).await?;
            if hook.pipe_output {
                piped_output = Some(output);
            }
        }
        Ok(piped_output)
    }

    async fn run_one(
        &self,
        hook: &Hook,
        vars: &HashMap<String, String>,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<String, HookError> {
        let command = interpolate(&hook.command, vars);
        info!(command = %command, "running hook");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&command)
            .current_dir(work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The `select!` below drops whichever branch doesn't win —
            // on cancellation or timeout that drops the `Child` still
            // holding the spawned process; without this it keeps running
            // as an orphan instead of being killed.
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| HookError::Io {
            command: command.clone(),
            source,
        })?;

        let timeout = Duration::from_secs(hook.timeout);
        tokio::select! {
            result = tokio::time::timeout(timeout, child.wait_with_output()) => {
                match result {
                    Ok(Ok(output)) if output.status.success() => {
                        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
                    }
                    Ok(Ok(output)) => Err(HookError::Failure {
                        command,
                        message: String::from_utf8_lossy(&output.stderr).into_owned(),
                    }),
                    Ok(Err(source)) => Err(HookError::Io { command, source }),
                    Err(_elapsed) => Err(HookError::Timeout {
                        command,
                        timeout_secs: hook.timeout,
                    }),
                }
            }
            _ = cancel.cancelled() => {
                warn!(command = %command, "hook cancelled");
                Err(HookError::Cancelled { command })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Hook;

    fn config_with(phase_hooks: Vec<Hook>) -> HooksConfig {
        HooksConfig {
            version: 1,
            iteration_start: phase_hooks,
            iteration_end: Vec::new(),
            session_end: Vec::new(),
        }
    }

    #[tokio::test]
    async fn runs_hooks_in_order_and_captures_piped_output() {
        let runner = HookRunner::new(config_with(vec![
            Hook {
                command: "echo first".to_string(),
                timeout: 5,
                pipe_output: false,
            },
            Hook {
                command: "echo second".to_string(),
                timeout: 5,
                pipe_output: true,
            },
        ]));
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let output = runner
            .run_phase(HookPhase::IterationStart, &HashMap::new(), dir.path(), &cancel)
            .await
            .unwrap();
        assert_eq!(output.unwrap().trim(), "second");
    }

    #[tokio::test]
    async fn first_failure_aborts_remaining_hooks() {
        let runner = HookRunner::new(config_with(vec![
            Hook {
                command: "exit 1".to_string(),
                timeout: 5,
                pipe_output: false,
            },
            Hook {
                command: "touch should_not_run".to_string(),
                timeout: 5,
                pipe_output: false,
            },
        ]));
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let err = runner
            .run_phase(HookPhase::IterationStart, &HashMap::new(), dir.path(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Failure { .. }));
        assert!(!dir.path().join("should_not_run").exists());
    }

    #[tokio::test]
    async fn timeout_is_surfaced_as_a_distinct_error() {
        let runner = HookRunner::new(config_with(vec![Hook {
            command: "sleep 5".to_string(),
            timeout: 0,
            pipe_output: false,
        }]));
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let err = runner
            .run_phase(HookPhase::IterationStart, &HashMap::new(), dir.path(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Timeout { .. }));
    }

    #[tokio::test]
    async fn cancellation_stops_the_running_hook() {
        let runner = HookRunner::new(config_with(vec![Hook {
            command: "sleep 30".to_string(),
            timeout: 60,
            pipe_output: false,
        }]));
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel_clone.cancel();
        });
        let err = runner
            .run_phase(HookPhase::IterationStart, &HashMap::new(), dir.path(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Cancelled { .. }));
    }

    fn pid_is_alive(pid: i32) -> bool {
        std::path::Path::new(&format!("/proc/{pid}")).exists()
    }

    #[tokio::test]
    async fn cancellation_kills_the_subprocess_not_just_abandons_it() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        let runner = HookRunner::new(config_with(vec![Hook {
            command: format!("echo $$ > {} && sleep 30", pidfile.display()),
            timeout: 60,
            pipe_output: false,
        }]));
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel_clone.cancel();
        });
        let err = runner
            .run_phase(HookPhase::IterationStart, &HashMap::new(), dir.path(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Cancelled { .. }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        let pid: i32 = std::fs::read_to_string(&pidfile)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(!pid_is_alive(pid), "hook subprocess survived cancellation");
    }

    #[tokio::test]
    async fn timeout_kills_the_subprocess_not_just_abandons_it() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        let runner = HookRunner::new(config_with(vec![Hook {
            command: format!("echo $$ > {} && sleep 30", pidfile.display()),
            timeout: 1,
            pipe_output: false,
        }]));
        let cancel = CancellationToken::new();
        let err = runner
            .run_phase(HookPhase::IterationStart, &HashMap::new(), dir.path(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Timeout { .. }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        let pid: i32 = std::fs::read_to_string(&pidfile)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(!pid_is_alive(pid), "hook subprocess survived timeout");
    }
}
