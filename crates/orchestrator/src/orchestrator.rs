// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::prompt;
use crate::state::{OrchestratorCommand, OrchestratorState};
use crate::subprocess::run_agent;
use itr_hooks::{HookPhase, HookRunner};
use itr_store::Store;
use itr_uibus::{UiBusSender, UiMsg};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Orchestrator {
    config: OrchestratorConfig,
    store: Arc<Store>,
    hooks: HookRunner,
    ui: UiBusSender,
    commands: mpsc::Receiver<OrchestratorCommand>,
    cancel: CancellationToken,

    agent_busy: bool,
    pause_requested: bool,
    message_queue: VecDeque<String>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<Store>,
        hooks: HookRunner,
        ui: UiBusSender,
        commands: mpsc::Receiver<OrchestratorCommand>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            store,
            hooks,
            ui,
            commands,
            cancel,
            agent_busy: false,
            pause_requested: false,
            message_queue: VecDeque::new(),
        }
    }

    /// Drive the full state machine to `Done` (spec.md §4.5.1–§4.5.4).
    ///
    /// Resumes numbering from the session's folded state: if the last
    /// recorded iteration never completed (a mid-iteration crash), the
    /// counter is seeded so the first loop pass re-opens that same number
    /// rather than skipping ahead (spec.md §9 design note 1).
    pub async fn run(mut self) -> Result<(), OrchestratorError> {
        let session = self.config.session_name.clone();
        let resumed = self.store.load_state(&session).await?;
        let mut iteration: u64 = resumed.iterations.iter().filter(|it| it.complete).count() as u64;
        let mut extra: Option<String> = None;

        'iterations: loop {
            if self.cancel.is_cancelled() {
                break;
            }

            iteration += 1;
            self.store.start_iteration(&session).await?;
            self.ui.send(UiMsg::IterationStart { number: iteration }).await;
            let vars = self.hook_vars(iteration);

            if let Err(source) = self
                .hooks
                .run_phase(HookPhase::IterationStart, &vars, &self.config.work_dir, &self.cancel)
                .await
            {
                warn!(error = %source, "iteration_start hooks failed");
                self.store
                    .complete_iteration(&session, Some("hook failure".to_string()))
                    .await?;
                if self.should_terminate(&session, iteration).await? {
                    break 'iterations;
                }
                if self.wait_if_paused().await {
                    break 'iterations;
                }
                continue;
            }

            let folded = self.store.load_state(&session).await?;
            self.ui
                .send(UiMsg::StateUpdate(Box::new(folded.clone())))
                .await;

            let queued: Vec<String> = self.message_queue.drain(..).collect();
            for msg in &queued {
                self.store.send_message(&session, msg.clone()).await?;
            }

            let rendered = prompt::render(&session, iteration, &folded, &queued, extra.as_deref());

            self.agent_busy = true;
            let model = self.config.model.clone();
            let run_result = tokio::select! {
                result = run_agent(
                    &self.config.agent_binary,
                    model.as_deref(),
                    &self.config.work_dir,
                    self.config.tool_server_port,
                    &rendered,
                    &self.ui,
                ) => Some(result),
                _ = self.cancel.cancelled() => None,
            };
            self.agent_busy = false;

            let Some(run_result) = run_result else {
                break 'iterations;
            };
            if let Some(code) = run_result? {
                if code != 0 {
                    warn!(code, "agent subprocess exited non-zero");
                }
            }

            extra = self
                .hooks
                .run_phase(HookPhase::IterationEnd, &vars, &self.config.work_dir, &self.cancel)
                .await
                .unwrap_or_else(|source| {
                    warn!(error = %source, "iteration_end hooks failed");
                    None
                });

            self.store
                .complete_iteration(&session, Some(format!("iteration {iteration} complete")))
                .await?;

            if self.should_terminate(&session, iteration).await? {
                break 'iterations;
            }
            if self.wait_if_paused().await {
                break 'iterations;
            }
        }

        let vars = self.hook_vars(iteration);
        if let Err(source) = self
            .hooks
            .run_phase(HookPhase::SessionEnd, &vars, &self.config.work_dir, &self.cancel)
            .await
        {
            warn!(error = %source, "session_end hooks failed (best effort)");
        }
        info!(%session, "orchestrator reached Done");
        Ok(())
    }

    fn hook_vars(&self, iteration: u64) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("session".to_string(), self.config.session_name.clone());
        vars.insert("iteration".to_string(), iteration.to_string());
        vars.insert(
            "work_dir".to_string(),
            self.config.work_dir.display().to_string(),
        );
        vars
    }

    /// Step 10: `control.session_complete` observed, `max_iterations`
    /// reached, or `Stop` requested.
    async fn should_terminate(&mut self, session: &str, iteration: u64) -> Result<bool, OrchestratorError> {
        self.drain_commands();
        if self.cancel.is_cancelled() {
            return Ok(true);
        }
        let state = self.store.load_state(session).await?;
        if state.control.complete {
            self.ui.send(UiMsg::SessionComplete).await;
            return Ok(true);
        }
        if let Some(max) = self.config.max_iterations {
            if iteration >= max {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Drain pending operator commands without blocking. `SendMessage` is
    /// recorded in the log by `Store::send_message` the moment it is
    /// drained into the queue below; enqueue-time recording (spec.md
    /// §4.7) happens here too, so the message is never lost to an
    /// in-between `Stop`.
    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply_command(command);
        }
    }

    fn apply_command(&mut self, command: OrchestratorCommand) {
        match command {
            OrchestratorCommand::RequestPause => self.pause_requested = true,
            OrchestratorCommand::CancelPause => self.pause_requested = false,
            OrchestratorCommand::Resume => self.pause_requested = false,
            OrchestratorCommand::Stop => self.cancel.cancel(),
            OrchestratorCommand::SendMessage(text) => self.message_queue.push_back(text),
        }
    }

    /// Step 11: if paused, block until Resume, Cancel-pause, or Stop
    /// (spec.md §4.5.3). Returns `true` if the loop should exit.
    async fn wait_if_paused(&mut self) -> bool {
        if !self.pause_requested {
            return false;
        }
        self.ui
            .send(UiMsg::PauseState {
                paused: true,
                pending: false,
            })
            .await;
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(OrchestratorCommand::Stop) => {
                            self.cancel.cancel();
                            return true;
                        }
                        Some(OrchestratorCommand::Resume) | Some(OrchestratorCommand::CancelPause) => {
                            self.pause_requested = false;
                            self.ui
                                .send(UiMsg::PauseState { paused: false, pending: false })
                                .await;
                            return false;
                        }
                        Some(other) => self.apply_command(other),
                        None => return true,
                    }
                }
                _ = self.cancel.cancelled() => return true,
            }
        }
    }
}

pub struct OrchestratorHandle {
    pub commands: mpsc::Sender<OrchestratorCommand>,
    pub cancel: CancellationToken,
}

pub fn state_label(state: OrchestratorState) -> &'static str {
    match state {
        OrchestratorState::Idle => "idle",
        OrchestratorState::Running => "running",
        OrchestratorState::Paused => "paused",
        OrchestratorState::Stopping => "stopping",
        OrchestratorState::Done => "done",
    }
}
