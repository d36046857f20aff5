// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! End-to-end scenarios driving the real `Orchestrator` against a scripted
//! fake agent binary (a shell script emitting the NDJSON contract from
//! spec.md §6.3), grounded on the same "scripted subprocess" idea as
//! `oj_adapters::agent::fake::FakeAgentAdapter`, adapted to a real child
//! process since the orchestrator here supervises one directly.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use itr_bus::FileBus;
use itr_hooks::{HookRunner, HooksConfig};
use itr_orchestrator::{Orchestrator, OrchestratorConfig};
use itr_store::Store;
use itr_uibus::UiMsg;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Writes an executable shell script that emits one `text` line and one
/// `task.add`-then-`session-complete` pair is out of scope here (the
/// tool server is a separate crate); this script only exercises the
/// subprocess contract, not the tool channel.
fn write_fake_agent(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("fake-agent.sh");
    std::fs::write(
        &path,
        r#"#!/bin/sh
cat > /dev/null
echo '{"type": "text", "content": "working on it"}'
echo '{"type": "finish", "content": {"reason": "done"}}'
exit 0
"#,
    )
    .unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[tokio::test]
async fn happy_path_runs_to_max_iterations_and_completes_hooks() {
    let data_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    let bus = FileBus::open(data_dir.path()).await.unwrap();
    let store = Arc::new(Store::new(Arc::new(bus)));

    let agent_binary = write_fake_agent(work_dir.path());
    let (ui_tx, mut ui_rx) = itr_uibus::channel(64);
    let (_cmd_tx, cmd_rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();

    let config = OrchestratorConfig {
        session_name: "demo".to_string(),
        work_dir: work_dir.path().to_path_buf(),
        model: None,
        max_iterations: Some(2),
        hooks_config: HooksConfig {
            version: 1,
            ..Default::default()
        },
        agent_binary,
        tool_server_port: 0,
    };

    let hooks = HookRunner::new(config.hooks_config.clone());
    let orchestrator = Orchestrator::new(config, Arc::clone(&store), hooks, ui_tx, cmd_rx, cancel);

    let drain = tokio::spawn(async move {
        let mut saw_agent_output = false;
        while let Some(msg) = ui_rx.recv().await {
            if matches!(msg, UiMsg::AgentOutput { .. }) {
                saw_agent_output = true;
            }
        }
        saw_agent_output
    });

    orchestrator.run().await.unwrap();
    drop(drain);

    let state = store.load_state("demo").await.unwrap();
    assert_eq!(state.iterations.len(), 2);
    assert!(state.iterations.iter().all(|it| it.complete));
}

#[tokio::test]
async fn resuming_after_a_mid_iteration_crash_reopens_the_same_number() {
    let data_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    let bus = FileBus::open(data_dir.path()).await.unwrap();
    let store = Arc::new(Store::new(Arc::new(bus)));

    // Simulate a prior process that called start_iteration and then died
    // before completing it.
    store.start_iteration("demo").await.unwrap();
    let crashed = store.load_state("demo").await.unwrap();
    assert_eq!(crashed.iterations.len(), 1);
    assert!(!crashed.iterations[0].complete);

    let agent_binary = write_fake_agent(work_dir.path());
    let (ui_tx, _ui_rx) = itr_uibus::channel(64);
    let (_cmd_tx, cmd_rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();

    let config = OrchestratorConfig {
        session_name: "demo".to_string(),
        work_dir: work_dir.path().to_path_buf(),
        model: None,
        max_iterations: Some(1),
        hooks_config: HooksConfig {
            version: 1,
            ..Default::default()
        },
        agent_binary,
        tool_server_port: 0,
    };

    let hooks = HookRunner::new(config.hooks_config.clone());
    let orchestrator = Orchestrator::new(config, Arc::clone(&store), hooks, ui_tx, cmd_rx, cancel);
    orchestrator.run().await.unwrap();

    let state = store.load_state("demo").await.unwrap();
    assert_eq!(state.iterations.len(), 1);
    assert_eq!(state.iterations[0].number, 1);
    assert!(state.iterations[0].complete);
}

#[tokio::test]
async fn stop_command_halts_before_max_iterations() {
    let data_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    let bus = FileBus::open(data_dir.path()).await.unwrap();
    let store = Arc::new(Store::new(Arc::new(bus)));

    let agent_binary = write_fake_agent(work_dir.path());
    let (ui_tx, _ui_rx) = itr_uibus::channel(64);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();

    let config = OrchestratorConfig {
        session_name: "demo".to_string(),
        work_dir: work_dir.path().to_path_buf(),
        model: None,
        max_iterations: Some(1000),
        hooks_config: HooksConfig {
            version: 1,
            ..Default::default()
        },
        agent_binary,
        tool_server_port: 0,
    };

    let hooks = HookRunner::new(config.hooks_config.clone());
    let orchestrator = Orchestrator::new(config, Arc::clone(&store), hooks, ui_tx, cmd_rx, cancel);

    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let _ = cmd_tx.send(itr_orchestrator::OrchestratorCommand::Stop).await;
    });

    orchestrator.run().await.unwrap();

    let state = store.load_state("demo").await.unwrap();
    assert!(state.iterations.len() < 1000);
}
