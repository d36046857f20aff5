// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! iteratr - headless iterative-agent orchestrator core.
//!
//! This binary implements the engine only (spec.md's TUI is explicitly
//! out of scope); `run` drives a session to completion with no operator
//! UI attached beyond Ctrl-C, which is wired to the same `Stop` command
//! an interactive front end would send over `itr-orchestrator`'s command
//! channel.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, RunArgs};
use itr_bus::FileBus;
use itr_hooks::{HookRunner, HooksConfig};
use itr_orchestrator::{Orchestrator, OrchestratorCommand, OrchestratorConfig};
use itr_store::Store;
use itr_toolserver::ToolServer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    setup_logging();
    if let Err(err) = run().await {
        eprintln!("Error: {}", format_error(&err));
        std::process::exit(1);
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Deduplicates anyhow's source chain the way `oj-cli`'s `format_error` does.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }
    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_session(args, cli.data_dir).await,
        Commands::Sessions => list_sessions(cli.data_dir).await,
        Commands::Purge { session } => purge_session(cli.data_dir, &session).await,
        Commands::Show { session } => show_session(cli.data_dir, &session).await,
    }
}

/// `.iteratr` under the given root, or the current directory if no root
/// was supplied — iteratr has no multi-project namespace concept, so a
/// single data directory per working tree is enough.
fn resolve_data_dir(explicit: Option<PathBuf>, fallback_root: &Path) -> PathBuf {
    explicit.unwrap_or_else(|| fallback_root.join(".iteratr"))
}

async fn open_store(data_dir: &Path) -> Result<Arc<Store>> {
    let bus = FileBus::open(data_dir)
        .await
        .with_context(|| format!("failed to open event log at {}", data_dir.display()))?;
    Ok(Arc::new(Store::new(Arc::new(bus))))
}

async fn run_session(args: RunArgs, data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = resolve_data_dir(data_dir, &args.work_dir);
    let store = open_store(&data_dir).await?;

    let hooks_config = match &args.hooks {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read hooks config at {}", path.display()))?;
            HooksConfig::from_json(&bytes).context("hooks config is not valid JSON")?
        }
        None => HooksConfig {
            version: itr_hooks::CURRENT_VERSION,
            ..Default::default()
        },
    };
    hooks_config
        .validate()
        .context("hooks configuration refused at startup")?;

    let tool_server = ToolServer::bind()
        .await
        .context("failed to bind tool server")?;
    let tool_server_port = tool_server.port();
    let tool_cancel = CancellationToken::new();
    let tool_server_task = tokio::spawn(tool_server.serve(
        args.session.clone(),
        Arc::clone(&store),
        tool_cancel.clone(),
    ));

    let (ui_tx, ui_rx) = itr_uibus::channel(256);
    let ui_drain = tokio::spawn(drain_ui_bus(ui_rx));

    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let orchestrator_cancel = CancellationToken::new();

    let ctrlc_commands = cmd_tx.clone();
    let ctrlc_cancel = orchestrator_cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, stopping orchestrator");
            let _ = ctrlc_commands.send(OrchestratorCommand::Stop).await;
            ctrlc_cancel.cancel();
        }
    });

    let hooks = HookRunner::new(hooks_config.clone());
    let config = OrchestratorConfig {
        session_name: args.session.clone(),
        work_dir: args.work_dir,
        model: args.model,
        max_iterations: args.max_iterations,
        hooks_config,
        agent_binary: args.agent_binary,
        tool_server_port,
    };

    let orchestrator = Orchestrator::new(
        config,
        Arc::clone(&store),
        hooks,
        ui_tx,
        cmd_rx,
        orchestrator_cancel,
    );

    let result = orchestrator.run().await;

    tool_cancel.cancel();
    let _ = tool_server_task.await;
    drop(cmd_tx);
    let _ = ui_drain.await;

    result.context("orchestrator loop failed")?;
    Ok(())
}

/// Headless drain: nothing renders this output (the TUI is out of
/// scope), so it is logged at debug level to keep `run` quiet by default.
async fn drain_ui_bus(mut ui_rx: itr_uibus::UiBusReceiver) {
    while let Some(msg) = ui_rx.recv().await {
        match msg {
            itr_uibus::UiMsg::AgentOutput { line } => tracing::debug!(%line, "agent output"),
            other => tracing::debug!(?other, "ui event"),
        }
    }
}

async fn list_sessions(data_dir: Option<PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let data_dir = resolve_data_dir(data_dir, &cwd);
    let store = open_store(&data_dir).await?;
    let sessions = store.list_sessions().await.context("failed to list sessions")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&sessions).context("failed to serialize session list")?
    );
    Ok(())
}

async fn purge_session(data_dir: Option<PathBuf>, session: &str) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let data_dir = resolve_data_dir(data_dir, &cwd);
    let store = open_store(&data_dir).await?;
    store
        .purge_session(session)
        .await
        .with_context(|| format!("failed to purge session '{session}'"))?;
    warn!(%session, "session purged");
    Ok(())
}

async fn show_session(data_dir: Option<PathBuf>, session: &str) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let data_dir = resolve_data_dir(data_dir, &cwd);
    let store = open_store(&data_dir).await?;
    let state = store
        .load_state(session)
        .await
        .with_context(|| format!("failed to load session '{session}'"))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&state).context("failed to serialize session state")?
    );
    Ok(())
}
