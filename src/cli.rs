// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! Command-line surface (spec.md's out-of-scope TUI is not this binary's
//! job; this is the headless core only), grounded on `oj-cli`'s
//! `clap`-derived `Cli`/`Commands` shape.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iteratr", version, about = "Interactive iterative-agent orchestrator")]
pub struct Cli {
    /// Directory holding session logs. Defaults to `.iteratr` under the
    /// working directory of the session being acted on.
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the orchestrator loop to completion for a session.
    Run(RunArgs),
    /// List known sessions, most recently active first.
    Sessions,
    /// Purge a session's event log entirely.
    Purge {
        session: String,
    },
    /// Print a session's folded state as JSON.
    Show {
        session: String,
    },
}

#[derive(Parser)]
pub struct RunArgs {
    /// Session name; reused across runs to resume where it left off.
    #[arg(long)]
    pub session: String,

    /// Working directory the agent subprocess and hooks run in.
    #[arg(long = "work-dir")]
    pub work_dir: PathBuf,

    /// Model identifier forwarded to the agent subprocess.
    #[arg(long)]
    pub model: Option<String>,

    /// Stop after this many iterations even if the session never
    /// self-reports complete.
    #[arg(long = "max-iterations")]
    pub max_iterations: Option<u64>,

    /// Path to a hooks configuration document (spec.md §6.5).
    #[arg(long)]
    pub hooks: Option<PathBuf>,

    /// Path to the agent executable to supervise.
    #[arg(long = "agent-binary")]
    pub agent_binary: PathBuf,
}
