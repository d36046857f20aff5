// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

use itr_hooks::HooksConfig;
use std::path::PathBuf;

/// `{ session_name, work_dir, model, max_iterations, hooks_config }`
/// (spec.md §4.5).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub session_name: String,
    pub work_dir: PathBuf,
    pub model: Option<String>,
    pub max_iterations: Option<u64>,
    pub hooks_config: HooksConfig,
    /// Path to the agent executable (spec.md §6.3 subprocess contract).
    pub agent_binary: PathBuf,
    pub tool_server_port: u16,
}
