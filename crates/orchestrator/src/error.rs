// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

use itr_hooks::HookError;
use itr_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("hook error in phase {phase}: {source}")]
    Hook {
        phase: &'static str,
        #[source]
        source: HookError,
    },

    #[error("failed to spawn agent subprocess: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("invalid hooks configuration: {0}")]
    InvalidHooksConfig(String),
}
