// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("hook '{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("hook '{command}' failed: {message}")]
    Failure { command: String, message: String },

    #[error("hook '{command}' was cancelled")]
    Cancelled { command: String },

    #[error("unsupported hooks config version {0}")]
    UnsupportedVersion(u32),

    #[error("io error running hook '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
