// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

#[derive(Debug, thiserror::Error)]
pub enum ToolServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,
}
