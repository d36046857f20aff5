// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

use itr_core::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("corrupt entry at offset {offset} in {session}: {message}")]
    Corrupt {
        session: String,
        offset: u64,
        message: String,
    },

    #[error("subscription failure: {0}")]
    Subscription(String),
}
