// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

use itr_bus::BusError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("not found: {0}")]
    NotFound(String),
}
