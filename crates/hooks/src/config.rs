// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! The versioned hooks configuration document (spec.md §6.5).

use crate::error::HookError;
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    IterationStart,
    IterationEnd,
    SessionEnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    pub command: String,
    pub timeout: u64,
    #[serde(default)]
    pub pipe_output: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksConfig {
    pub version: u32,
    #[serde(default)]
    pub iteration_start: Vec<Hook>,
    #[serde(default)]
    pub iteration_end: Vec<Hook>,
    #[serde(default)]
    pub session_end: Vec<Hook>,
}

impl HooksConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Rejects unknown versions at load time (spec.md §6.5, §7 `schemaViolation`).
    pub fn validate(&self) -> Result<(), HookError> {
        if self.version != CURRENT_VERSION {
            return Err(HookError::UnsupportedVersion(self.version));
        }
        Ok(())
    }

    pub fn phase(&self, phase: HookPhase) -> &[Hook] {
        match phase {
            HookPhase::IterationStart => &self.iteration_start,
            HookPhase::IterationEnd => &self.iteration_end,
            HookPhase::SessionEnd => &self.session_end,
        }
    }
}
