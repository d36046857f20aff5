// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! itr-bus: the abstract `JournaledBus` (spec.md §2 component A) and a
//! file-backed implementation.
//!
//! The embedded pub/sub broker itself is out of scope (spec.md §1); this
//! crate only needs to provide the four operations spec.md names: publish,
//! subject-filtered consume (`load`/`subscribe`), per-subject purge, and
//! subject enumeration (`list_sessions`). The file-backed implementation
//! is one JSONL file per session under a data directory, grounded on
//! `oj_storage::Wal`'s scan-on-open approach (a synchronous `BufReader`
//! line scan to recover `write_seq`), but simplified: one append + flush
//! per publish rather than group-commit batching, since an iteration
//! orchestrator publishes at most a few events per second, not per
//! millisecond.

mod error;
mod file_bus;
mod subscription;

pub use error::BusError;
pub use file_bus::FileBus;
pub use subscription::Subscription;

use async_trait::async_trait;
use itr_core::Event;

/// Retention window advertised by spec.md §3.1/§6.1. The file-backed bus
/// does not physically enforce this on every read (that would make old
/// sessions silently lose history mid-test); `FileBus::sweep_expired`
/// applies it explicitly, the way a retention job would in a real broker.
pub const RETENTION: chrono::Duration = chrono::Duration::days(30);

/// Abstract durable, subject-addressed log (spec.md §1, "JournaledBus").
#[async_trait]
pub trait JournaledBus: Send + Sync {
    /// Publish an event. The bus assigns `id` (monotonic, unique across
    /// the whole bus) and fills `timestamp` if the caller left it unset.
    /// Returns the published event (with `id`/`timestamp` filled in).
    async fn publish(&self, event: Event) -> Result<Event, BusError>;

    /// All events for `session`, in bus (id) order, from the start.
    async fn load(&self, session: &str) -> Result<Vec<Event>, BusError>;

    /// A restartable view: the backlog already on disk, then live
    /// publishes for this session as they happen.
    async fn subscribe(&self, session: &str) -> Result<Subscription, BusError>;

    /// Purge subject `iteratr.<session>.>` entirely.
    async fn purge(&self, session: &str) -> Result<(), BusError>;

    /// Enumerate known sessions (subjects seen under `iteratr.>`).
    async fn list_sessions(&self) -> Result<Vec<String>, BusError>;
}
