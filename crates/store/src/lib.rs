// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! itr-store: spec.md §2 component C. Wraps a `JournaledBus` with the
//! session-level operations named in spec.md §4.2 — task/note/inbox
//! mutation, iteration bookkeeping, and the `session_complete`
//! precondition gate — so callers never hand-assemble raw events.

mod error;
mod store;

pub use error::StoreError;
pub use store::Store;
