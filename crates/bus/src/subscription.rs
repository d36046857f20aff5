// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! A lazy, restartable sequence of events: the backlog already on disk,
//! then live publishes (spec.md §4.2 `Subscribe`).

use itr_core::Event;
use std::collections::VecDeque;
use tokio::sync::broadcast;

pub struct Subscription {
    backlog: VecDeque<Event>,
    live: broadcast::Receiver<Event>,
}

impl Subscription {
    pub(crate) fn new(backlog: Vec<Event>, live: broadcast::Receiver<Event>) -> Self {
        Self {
            backlog: backlog.into(),
            live,
        }
    }

    /// Next event in the sequence: drains the backlog first, then awaits
    /// live publishes. Returns `None` only once the bus itself has shut
    /// down (the publisher side dropped) — under normal operation this
    /// future never resolves to `None`.
    pub async fn recv(&mut self) -> Option<Event> {
        if let Some(ev) = self.backlog.pop_front() {
            return Some(ev);
        }
        loop {
            match self.live.recv().await {
                Ok(ev) => return Some(ev),
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // A slow subscriber missed some live events. The caller
                    // already has the full backlog; skipping ahead is safe
                    // because a fresh `subscribe()` call replays from disk.
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
