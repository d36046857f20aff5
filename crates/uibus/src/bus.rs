// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! A bounded single-producer/multi-consumer-ish queue (in practice one
//! consumer, the UI's cooperative update loop) with a drop-oldest policy
//! scoped to `AgentOutput` messages only.
//!
//! Modeled on the wake-signal-plus-shared-buffer shape of
//! `oj_daemon::event_bus::EventBus`/`EventReader`, but the shared buffer
//! here is an in-memory ring rather than a WAL, since UI delivery is
//! explicitly best-effort (spec.md §1 Non-goals).

use crate::msg::UiMsg;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tracing::warn;

struct Shared {
    queue: Mutex<VecDeque<UiMsg>>,
    notify: Notify,
    capacity: usize,
}

#[derive(Clone)]
pub struct UiBusSender {
    shared: Arc<Shared>,
}

pub struct UiBusReceiver {
    shared: Arc<Shared>,
}

/// Create a bounded UI bus. `capacity` bounds the backlog of droppable
/// (`AgentOutput`) messages; non-droppable messages are always delivered
/// even if that means briefly exceeding `capacity`.
pub fn channel(capacity: usize) -> (UiBusSender, UiBusReceiver) {
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::new()),
        notify: Notify::new(),
        capacity,
    });
    (
        UiBusSender {
            shared: Arc::clone(&shared),
        },
        UiBusReceiver { shared },
    )
}

impl UiBusSender {
    pub async fn send(&self, msg: UiMsg) {
        let mut queue = self.shared.queue.lock().await;
        if queue.len() >= self.shared.capacity {
            if let Some(pos) = queue.iter().position(UiMsg::is_droppable) {
                queue.remove(pos);
            } else if msg.is_droppable() {
                // No room and nothing droppable to evict: drop the
                // incoming message itself rather than grow unboundedly.
                warn!("ui bus full of non-droppable messages; dropping agent output");
                return;
            }
        }
        queue.push_back(msg);
        drop(queue);
        self.shared.notify.notify_one();
    }
}

impl UiBusReceiver {
    pub async fn recv(&mut self) -> Option<UiMsg> {
        loop {
            {
                let mut queue = self.shared.queue.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Some(msg);
                }
            }
            self.shared.notify.notified().await;
        }
    }
}
