// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! A file-backed `JournaledBus`: one JSONL file per session under a data
//! directory, plus a single global sequence counter shared across all
//! sessions (spec.md §3.3 invariant 6: "the bus-assigned sequence number
//! is authoritative for ordering across all types in a session" — we make
//! it authoritative bus-wide, which is a superset that still satisfies the
//! per-session requirement).

use crate::error::BusError;
use crate::subscription::Subscription;
use crate::{JournaledBus, RETENTION};
use async_trait::async_trait;
use itr_core::{codec, Event};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tracing::{debug, warn};

const LIVE_CHANNEL_CAPACITY: usize = 1024;

struct SessionHandle {
    path: PathBuf,
    sender: broadcast::Sender<Event>,
}

pub struct FileBus {
    root: PathBuf,
    next_id: Arc<AsyncMutex<u64>>,
    sessions: Arc<AsyncMutex<HashMap<String, SessionHandle>>>,
}

impl FileBus {
    /// Open (or create) a file-backed bus rooted at `root`. Scans any
    /// existing session files to recover the next sequence id, the way
    /// `oj_storage::Wal::open` scans its WAL on startup.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BusError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        let mut max_id = 0u64;
        let mut sessions = HashMap::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(session) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
            else {
                continue;
            };
            let events = Self::read_all(&path)?;
            max_id = max_id.max(events.iter().map(|e| e.id).max().unwrap_or(0));
            let (sender, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
            sessions.insert(
                session,
                SessionHandle {
                    path,
                    sender,
                },
            );
        }

        debug!(
            root = %root.display(),
            sessions = sessions.len(),
            next_id = max_id + 1,
            "file bus opened"
        );
        Ok(Self {
            root,
            next_id: Arc::new(AsyncMutex::new(max_id + 1)),
            sessions: Arc::new(AsyncMutex::new(sessions)),
        })
    }

    fn session_path(&self, session: &str) -> PathBuf {
        self.root.join(format!("{session}.jsonl"))
    }

    fn read_all(path: &Path) -> Result<Vec<Event>, BusError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();
        for (offset, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event = codec::decode(line.as_bytes()).map_err(|e| BusError::Corrupt {
                session: path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("?")
                    .to_string(),
                offset: offset as u64,
                message: e.to_string(),
            })?;
            events.push(event);
        }
        Ok(events)
    }

    /// Apply the 30-day retention window by rewriting each session file
    /// without entries older than `RETENTION`. Not called automatically —
    /// a real broker would run this as a background compaction job; here
    /// it is exposed for the orchestrator/CLI to invoke on an interval.
    pub async fn sweep_expired(&self) -> Result<(), BusError> {
        let cutoff = chrono::Utc::now() - RETENTION;
        let sessions = self.sessions.lock().await;
        for handle in sessions.values() {
            let events = Self::read_all(&handle.path)?;
            let kept: Vec<&Event> = events.iter().filter(|e| e.timestamp >= cutoff).collect();
            if kept.len() == events.len() {
                continue;
            }
            let mut file = std::fs::File::create(&handle.path)?;
            for event in kept {
                file.write_all(&codec::encode(event))?;
                file.write_all(b"\n")?;
            }
            file.sync_all()?;
        }
        Ok(())
    }
}

#[async_trait]
impl JournaledBus for FileBus {
    async fn publish(&self, mut event: Event) -> Result<Event, BusError> {
        let mut next_id = self.next_id.lock().await;
        event.id = *next_id;
        *next_id += 1;
        drop(next_id);

        let session = event.session.clone();
        let mut sessions = self.sessions.lock().await;
        let handle = sessions.entry(session.clone()).or_insert_with(|| {
            let (sender, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
            SessionHandle {
                path: self.session_path(&session),
                sender,
            }
        });

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&handle.path)?;
        file.write_all(&codec::encode(&event))?;
        file.write_all(b"\n")?;
        file.flush()?;

        // Best-effort fan-out: if nobody is subscribed yet this simply
        // has no receivers, which is not an error (at-least-once to
        // *subscribed* UI observers, per spec.md §1 Non-goals).
        let _ = handle.sender.send(event.clone());

        Ok(event)
    }

    async fn load(&self, session: &str) -> Result<Vec<Event>, BusError> {
        Self::read_all(&self.session_path(session))
    }

    async fn subscribe(&self, session: &str) -> Result<Subscription, BusError> {
        let backlog = self.load(session).await?;
        let mut sessions = self.sessions.lock().await;
        let handle = sessions.entry(session.to_string()).or_insert_with(|| {
            let (sender, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
            SessionHandle {
                path: self.session_path(session),
                sender,
            }
        });
        let receiver = handle.sender.subscribe();
        Ok(Subscription::new(backlog, receiver))
    }

    async fn purge(&self, session: &str) -> Result<(), BusError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(handle) = sessions.remove(session) {
            if handle.path.exists() {
                std::fs::remove_file(&handle.path)?;
            }
        } else {
            warn!(%session, "purge requested for a session with no open handle");
            let path = self.session_path(session);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, BusError> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itr_core::EventType;

    async fn bus() -> (FileBus, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let bus = FileBus::open(dir.path()).await.unwrap();
        (bus, dir)
    }

    #[tokio::test]
    async fn publish_assigns_monotonic_ids() {
        let (bus, _dir) = bus().await;
        let a = bus
            .publish(Event::new("s", EventType::Task, "add", serde_json::json!({}), "a"))
            .await
            .unwrap();
        let b = bus
            .publish(Event::new("s", EventType::Task, "add", serde_json::json!({}), "b"))
            .await
            .unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn load_returns_published_events_in_order() {
        let (bus, _dir) = bus().await;
        for i in 0..5 {
            bus.publish(Event::new(
                "s",
                EventType::Task,
                "add",
                serde_json::json!({}),
                format!("t{i}"),
            ))
            .await
            .unwrap();
        }
        let loaded = bus.load("s").await.unwrap();
        assert_eq!(loaded.len(), 5);
        let ids: Vec<u64> = loaded.iter().map(|e| e.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn purge_removes_only_the_target_session() {
        let (bus, _dir) = bus().await;
        bus.publish(Event::new("a", EventType::Task, "add", serde_json::json!({}), "x"))
            .await
            .unwrap();
        bus.publish(Event::new("b", EventType::Task, "add", serde_json::json!({}), "y"))
            .await
            .unwrap();
        bus.purge("a").await.unwrap();
        assert!(bus.load("a").await.unwrap().is_empty());
        assert_eq!(bus.load("b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reopening_recovers_next_id_above_existing_max() {
        let dir = tempfile::tempdir().unwrap();
        {
            let bus = FileBus::open(dir.path()).await.unwrap();
            bus.publish(Event::new("s", EventType::Task, "add", serde_json::json!({}), "a"))
                .await
                .unwrap();
        }
        let bus2 = FileBus::open(dir.path()).await.unwrap();
        let ev = bus2
            .publish(Event::new("s", EventType::Task, "add", serde_json::json!({}), "b"))
            .await
            .unwrap();
        assert!(ev.id > 1);
    }

    #[tokio::test]
    async fn subscribe_replays_backlog_then_live_publishes() {
        let (bus, _dir) = bus().await;
        bus.publish(Event::new("s", EventType::Task, "add", serde_json::json!({}), "backlog"))
            .await
            .unwrap();
        let mut sub = bus.subscribe("s").await.unwrap();
        let first = sub.recv().await.unwrap();
        assert_eq!(first.data, "backlog");

        let bus = Arc::new(bus);
        let bus2 = Arc::clone(&bus);
        tokio::spawn(async move {
            bus2.publish(Event::new("s", EventType::Task, "add", serde_json::json!({}), "live"))
                .await
                .unwrap();
        });
        let second = sub.recv().await.unwrap();
        assert_eq!(second.data, "live");
    }

    #[tokio::test]
    async fn list_sessions_enumerates_published_subjects() {
        let (bus, _dir) = bus().await;
        bus.publish(Event::new("a", EventType::Task, "add", serde_json::json!({}), "x"))
            .await
            .unwrap();
        bus.publish(Event::new("b", EventType::Task, "add", serde_json::json!({}), "y"))
            .await
            .unwrap();
        let mut sessions = bus.list_sessions().await.unwrap();
        sessions.sort();
        assert_eq!(sessions, vec!["a".to_string(), "b".to_string()]);
    }
}
