// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! The tool server: accepts connections from the agent subprocess and
//! translates each request into a `Store` call (spec.md §4.3).

use crate::error::ToolServerError;
use crate::protocol::{ToolRequest, ToolResponse};
use crate::wire::{read_message, write_message};
use itr_store::{Store, StoreError};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

const KNOWN_STATUSES: &[&str] = &["remaining", "in_progress", "completed", "blocked", "cancelled"];
const KNOWN_NOTE_TYPES: &[&str] = &["learning", "stuck", "tip", "decision"];

pub struct ToolServer {
    listener: TcpListener,
    addr: std::net::SocketAddr,
}

impl ToolServer {
    /// Bind to an OS-assigned local port (spec.md §4.3: "request port 0 on
    /// each start so that multiple orchestrators may run concurrently").
    pub async fn bind() -> Result<Self, ToolServerError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Serve requests for `session` until `cancel` is triggered or the
    /// socket is closed. One task per accepted connection; each handles
    /// requests serially but multiple connections may be in flight,
    /// relying on the bus to serialize writes (spec.md §5 "Parallelism").
    pub async fn serve(
        self,
        session: String,
        store: Arc<Store>,
        cancel: tokio_util::sync::CancellationToken,
    ) {
        info!(port = self.port(), %session, "tool server listening");
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(error = %e, "tool server accept failed");
                            continue;
                        }
                    };
                    debug!(%peer, "tool server connection accepted");
                    let store = Arc::clone(&store);
                    let session = session.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, session, store).await {
                            warn!(error = %e, "tool server connection ended with error");
                        }
                    });
                }
                _ = cancel.cancelled() => {
                    info!("tool server shutting down");
                    return;
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    session: String,
    store: Arc<Store>,
) -> Result<(), ToolServerError> {
    loop {
        let bytes = match read_message(&mut stream).await {
            Ok(bytes) => bytes,
            Err(ToolServerError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };
        let response = match crate::wire::decode::<ToolRequest>(&bytes) {
            Ok(request) => dispatch(&session, &store, request).await,
            Err(e) => ToolResponse::error("schemaViolation", e.to_string()),
        };
        let encoded = crate::wire::encode(&response)?;
        write_message(&mut stream, &encoded).await?;
    }
}

async fn dispatch(session: &str, store: &Store, request: ToolRequest) -> ToolResponse {
    match request {
        ToolRequest::TaskAdd { content, status, priority } => {
            if let Some(status) = &status {
                if !KNOWN_STATUSES.contains(&status.as_str()) {
                    return ToolResponse::error(
                        "schemaViolation",
                        format!("unknown status '{status}'"),
                    );
                }
            }
            match store
                .add_task_with_status(session, content, status.as_deref(), priority)
                .await
            {
                Ok(state) => {
                    let id = state.tasks.keys().max().map(|id| id.to_string());
                    ToolResponse::ok(serde_json::json!({ "id": id }))
                }
                Err(e) => store_error(e),
            }
        }
        ToolRequest::TaskStatus { id, status } => {
            if !KNOWN_STATUSES.contains(&status.as_str()) {
                return ToolResponse::error("schemaViolation", format!("unknown status '{status}'"));
            }
            match store.set_task_status(session, id, &status).await {
                Ok(_) => ToolResponse::ok(serde_json::json!({ "id": id.to_string() })),
                Err(e) => store_error(e),
            }
        }
        ToolRequest::TaskList => match store.load_state(session).await {
            Ok(state) => {
                let tasks: Vec<serde_json::Value> = state
                    .tasks
                    .values()
                    .map(|t| {
                        serde_json::json!({
                            "id": t.id.to_string(),
                            "content": t.content,
                            "status": t.status,
                            "priority": t.priority,
                        })
                    })
                    .collect();
                ToolResponse::ok(serde_json::json!({ "tasks": tasks }))
            }
            Err(e) => store_error(e),
        },
        ToolRequest::TaskDepends { id, depends_on } => {
            match store.set_task_depends(session, id, &depends_on).await {
                Ok(_) => ToolResponse::ok(serde_json::json!({ "id": id.to_string() })),
                Err(e) => store_error(e),
            }
        }
        ToolRequest::NoteAdd { content, note_type } => {
            if !KNOWN_NOTE_TYPES.contains(&note_type.as_str()) {
                return ToolResponse::error(
                    "schemaViolation",
                    format!("unknown note type '{note_type}'"),
                );
            }
            match store.add_note(session, content, &note_type).await {
                Ok(state) => {
                    let id = state.notes.keys().max().map(|id| id.to_string());
                    ToolResponse::ok(serde_json::json!({ "id": id }))
                }
                Err(e) => store_error(e),
            }
        }
        ToolRequest::NoteList { note_type } => match store.load_state(session).await {
            Ok(state) => {
                let notes: Vec<serde_json::Value> = state
                    .notes
                    .values()
                    .filter(|n| {
                        note_type
                            .as_deref()
                            .map(|want| serde_json::json!(n.note_type) == serde_json::json!(want))
                            .unwrap_or(true)
                    })
                    .map(|n| {
                        serde_json::json!({
                            "id": n.id.to_string(),
                            "content": n.content,
                            "type": n.note_type,
                            "iteration": n.iteration,
                        })
                    })
                    .collect();
                ToolResponse::ok(serde_json::json!({ "notes": notes }))
            }
            Err(e) => store_error(e),
        },
        ToolRequest::InboxList => match store.load_state(session).await {
            Ok(state) => {
                let unread: Vec<serde_json::Value> = state
                    .unread_inbox()
                    .into_iter()
                    .map(|m| serde_json::json!({ "id": m.id.0, "content": m.content }))
                    .collect();
                ToolResponse::ok(serde_json::json!({ "messages": unread }))
            }
            Err(e) => store_error(e),
        },
        ToolRequest::InboxMarkRead { id } => match store.mark_message_read(session, id).await {
            Ok(_) => ToolResponse::ok(serde_json::json!({ "id": id.0 })),
            Err(e) => store_error(e),
        },
        ToolRequest::SessionComplete => match store.session_complete(session).await {
            Ok(_) => ToolResponse::ok(serde_json::json!({})),
            Err(e @ StoreError::PreconditionFailed(_)) => {
                ToolResponse::error("preconditionFailure", e.to_string())
            }
            Err(e) => store_error(e),
        },
    }
}

fn store_error(e: StoreError) -> ToolResponse {
    error!(error = %e, "store operation failed");
    match e {
        StoreError::PreconditionFailed(_) => ToolResponse::error("preconditionFailure", e.to_string()),
        StoreError::NotFound(_) => ToolResponse::error("notFound", e.to_string()),
        StoreError::Bus(_) => ToolResponse::error("busFailure", e.to_string()),
    }
}
