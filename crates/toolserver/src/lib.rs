// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! itr-toolserver: spec.md §2 component D. A length-prefixed JSON
//! request/response endpoint the agent subprocess calls back into.

mod error;
mod protocol;
mod server;
mod wire;

pub use error::ToolServerError;
pub use protocol::{ToolErrorBody, ToolRequest, ToolResponse};
pub use server::ToolServer;

#[cfg(test)]
mod tests {
    use super::*;
    use itr_bus::FileBus;
    use itr_store::Store;
    use std::sync::Arc;
    use tokio::net::TcpStream;
    use tokio_util::sync::CancellationToken;

    async fn spawn_server() -> (u16, Arc<Store>, CancellationToken, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let bus = FileBus::open(dir.path()).await.unwrap();
        let store = Arc::new(Store::new(Arc::new(bus)));
        let server = ToolServer::bind().await.unwrap();
        let port = server.port();
        let cancel = CancellationToken::new();
        tokio::spawn(server.serve("s".to_string(), Arc::clone(&store), cancel.clone()));
        (port, store, cancel, dir)
    }

    async fn roundtrip(port: u16, request: &ToolRequest) -> ToolResponse {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let encoded = wire::encode(request).unwrap();
        wire::write_message(&mut stream, &encoded).await.unwrap();
        let bytes = wire::read_message(&mut stream).await.unwrap();
        wire::decode(&bytes).unwrap()
    }

    #[tokio::test]
    async fn task_add_returns_allocated_id() {
        let (port, _store, _cancel, _dir) = spawn_server().await;
        let response = roundtrip(
            port,
            &ToolRequest::TaskAdd {
                content: "do the thing".to_string(),
                status: None,
                priority: 0,
            },
        )
        .await;
        match response {
            ToolResponse::Ok { result } => assert_eq!(result["id"], "TAS-1"),
            ToolResponse::Error { error } => panic!("unexpected error: {error:?}"),
        }
    }

    #[tokio::test]
    async fn task_list_reflects_added_tasks() {
        let (port, store, _cancel, _dir) = spawn_server().await;
        store.add_task("s", "first", 0).await.unwrap();
        let response = roundtrip(port, &ToolRequest::TaskList).await;
        match response {
            ToolResponse::Ok { result } => {
                assert_eq!(result["tasks"].as_array().unwrap().len(), 1);
            }
            ToolResponse::Error { error } => panic!("unexpected error: {error:?}"),
        }
    }

    #[tokio::test]
    async fn note_list_filters_by_type() {
        let (port, store, _cancel, _dir) = spawn_server().await;
        store.add_note("s", "careful here", "stuck").await.unwrap();
        store.add_note("s", "fyi", "tip").await.unwrap();
        let response = roundtrip(
            port,
            &ToolRequest::NoteList {
                note_type: Some("stuck".to_string()),
            },
        )
        .await;
        match response {
            ToolResponse::Ok { result } => {
                assert_eq!(result["notes"].as_array().unwrap().len(), 1);
            }
            ToolResponse::Error { error } => panic!("unexpected error: {error:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_status_is_a_schema_violation() {
        let (port, store, _cancel, _dir) = spawn_server().await;
        let state = store.add_task("s", "x", 0).await.unwrap();
        let id = *state.tasks.keys().next().unwrap();
        let response = roundtrip(
            port,
            &ToolRequest::TaskStatus {
                id,
                status: "flying".to_string(),
            },
        )
        .await;
        match response {
            ToolResponse::Error { error } => assert_eq!(error.kind, "schemaViolation"),
            ToolResponse::Ok { .. } => panic!("expected a schema violation"),
        }
    }

    #[tokio::test]
    async fn session_complete_relays_precondition_failure() {
        let (port, store, _cancel, _dir) = spawn_server().await;
        store.add_task("s", "pending", 0).await.unwrap();
        let response = roundtrip(port, &ToolRequest::SessionComplete).await;
        match response {
            ToolResponse::Error { error } => assert_eq!(error.kind, "preconditionFailure"),
            ToolResponse::Ok { .. } => panic!("expected precondition failure"),
        }
    }

    #[tokio::test]
    async fn inbox_list_returns_only_unread_messages() {
        let (port, store, _cancel, _dir) = spawn_server().await;
        store.send_message("s", "hello").await.unwrap();
        let response = roundtrip(port, &ToolRequest::InboxList).await;
        match response {
            ToolResponse::Ok { result } => {
                assert_eq!(result["messages"].as_array().unwrap().len(), 1);
            }
            ToolResponse::Error { error } => panic!("unexpected error: {error:?}"),
        }
    }
}
