//! WebSocket sessions.
//!
//! The upgrade handler validates the dataset id before accepting. Once the
//! socket is open the connection is attached to the hub and handed to the
//! session actor, which owns it until it closes.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use geosync_core::DatasetId;
use geosync_sync::{run_session, Inbound, SessionTransport, SyncError};
use serde::Deserialize;

use crate::error::ServerResult;
use crate::gateway::SharedHub;
use crate::router::AppState;

/// Query string of `GET /ws/{dataset_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Hash the client last saw.
    pub hash: Option<String>,
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> ServerResult<Response> {
    let dataset_id = state.gateway.dataset_id(&dataset_id)?;
    let hub = state.gateway.hub().clone();
    Ok(ws.on_upgrade(move |socket| serve_socket(hub, dataset_id, query.hash, socket)))
}

async fn serve_socket(hub: SharedHub, dataset_id: DatasetId, client_hash: Option<String>, socket: WebSocket) {
    let mut transport = WsTransport::new(socket);
    let attachment = match hub.attach(dataset_id.clone(), client_hash) {
        Ok(attachment) => attachment,
        Err(e) => {
            tracing::error!(dataset = %dataset_id, error = %e, "attach failed");
            if let Err(e) = transport.close().await {
                tracing::debug!(dataset = %dataset_id, error = %e, "close after failed attach failed");
            }
            return;
        }
    };
    run_session(hub, attachment, transport).await;
}

/// [`SessionTransport`] over an axum WebSocket.
///
/// Ping and pong frames are answered by axum and skipped here.
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl SessionTransport for WsTransport {
    async fn send_text(&mut self, text: String) -> geosync_sync::Result<()> {
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|e| SyncError::TransportError(e.to_string()))
    }

    async fn recv(&mut self) -> Option<geosync_sync::Result<Inbound>> {
        loop {
            let frame = match self.socket.recv().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(SyncError::TransportError(e.to_string()))),
            };
            match frame {
                Message::Text(text) => return Some(Ok(Inbound::Text(text))),
                Message::Binary(bytes) => return Some(Ok(Inbound::Binary(bytes))),
                Message::Close(_) => return Some(Ok(Inbound::Close)),
                Message::Ping(_) | Message::Pong(_) => continue,
            }
        }
    }

    async fn close(&mut self) -> geosync_sync::Result<()> {
        self.socket
            .send(Message::Close(None))
            .await
            .map_err(|e| SyncError::TransportError(e.to_string()))
    }
}
