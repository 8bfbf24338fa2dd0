//! Per-connection session actor.
//!
//! Each connection is one task that owns its outbox receiver and its
//! transport. The hub never touches the transport; it only queues messages.

use std::sync::Arc;

use geosync_core::{Payload, UpdateMessage};
use geosync_store::DatasetStore;

use crate::hub::{Attachment, DisconnectReason, SyncHub};
use crate::registry::ConnectionId;
use crate::transport::{Inbound, SessionTransport};

/// Drive one connection until it ends, then detach it from the hub.
///
/// Queued messages (the resync update, if any) are always written before
/// inbound frames are looked at, so a stale client gets its update before
/// the session goes idle.
pub async fn run_session<S, T>(
    hub: Arc<SyncHub<S>>,
    attachment: Attachment<S::Payload>,
    mut transport: T,
) -> DisconnectReason
where
    S: DatasetStore,
    T: SessionTransport,
{
    let Attachment {
        connection_id,
        dataset_id,
        resync,
        mut outbox,
    } = attachment;

    tracing::debug!(
        connection = %connection_id,
        dataset = %dataset_id,
        resync_sent = resync.sends_update(),
        "session started"
    );

    let reason = loop {
        tokio::select! {
            biased;

            next = outbox.recv() => match next {
                Some(message) => {
                    if let Err(reason) = forward(&mut transport, connection_id, &message).await {
                        break reason;
                    }
                }
                None => break DisconnectReason::Pruned,
            },

            inbound = transport.recv() => match inbound {
                Some(Ok(Inbound::Text(text))) => {
                    tracing::debug!(connection = %connection_id, len = text.len(), "ignoring client text frame");
                }
                Some(Ok(Inbound::Binary(bytes))) => {
                    tracing::debug!(connection = %connection_id, len = bytes.len(), "ignoring client binary frame");
                }
                Some(Ok(Inbound::Close)) | None => break DisconnectReason::ClientClosed,
                Some(Err(e)) => break DisconnectReason::ReceiveFailed(e.to_string()),
            },
        }
    };

    if reason == DisconnectReason::Pruned {
        if let Err(e) = transport.close().await {
            tracing::debug!(connection = %connection_id, error = %e, "close after prune failed");
        }
    }

    hub.detach(connection_id, &reason);
    reason
}

async fn forward<P, T>(
    transport: &mut T,
    connection_id: ConnectionId,
    message: &UpdateMessage<P>,
) -> Result<(), DisconnectReason>
where
    P: Payload,
    T: SessionTransport,
{
    let text = message
        .to_json()
        .map_err(|e| DisconnectReason::SendFailed(e.to_string()))?;

    transport
        .send_text(text)
        .await
        .map_err(|e| DisconnectReason::SendFailed(e.to_string()))?;

    tracing::trace!(connection = %connection_id, hash = %message.hash, "update sent");
    Ok(())
}
