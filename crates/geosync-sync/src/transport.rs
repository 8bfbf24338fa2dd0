//! Transport abstraction for client sessions.
//!
//! A session only needs to push text frames to one client and notice when
//! that client goes away. The server implements this for axum's WebSocket;
//! tests use the in-memory pair below.

use async_trait::async_trait;

use crate::error::Result;

/// A frame received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
    /// The client asked to close the connection.
    Close,
}

/// One client connection, seen from the server.
#[async_trait]
pub trait SessionTransport: Send {
    /// Send a text frame.
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Receive the next frame. `None` means the stream ended.
    async fn recv(&mut self) -> Option<Result<Inbound>>;

    /// Close the connection from the server side.
    async fn close(&mut self) -> Result<()>;
}

/// An in-memory transport for testing.
///
/// [`pair`](memory::pair) returns the server half, to hand to a session,
/// and a [`MemoryClient`](memory::MemoryClient) that plays the remote peer.
pub mod memory {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    use crate::error::SyncError;

    #[derive(Default)]
    struct Flags {
        fail_sends: AtomicBool,
        closed_by_server: AtomicBool,
    }

    /// Server half of an in-memory connection.
    pub struct MemoryTransport {
        to_client: mpsc::UnboundedSender<String>,
        from_client: mpsc::UnboundedReceiver<Result<Inbound>>,
        flags: Arc<Flags>,
    }

    /// Client half of an in-memory connection.
    pub struct MemoryClient {
        received: mpsc::UnboundedReceiver<String>,
        to_server: Option<mpsc::UnboundedSender<Result<Inbound>>>,
        flags: Arc<Flags>,
    }

    /// Create a connected transport/client pair.
    pub fn pair() -> (MemoryTransport, MemoryClient) {
        let (to_client, received) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let flags = Arc::new(Flags::default());

        (
            MemoryTransport {
                to_client,
                from_client,
                flags: Arc::clone(&flags),
            },
            MemoryClient {
                received,
                to_server: Some(to_server),
                flags,
            },
        )
    }

    #[async_trait]
    impl SessionTransport for MemoryTransport {
        async fn send_text(&mut self, text: String) -> Result<()> {
            if self.flags.fail_sends.load(Ordering::SeqCst) {
                return Err(SyncError::TransportError("connection reset".into()));
            }
            self.to_client
                .send(text)
                .map_err(|_| SyncError::TransportError("client gone".into()))
        }

        async fn recv(&mut self) -> Option<Result<Inbound>> {
            self.from_client.recv().await
        }

        async fn close(&mut self) -> Result<()> {
            self.flags.closed_by_server.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    impl MemoryClient {
        /// Wait for the next text frame from the server.
        ///
        /// Returns `None` once the server half has been dropped.
        pub async fn next_text(&mut self) -> Option<String> {
            self.received.recv().await
        }

        /// Take a text frame if one is already queued.
        pub fn try_next_text(&mut self) -> Option<String> {
            self.received.try_recv().ok()
        }

        /// Send a text frame to the server.
        pub fn send_text(&self, text: impl Into<String>) {
            self.push(Ok(Inbound::Text(text.into())));
        }

        /// Inject a receive error on the server side.
        pub fn inject_error(&self, message: impl Into<String>) {
            self.push(Err(SyncError::TransportError(message.into())));
        }

        /// Send a close frame.
        pub fn close(&self) {
            self.push(Ok(Inbound::Close));
        }

        /// End the stream without a close frame, as a dropped TCP connection would.
        pub fn disconnect(&mut self) {
            self.to_server = None;
        }

        /// Make every further server send fail.
        pub fn fail_sends(&self) {
            self.flags.fail_sends.store(true, Ordering::SeqCst);
        }

        /// Whether the server closed the connection.
        pub fn closed_by_server(&self) -> bool {
            self.flags.closed_by_server.load(Ordering::SeqCst)
        }

        fn push(&self, frame: Result<Inbound>) {
            if let Some(tx) = &self.to_server {
                let _ = tx.send(frame);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::pair;
    use super::*;

    #[tokio::test]
    async fn test_memory_pair_roundtrip() {
        let (mut server, mut client) = pair();

        server.send_text("hello".into()).await.unwrap();
        assert_eq!(client.next_text().await.as_deref(), Some("hello"));

        client.send_text("ping");
        assert_eq!(server.recv().await.unwrap().unwrap(), Inbound::Text("ping".into()));

        client.close();
        assert_eq!(server.recv().await.unwrap().unwrap(), Inbound::Close);

        client.disconnect();
        assert!(server.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_memory_send_failure() {
        let (mut server, client) = pair();
        client.fail_sends();
        assert!(server.send_text("x".into()).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_close_flag() {
        let (mut server, client) = pair();
        assert!(!client.closed_by_server());
        server.close().await.unwrap();
        assert!(client.closed_by_server());
    }
}
