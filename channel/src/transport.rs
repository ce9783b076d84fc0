use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::ChannelError;
use crate::ConnectionState;

/// Opens sockets for a [`crate::Channel`].
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Socket: Socket + 'static;

    /// Health check performed before every connection attempt. A failure is
    /// handled exactly like a socket close.
    async fn probe(&self) -> Result<(), ChannelError>;

    async fn connect(&self) -> Result<Self::Socket, ChannelError>;
}

/// One live text-frame socket.
#[async_trait]
pub trait Socket: Send {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError>;

    /// Next inbound text frame, or `None` once the peer closed the socket.
    async fn recv_text(&mut self) -> Option<Result<String, ChannelError>>;

    async fn close(&mut self);
}

/// Outbound side of a channel as seen by session adapters.
pub trait OutboundSink {
    fn state(&self) -> ConnectionState;

    /// Enqueue a frame. Returns `false` when the frame was dropped because
    /// the channel is not open; dropped frames are never delivered later.
    fn send_text(&self, text: String) -> bool;

    fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    fn send_json<T: Serialize>(&self, message: &T) -> bool
    where
        Self: Sized,
    {
        match serde_json::to_string(message) {
            Ok(text) => self.send_text(text),
            Err(err) => {
                warn!("failed to serialize outbound frame: {err}");
                false
            }
        }
    }
}
