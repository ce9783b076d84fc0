use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    /// The HTTP health probe in front of the socket upgrade failed.
    #[error("health probe failed: {0}")]
    Probe(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("socket closed")]
    Closed,
}
