use std::time::Duration;

use async_trait::async_trait;
use futures::SinkExt;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::ChannelError;
use crate::Socket;
use crate::Transport;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket transport, optionally guarded by an HTTP health probe.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
    probe_url: Option<String>,
    http: reqwest::Client,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            probe_url: None,
            http: reqwest::Client::new(),
        }
    }

    /// Require `probe_url` to answer 2xx before each connection attempt.
    pub fn with_probe(mut self, probe_url: impl Into<String>) -> Self {
        self.probe_url = Some(probe_url.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WsTransport {
    type Socket = WsSocket;

    async fn probe(&self) -> Result<(), ChannelError> {
        let Some(probe_url) = &self.probe_url else {
            return Ok(());
        };
        let response = self
            .http
            .get(probe_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|err| ChannelError::Probe(err.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::Probe(format!("HTTP {}", response.status())))
        }
    }

    async fn connect(&self) -> Result<WsSocket, ChannelError> {
        debug!("connecting to {}", self.url);
        let (stream, _response) = connect_async(self.url.as_str()).await?;
        Ok(WsSocket { stream })
    }
}

pub struct WsSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Socket for WsSocket {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Ok(Message::Close(_)) => return None,
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Err(err) => return Some(Err(err.into())),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(err) = self.stream.close(None).await {
            debug!("websocket close: {err}");
        }
    }
}
