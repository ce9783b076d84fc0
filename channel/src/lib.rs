//! Resilient duplex message channel.
//!
//! A [`Channel`] keeps one socket alive at a time, decodes inbound JSON
//! frames into a caller-chosen event type and reconnects with a two-step
//! backoff whenever the socket (or the health probe in front of it) fails.
//! The reconnect bookkeeping lives in [`ReconnectState`], a plain state
//! machine with no I/O so every transition can be tested on its own.

mod backoff;
mod driver;
mod endpoint;
mod error;
mod frame;
mod state;
mod transport;
mod ws;

pub use backoff::BackoffPolicy;
pub use driver::Channel;
pub use driver::ChannelEvent;
pub use driver::ChannelHandle;
pub use endpoint::health_url;
pub use endpoint::websocket_url;
pub use error::ChannelError;
pub use frame::Inbound;
pub use frame::decode_frame;
pub use state::ConnectionState;
pub use state::ReconnectPlan;
pub use state::ReconnectState;
pub use state::TimerId;
pub use transport::OutboundSink;
pub use transport::Socket;
pub use transport::Transport;
pub use ws::WsSocket;
pub use ws::WsTransport;
