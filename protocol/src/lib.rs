//! Wire types shared by the studio client crates.
//!
//! Everything in here mirrors the JSON exchanged with the studio backend:
//! the chat and terminal WebSocket envelopes plus the request/response bodies
//! of the HTTP endpoints.

pub mod chat;
pub mod fs;
mod message_id;
pub mod terminal;

pub use message_id::MessageId;
