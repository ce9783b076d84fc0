//! Root of the `studio-core` library: client-side session and document state.

// Library code never prints; front ends decide what reaches stdout/stderr.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod chat;
pub mod config;
pub mod document_store;
pub mod error;
pub mod file_tree;
pub mod health;
pub mod notifications;
pub mod quick_open;
mod studio;
pub mod terminal;

pub use error::StudioErr;
pub use studio::GitStatus;
pub use studio::Studio;
