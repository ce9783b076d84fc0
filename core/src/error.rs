use std::io;
use std::path::PathBuf;

use studio_backend_client::BackendError;
use studio_channel::ChannelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StudioErr>;

#[derive(Debug, Error)]
pub enum StudioErr {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A file operation was requested without a path. Rejected before any
    /// network call.
    #[error("a path is required")]
    MissingPath,

    /// Empty or whitespace-only user input.
    #[error("input is empty")]
    EmptyInput,

    #[error("no active document")]
    NoActiveDocument,

    #[error("channel is not open")]
    ChannelNotOpen,

    #[error("could not find home directory")]
    NoHomeDir,

    #[error("failed to read {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl StudioErr {
    /// Short text for a user-visible notification.
    pub fn user_message(&self) -> String {
        match self {
            StudioErr::Backend(err) => err.failure_name(),
            other => other.to_string(),
        }
    }
}
