mod backend;
mod client;
mod error;

pub use backend::Backend;
pub use client::BackendClient;
pub use error::BackendError;
pub use error::Operation;
pub use error::Result;
pub use reqwest::StatusCode;
