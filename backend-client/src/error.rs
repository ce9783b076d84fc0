use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackendError>;

/// Every backend operation the client knows how to call.
///
/// The camelCase rendering doubles as the prefix of the generic failure name
/// shown to users, e.g. `fsWriteFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "camelCase")]
pub enum Operation {
    FsList,
    FsRead,
    FsWrite,
    FsCreate,
    FsMkdir,
    FsDelete,
    FsMove,
    FsTree,
    FsSearch,
    ShellRun,
    RunTests,
    FormatPython,
    Health,
}

#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-2xx status.
    #[error("{operation}Failed: HTTP {status}")]
    Status {
        operation: Operation,
        status: StatusCode,
        body: String,
    },

    /// The request never produced a response.
    #[error("{operation}Failed: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation}Failed: could not decode response: {source}")]
    Decode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
}

impl BackendError {
    pub fn operation(&self) -> Operation {
        match self {
            BackendError::Status { operation, .. }
            | BackendError::Transport { operation, .. }
            | BackendError::Decode { operation, .. } => *operation,
        }
    }

    /// The short `<operation>Failed` name, without any detail.
    pub fn failure_name(&self) -> String {
        format!("{}Failed", self.operation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn failure_names_use_camel_case_operations() {
        let err = BackendError::Status {
            operation: Operation::FsWrite,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert_eq!(err.failure_name(), "fsWriteFailed");
        assert_eq!(
            err.to_string(),
            "fsWriteFailed: HTTP 500 Internal Server Error"
        );
    }
}
