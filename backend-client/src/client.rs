use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::USER_AGENT;
use serde::Serialize;
use serde::de::DeserializeOwned;
use studio_protocol::fs::CommandOutput;
use studio_protocol::fs::FormatRequest;
use studio_protocol::fs::FormatResponse;
use studio_protocol::fs::FsItem;
use studio_protocol::fs::HealthResponse;
use studio_protocol::fs::MoveRequest;
use studio_protocol::fs::PathRequest;
use studio_protocol::fs::ReadFileResponse;
use studio_protocol::fs::SearchHit;
use studio_protocol::fs::ShellRunRequest;
use studio_protocol::fs::WriteFileRequest;
use tracing::debug;

use crate::Backend;
use crate::BackendError;
use crate::Operation;
use crate::Result;

/// HTTP client for the studio backend.
#[derive(Clone, Debug)]
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
    user_agent: Option<HeaderValue>,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> std::result::Result<Self, reqwest::Error> {
        let mut base_url = base_url.into();
        // Trim trailing slashes for consistent URL building.
        while base_url.ends_with('/') {
            base_url.pop();
        }
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()?;
        Ok(Self {
            base_url,
            http,
            user_agent: None,
        })
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        if let Ok(hv) = HeaderValue::from_str(&ua.into()) {
            self.user_agent = Some(hv);
        }
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the plain HTTP health endpoint, also used as the channel probe.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }

    fn headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(ua) = &self.user_agent {
            h.insert(USER_AGENT, ua.clone());
        } else {
            h.insert(USER_AGENT, HeaderValue::from_static("studio-client"));
        }
        h
    }

    async fn exec_request(
        &self,
        operation: Operation,
        req: reqwest::RequestBuilder,
    ) -> Result<String> {
        let res = req
            .headers(self.headers())
            .send()
            .await
            .map_err(|source| BackendError::Transport { operation, source })?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if !status.is_success() {
            debug!(%operation, %status, "backend request failed");
            return Err(BackendError::Status {
                operation,
                status,
                body,
            });
        }
        Ok(body)
    }

    fn decode_json<T: DeserializeOwned>(operation: Operation, body: &str) -> Result<T> {
        serde_json::from_str::<T>(body).map_err(|source| BackendError::Decode { operation, source })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let req = self.http.get(&url).query(query);
        let body = self.exec_request(operation, req).await?;
        Self::decode_json(operation, &body)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        operation: Operation,
        path: &str,
        body: &B,
    ) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let req = self.http.post(&url).json(body);
        self.exec_request(operation, req).await
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn list_dir(&self, path: &str) -> Result<Vec<FsItem>> {
        self.get_json(Operation::FsList, "/api/fs/list", &[("path", path)])
            .await
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let response: ReadFileResponse = self
            .get_json(Operation::FsRead, "/api/fs/read", &[("path", path)])
            .await?;
        Ok(response.content)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let body = WriteFileRequest {
            path: path.to_string(),
            content: content.to_string(),
        };
        self.post(Operation::FsWrite, "/api/fs/write", &body).await?;
        Ok(())
    }

    async fn create_file(&self, path: &str, content: &str) -> Result<()> {
        let body = WriteFileRequest {
            path: path.to_string(),
            content: content.to_string(),
        };
        self.post(Operation::FsCreate, "/api/fs/create", &body).await?;
        Ok(())
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        let body = PathRequest {
            path: path.to_string(),
        };
        self.post(Operation::FsMkdir, "/api/fs/mkdir", &body).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let body = PathRequest {
            path: path.to_string(),
        };
        self.post(Operation::FsDelete, "/api/fs/delete", &body).await?;
        Ok(())
    }

    async fn move_path(&self, src: &str, dst: &str) -> Result<()> {
        let body = MoveRequest {
            src: src.to_string(),
            dst: dst.to_string(),
        };
        self.post(Operation::FsMove, "/api/fs/move", &body).await?;
        Ok(())
    }

    async fn tree(&self, path: &str) -> Result<Vec<String>> {
        self.get_json(Operation::FsTree, "/api/fs/tree", &[("path", path)])
            .await
    }

    async fn search(&self, query: &str, path: &str) -> Result<Vec<SearchHit>> {
        self.get_json(
            Operation::FsSearch,
            "/api/search",
            &[("q", query), ("path", path)],
        )
        .await
    }

    async fn run_shell(&self, cmd: &[String], cwd: Option<&str>) -> Result<CommandOutput> {
        let body = ShellRunRequest {
            cmd: cmd.to_vec(),
            cwd: cwd.map(str::to_string),
        };
        let response = self.post(Operation::ShellRun, "/api/shell/run", &body).await?;
        Self::decode_json(Operation::ShellRun, &response)
    }

    async fn run_tests(&self) -> Result<CommandOutput> {
        let response = self
            .post(Operation::RunTests, "/api/tests/run", &serde_json::json!({}))
            .await?;
        Self::decode_json(Operation::RunTests, &response)
    }

    async fn format_python(&self, code: &str, line_length: u32) -> Result<String> {
        let body = FormatRequest {
            code: code.to_string(),
            line_length,
        };
        let response = self
            .post(Operation::FormatPython, "/api/format/python", &body)
            .await?;
        let formatted: FormatResponse = Self::decode_json(Operation::FormatPython, &response)?;
        Ok(formatted.code)
    }

    async fn health(&self) -> Result<HealthResponse> {
        self.get_json(Operation::Health, "/health", &[]).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed() {
        let client = BackendClient::new("http://localhost:5050//").expect("client");
        assert_eq!(client.base_url(), "http://localhost:5050");
        assert_eq!(client.health_url(), "http://localhost:5050/health");
    }
}
