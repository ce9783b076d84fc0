use async_trait::async_trait;
use studio_protocol::fs::CommandOutput;
use studio_protocol::fs::FsItem;
use studio_protocol::fs::HealthResponse;
use studio_protocol::fs::SearchHit;

use crate::Result;

/// The filesystem/shell collaborator as seen by the studio core.
///
/// [`crate::BackendClient`] implements this over HTTP; tests substitute an
/// in-memory fake.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_dir(&self, path: &str) -> Result<Vec<FsItem>>;
    async fn read_file(&self, path: &str) -> Result<String>;
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;
    async fn create_file(&self, path: &str, content: &str) -> Result<()>;
    async fn mkdir(&self, path: &str) -> Result<()>;
    async fn delete(&self, path: &str) -> Result<()>;
    async fn move_path(&self, src: &str, dst: &str) -> Result<()>;
    /// Flat list of every file path below `path`.
    async fn tree(&self, path: &str) -> Result<Vec<String>>;
    async fn search(&self, query: &str, path: &str) -> Result<Vec<SearchHit>>;
    async fn run_shell(&self, cmd: &[String], cwd: Option<&str>) -> Result<CommandOutput>;
    async fn run_tests(&self) -> Result<CommandOutput>;
    async fn format_python(&self, code: &str, line_length: u32) -> Result<String>;
    async fn health(&self) -> Result<HealthResponse>;
}
