//! Application context that owns every piece of client state.
//!
//! All cross-component mutation goes through [`Studio`]. Backend responses
//! are applied to the document they were requested for (by path), never to
//! whatever happens to be active when the response lands.

use std::sync::Arc;

use studio_backend_client::Backend;
use studio_file_search::FileMatch;
use studio_protocol::fs::CommandOutput;
use studio_protocol::fs::SearchHit;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::Config;
use crate::config::ReopenPolicy;
use crate::document_store::DocumentStore;
use crate::error::Result;
use crate::error::StudioErr;
use crate::file_tree::FileTree;
use crate::file_tree::sibling_path;
use crate::health::HealthStatus;
use crate::notifications::Notifications;
use crate::quick_open::QuickOpen;

/// Root passed to the backend for whole-project listings.
const PROJECT_ROOT: &str = "";

/// Snapshot of the repository state shown in the right rail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitStatus {
    pub branch: String,
    pub status: String,
}

pub struct Studio {
    config: Config,
    backend: Arc<dyn Backend>,
    documents: DocumentStore,
    quick_open: QuickOpen,
    file_tree: FileTree,
    notifications: Notifications,
    health: HealthStatus,
}

impl Studio {
    pub fn new(config: Config, backend: Arc<dyn Backend>) -> Self {
        Self {
            documents: DocumentStore::new(config.reopen_policy),
            quick_open: QuickOpen::new(config.quick_open_limit),
            file_tree: FileTree::default(),
            notifications: Notifications::default(),
            health: HealthStatus::default(),
            config,
            backend,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn quick_open(&self) -> &QuickOpen {
        &self.quick_open
    }

    pub fn file_tree(&self) -> &FileTree {
        &self.file_tree
    }

    pub fn health(&self) -> &HealthStatus {
        &self.health
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut Notifications {
        &mut self.notifications
    }

    // ---------------------------------------------------------------------
    // Documents
    // ---------------------------------------------------------------------

    /// Fetch `path` and open it. An already-open path is only activated under
    /// [`ReopenPolicy::Preserve`].
    pub async fn open_path(&mut self, path: &str) -> Result<()> {
        let path = require_path(path)?;
        if self.documents.is_open(path) && self.documents.reopen_policy() == ReopenPolicy::Preserve
        {
            self.documents.set_active(path);
            return Ok(());
        }
        let content = self.backend.read_file(path).await;
        let content = self.notify_on_err(content)?;
        self.documents.open_file(path, content);
        Ok(())
    }

    pub fn edit_active(&mut self, text: impl Into<String>) -> bool {
        self.documents.edit_content(text)
    }

    pub fn set_active(&mut self, path: &str) -> bool {
        self.documents.set_active(path)
    }

    pub fn close_tab(&mut self, path: &str) -> bool {
        self.documents.close_tab(path)
    }

    /// Persist the active buffer. `Ok(false)` when nothing is active. A
    /// failed write leaves dirty state untouched.
    pub async fn save_active(&mut self) -> Result<bool> {
        let Some(request) = self.documents.begin_save() else {
            return Ok(false);
        };
        let written = self
            .backend
            .write_file(&request.path, &request.content)
            .await;
        self.notify_on_err(written)?;
        if !self.documents.complete_save(&request) {
            debug!("{} closed before its save completed", request.path);
        }
        self.notifications.success(format!("Saved {}", request.path));
        Ok(true)
    }

    /// Run the formatter over the active buffer and apply the result to the
    /// same path. `Ok(false)` when nothing is active or the document was
    /// closed before the formatter answered.
    pub async fn format_active(&mut self) -> Result<bool> {
        let Some(snapshot) = self.documents.begin_save() else {
            return Ok(false);
        };
        let formatted = self
            .backend
            .format_python(&snapshot.content, self.config.format_line_length)
            .await;
        let formatted = self.notify_on_err(formatted)?;
        Ok(self.documents.set_content(&snapshot.path, formatted))
    }

    // ---------------------------------------------------------------------
    // Quick open
    // ---------------------------------------------------------------------

    /// Show the overlay, fetching the path list if the cache is empty. A
    /// failed fetch leaves the cache empty so the next open retries.
    pub async fn open_quick_open(&mut self) {
        if !self.quick_open.show() {
            return;
        }
        match self.backend.tree(PROJECT_ROOT).await {
            Ok(paths) => self.quick_open.load(paths),
            Err(err) => warn!("quick-open index fetch failed: {err}"),
        }
    }

    pub fn set_quick_open_query(&mut self, query: impl Into<String>) {
        self.quick_open.set_query(query);
    }

    pub fn quick_open_results(&self) -> Vec<FileMatch> {
        self.quick_open.results()
    }

    /// Open a quick-open result, then close the overlay and clear the query.
    pub async fn select_quick_open(&mut self, path: &str) -> Result<()> {
        self.open_path(path).await?;
        self.quick_open.finish_selection();
        Ok(())
    }

    pub fn dismiss_quick_open(&mut self) {
        self.quick_open.dismiss();
    }

    // ---------------------------------------------------------------------
    // File tree
    // ---------------------------------------------------------------------

    /// Reload the root listing. A failure yields an empty tree.
    pub async fn refresh_tree(&mut self) {
        match self.backend.list_dir(PROJECT_ROOT).await {
            Ok(items) => self.file_tree.set_root(items),
            Err(err) => {
                warn!("file tree refresh failed: {err}");
                self.file_tree.clear();
            }
        }
    }

    /// Expand or collapse a directory, listing it on first expand.
    pub async fn toggle_dir(&mut self, path: &str) -> Result<Option<bool>> {
        if self.file_tree.needs_children(path) {
            let items = self.backend.list_dir(path).await;
            let items = self.notify_on_err(items)?;
            self.file_tree.set_children(path, items);
        }
        Ok(self.file_tree.toggle(path))
    }

    /// Rename a tree entry within its directory.
    pub async fn rename_entry(&mut self, path: &str, new_name: &str) -> Result<Option<String>> {
        let path = require_path(path)?;
        let new_name = new_name.trim();
        let current = path.rsplit('/').next().unwrap_or(path);
        if new_name.is_empty() || new_name == current {
            return Ok(None);
        }
        let dst = sibling_path(path, new_name);
        self.move_path(path, &dst).await?;
        Ok(Some(dst))
    }

    // ---------------------------------------------------------------------
    // Workspace actions
    // ---------------------------------------------------------------------

    pub async fn create_file(&mut self, path: &str) -> Result<()> {
        let path = require_path(path)?;
        let created = self.backend.create_file(path, "").await;
        self.notify_on_err(created)?;
        self.notifications.success(format!("Created {path}"));
        self.refresh_tree().await;
        Ok(())
    }

    pub async fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = require_path(path)?;
        let created = self.backend.mkdir(path).await;
        self.notify_on_err(created)?;
        self.notifications.success(format!("Created folder {path}"));
        self.refresh_tree().await;
        Ok(())
    }

    /// Delete a file or empty directory; open documents at or below it are
    /// closed.
    pub async fn delete_path(&mut self, path: &str) -> Result<()> {
        let path = require_path(path)?;
        let deleted = self.backend.delete(path).await;
        self.notify_on_err(deleted)?;
        let closed = self.documents.remove_path(path);
        if closed > 0 {
            info!("closed {closed} tab(s) under deleted {path}");
        }
        self.notifications.success(format!("Deleted {path}"));
        self.refresh_tree().await;
        Ok(())
    }

    /// Move or rename; open documents follow the move.
    pub async fn move_path(&mut self, src: &str, dst: &str) -> Result<()> {
        let src = require_path(src)?;
        let dst = require_path(dst)?;
        let moved = self.backend.move_path(src, dst).await;
        self.notify_on_err(moved)?;
        self.documents.rename_path(src, dst);
        self.notifications.success(format!("Moved to {dst}"));
        self.refresh_tree().await;
        Ok(())
    }

    pub async fn search(&mut self, query: &str) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(StudioErr::EmptyInput);
        }
        let hits = self.backend.search(query, PROJECT_ROOT).await;
        self.notify_on_err(hits)
    }

    pub async fn run_tests(&mut self) -> Result<CommandOutput> {
        let output = self.backend.run_tests().await;
        let output = self.notify_on_err(output)?;
        if output.ok {
            self.notifications.success("Tests passed");
        } else {
            self.notifications.error("Tests failed");
        }
        Ok(output)
    }

    pub async fn run_shell(&mut self, cmd: &[String]) -> Result<CommandOutput> {
        if cmd.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(StudioErr::EmptyInput);
        }
        let output = self.backend.run_shell(cmd, None).await;
        self.notify_on_err(output)
    }

    /// Branch name and short status. Never fails: an unavailable git is
    /// reported in the status text.
    pub async fn git_status(&mut self) -> GitStatus {
        let status = self.git(&["status", "--short", "--branch"]).await;
        let branch = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await;
        match (status, branch) {
            (Ok(status), Ok(branch)) => {
                let status_fallback = if status.ok { "(clean)" } else { "(not a git repo)" };
                let branch_fallback = if branch.ok { "" } else { "no-branch" };
                GitStatus {
                    status: non_empty_or(&status.stdout, status_fallback),
                    branch: non_empty_or(&branch.stdout, branch_fallback),
                }
            }
            _ => GitStatus {
                status: "git not available or repository not initialized".to_string(),
                branch: String::new(),
            },
        }
    }

    /// Stage everything and commit it as `WIP`.
    pub async fn quick_commit(&mut self) -> Result<GitStatus> {
        let add = self.git(&["add", "-A"]).await;
        let add = self.notify_on_err(add)?;
        let commit = self.git(&["commit", "-m", "WIP"]).await;
        let commit = self.notify_on_err(commit)?;
        if add.ok && commit.ok {
            self.notifications.success("Committed WIP");
        } else {
            let detail = format!("{}\n{}", add.stdout, commit.stdout);
            self.notifications.error(detail.trim().to_string());
        }
        Ok(self.git_status().await)
    }

    pub async fn git_diff(&mut self) -> Result<String> {
        let diff = self.git(&["diff"]).await;
        let diff = self.notify_on_err(diff)?;
        Ok(non_empty_or(&diff.stdout, "(no changes)"))
    }

    // ---------------------------------------------------------------------
    // Health
    // ---------------------------------------------------------------------

    pub async fn refresh_health(&mut self) -> &HealthStatus {
        self.health = match self.backend.health().await {
            Ok(response) => HealthStatus::from_response(&response),
            Err(err) => {
                debug!("health probe failed: {err}");
                HealthStatus::down()
            }
        };
        &self.health
    }

    async fn git(&self, args: &[&str]) -> studio_backend_client::Result<CommandOutput> {
        let cmd: Vec<String> = std::iter::once("git")
            .chain(args.iter().copied())
            .map(String::from)
            .collect();
        self.backend.run_shell(&cmd, None).await
    }

    /// Surface a backend failure as an error notification and convert it.
    fn notify_on_err<T>(&mut self, result: studio_backend_client::Result<T>) -> Result<T> {
        result.map_err(|err| {
            warn!("{err}");
            self.notifications.error(err.failure_name());
            StudioErr::from(err)
        })
    }
}

fn require_path(path: &str) -> Result<&str> {
    let path = path.trim();
    if path.is_empty() {
        Err(StudioErr::MissingPath)
    } else {
        Ok(path)
    }
}

fn non_empty_or(text: &str, fallback: &str) -> String {
    match text.trim() {
        "" => fallback.to_string(),
        trimmed => trimmed.to_string(),
    }
}
