#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use studio_backend_client::Backend;
use studio_backend_client::BackendError;
use studio_backend_client::Operation;
use studio_backend_client::Result;
use studio_backend_client::StatusCode;
use studio_core::Studio;
use studio_core::StudioErr;
use studio_core::config::Config;
use studio_core::config::ReopenPolicy;
use studio_core::health::ApiStatus;
use studio_core::notifications::Level;
use studio_protocol::fs::CommandOutput;
use studio_protocol::fs::FsItem;
use studio_protocol::fs::HealthResponse;
use studio_protocol::fs::SearchHit;

/// In-memory backend. Operations listed in `failing` answer HTTP 500.
#[derive(Default)]
struct FakeBackend {
    files: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<String>>,
    shell: Mutex<HashMap<String, CommandOutput>>,
}

impl FakeBackend {
    fn with_files(files: &[(&str, &str)]) -> Arc<Self> {
        let backend = Self::default();
        *backend.files.lock().unwrap() = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        Arc::new(backend)
    }

    fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    fn recover(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    fn file(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn script_shell(&self, cmd: &str, output: CommandOutput) {
        self.shell.lock().unwrap().insert(cmd.to_string(), output);
    }

    fn check(&self, name: &'static str, operation: Operation) -> Result<()> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.failing.lock().unwrap().contains(name) {
            return Err(BackendError::Status {
                operation,
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: String::new(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_dir(&self, path: &str) -> Result<Vec<FsItem>> {
        self.check("list", Operation::FsList)?;
        let prefix = if path.is_empty() { String::new() } else { format!("{path}/") };
        let mut items: Vec<FsItem> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter_map(|p| p.strip_prefix(&prefix).map(|rest| (p, rest)))
            .map(|(p, rest)| match rest.split_once('/') {
                Some((dir, _)) => FsItem {
                    name: dir.to_string(),
                    path: format!("{prefix}{dir}"),
                    dir: true,
                },
                None => FsItem {
                    name: rest.to_string(),
                    path: p.clone(),
                    dir: false,
                },
            })
            .collect();
        items.sort_by(|a, b| a.path.cmp(&b.path));
        items.dedup();
        Ok(items)
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        self.check("read", Operation::FsRead)?;
        self.file(path).ok_or_else(|| BackendError::Status {
            operation: Operation::FsRead,
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        })
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.check("write", Operation::FsWrite)?;
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn create_file(&self, path: &str, content: &str) -> Result<()> {
        self.check("create", Operation::FsCreate)?;
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn mkdir(&self, _path: &str) -> Result<()> {
        self.check("mkdir", Operation::FsMkdir)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.check("delete", Operation::FsDelete)?;
        let prefix = format!("{path}/");
        self.files
            .lock()
            .unwrap()
            .retain(|p, _| p != path && !p.starts_with(&prefix));
        Ok(())
    }

    async fn move_path(&self, src: &str, dst: &str) -> Result<()> {
        self.check("move", Operation::FsMove)?;
        let mut files = self.files.lock().unwrap();
        if let Some(content) = files.remove(src) {
            files.insert(dst.to_string(), content);
        }
        Ok(())
    }

    async fn tree(&self, _path: &str) -> Result<Vec<String>> {
        self.check("tree", Operation::FsTree)?;
        let mut paths: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }

    async fn search(&self, query: &str, _path: &str) -> Result<Vec<SearchHit>> {
        self.check("search", Operation::FsSearch)?;
        let mut hits = Vec::new();
        for (path, content) in self.files.lock().unwrap().iter() {
            for (i, line) in content.lines().enumerate() {
                if line.contains(query) {
                    hits.push(SearchHit {
                        path: path.clone(),
                        line: i as u32 + 1,
                        text: line.to_string(),
                    });
                }
            }
        }
        Ok(hits)
    }

    async fn run_shell(&self, cmd: &[String], _cwd: Option<&str>) -> Result<CommandOutput> {
        self.check("shell", Operation::ShellRun)?;
        let key = cmd.join(" ");
        self.calls.lock().unwrap().push(key.clone());
        Ok(self
            .shell
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or(CommandOutput {
                stdout: String::new(),
                ok: true,
                code: Some(0),
            }))
    }

    async fn run_tests(&self) -> Result<CommandOutput> {
        self.check("tests", Operation::RunTests)?;
        Ok(CommandOutput {
            stdout: "1 failed".to_string(),
            ok: false,
            code: Some(1),
        })
    }

    async fn format_python(&self, code: &str, _line_length: u32) -> Result<String> {
        self.check("format", Operation::FormatPython)?;
        Ok(code.replace("  ", " "))
    }

    async fn health(&self) -> Result<HealthResponse> {
        self.check("health", Operation::Health)?;
        Ok(HealthResponse {
            ok: true,
            project_root: Some("/work".to_string()),
            codex_configured: false,
        })
    }
}

fn studio(backend: &Arc<FakeBackend>) -> Studio {
    Studio::new(Config::default(), Arc::clone(backend) as Arc<dyn Backend>)
}

fn last_notice(studio: &mut Studio) -> Option<(Level, String)> {
    studio
        .notifications_mut()
        .drain()
        .pop()
        .map(|n| (n.level, n.message))
}

#[tokio::test]
async fn save_persists_and_clears_dirty() {
    let backend = FakeBackend::with_files(&[("app.py", "x = 1\n")]);
    let mut studio = studio(&backend);

    studio.open_path("app.py").await.unwrap();
    studio.edit_active("x = 2\n");
    assert!(studio.documents().is_dirty("app.py"));

    assert!(studio.save_active().await.unwrap());

    assert!(!studio.documents().is_dirty("app.py"));
    assert_eq!(backend.file("app.py").as_deref(), Some("x = 2\n"));
    assert_eq!(
        last_notice(&mut studio),
        Some((Level::Success, "Saved app.py".to_string()))
    );
}

#[tokio::test]
async fn failed_save_keeps_dirty_and_notifies() {
    let backend = FakeBackend::with_files(&[("app.py", "x = 1\n")]);
    let mut studio = studio(&backend);
    studio.open_path("app.py").await.unwrap();
    studio.edit_active("x = 2\n");
    backend.fail("write");

    let err = studio.save_active().await.unwrap_err();

    assert_eq!(err.user_message(), "fsWriteFailed");
    assert!(studio.documents().is_dirty("app.py"));
    assert_eq!(backend.file("app.py").as_deref(), Some("x = 1\n"));
    assert_eq!(
        last_notice(&mut studio),
        Some((Level::Error, "fsWriteFailed".to_string()))
    );

    backend.recover("write");
    assert!(studio.save_active().await.unwrap());
    assert!(!studio.documents().is_dirty("app.py"));
}

#[tokio::test]
async fn save_without_active_document_is_a_noop() {
    let backend = FakeBackend::with_files(&[]);
    let mut studio = studio(&backend);

    assert!(!studio.save_active().await.unwrap());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn reopen_preserves_unsaved_edits_without_refetching() {
    let backend = FakeBackend::with_files(&[("a.py", "a"), ("b.py", "b")]);
    let mut studio = studio(&backend);
    studio.open_path("a.py").await.unwrap();
    studio.edit_active("a-edited");
    studio.open_path("b.py").await.unwrap();

    studio.open_path("a.py").await.unwrap();

    let doc = studio.documents().active_document().unwrap();
    assert_eq!(doc.content(), "a-edited");
    assert_eq!(backend.calls(), vec!["read", "read"]);
}

#[tokio::test]
async fn reseed_policy_refetches_on_reopen() {
    let backend = FakeBackend::with_files(&[("a.py", "a")]);
    let config = Config {
        reopen_policy: ReopenPolicy::Reseed,
        ..Config::default()
    };
    let mut studio = Studio::new(config, Arc::clone(&backend) as Arc<dyn Backend>);
    studio.open_path("a.py").await.unwrap();
    studio.edit_active("mine");

    studio.open_path("a.py").await.unwrap();

    assert_eq!(
        studio.documents().active_document().map(|d| d.content().to_string()),
        Some("a".to_string())
    );
}

#[tokio::test]
async fn open_missing_file_notifies_named_failure() {
    let backend = FakeBackend::with_files(&[]);
    let mut studio = studio(&backend);

    assert!(studio.open_path("nope.py").await.is_err());
    assert!(studio.documents().tabs().is_empty());
    assert_eq!(
        last_notice(&mut studio),
        Some((Level::Error, "fsReadFailed".to_string()))
    );
}

#[tokio::test]
async fn empty_paths_are_rejected_before_any_request() {
    let backend = FakeBackend::with_files(&[]);
    let mut studio = studio(&backend);

    assert!(matches!(studio.create_file("  ").await, Err(StudioErr::MissingPath)));
    assert!(matches!(studio.move_path("a", "").await, Err(StudioErr::MissingPath)));
    assert!(matches!(studio.search(" ").await, Err(StudioErr::EmptyInput)));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn format_result_lands_on_requested_path() {
    let backend = FakeBackend::with_files(&[("a.py", "x  =  1"), ("b.py", "y = 2")]);
    let mut studio = studio(&backend);
    studio.open_path("a.py").await.unwrap();

    assert!(studio.format_active().await.unwrap());

    let doc = studio.documents().document("a.py").unwrap();
    assert_eq!(doc.content(), "x = 1");
    assert!(doc.is_dirty());
}

#[tokio::test]
async fn moving_open_document_rekeys_it() {
    let backend = FakeBackend::with_files(&[("old.py", "v")]);
    let mut studio = studio(&backend);
    studio.open_path("old.py").await.unwrap();
    studio.edit_active("v2");

    studio.move_path("old.py", "new.py").await.unwrap();

    assert_eq!(studio.documents().tabs(), ["new.py"]);
    assert_eq!(studio.documents().active_path(), Some("new.py"));
    assert!(studio.documents().is_dirty("new.py"));
}

#[tokio::test]
async fn deleting_open_document_closes_its_tab() {
    let backend = FakeBackend::with_files(&[("a.py", "a"), ("b.py", "b")]);
    let mut studio = studio(&backend);
    studio.open_path("a.py").await.unwrap();
    studio.open_path("b.py").await.unwrap();

    studio.delete_path("b.py").await.unwrap();

    assert_eq!(studio.documents().tabs(), ["a.py"]);
    assert_eq!(studio.documents().active_path(), Some("a.py"));
    assert_eq!(
        last_notice(&mut studio),
        Some((Level::Success, "Deleted b.py".to_string()))
    );
}

#[tokio::test]
async fn quick_open_fetches_once_and_selection_opens_document() {
    let backend = FakeBackend::with_files(&[("a/b.ts", ""), ("abc.ts", ""), ("x/y.ts", "")]);
    let mut studio = studio(&backend);

    studio.open_quick_open().await;
    studio.set_quick_open_query("ab");
    let ranked: Vec<String> = studio
        .quick_open_results()
        .into_iter()
        .map(|m| m.path)
        .collect();
    assert_eq!(ranked, vec!["abc.ts", "a/b.ts"]);

    studio.select_quick_open("abc.ts").await.unwrap();
    assert_eq!(studio.documents().active_path(), Some("abc.ts"));
    assert!(!studio.quick_open().is_visible());
    assert_eq!(studio.quick_open().query(), "");

    studio.open_quick_open().await;
    let tree_calls = backend.calls().iter().filter(|c| *c == "tree").count();
    assert_eq!(tree_calls, 1);
}

#[tokio::test]
async fn file_tree_lists_root_and_hydrates_on_expand() {
    let backend = FakeBackend::with_files(&[("src/lib.rs", ""), ("README.md", "")]);
    let mut studio = studio(&backend);

    studio.refresh_tree().await;
    assert_eq!(studio.toggle_dir("src").await.unwrap(), Some(true));

    let rows: Vec<(usize, String)> = studio
        .file_tree()
        .rows()
        .into_iter()
        .map(|r| (r.depth, r.path))
        .collect();
    assert_eq!(
        rows,
        vec![
            (0, "README.md".to_string()),
            (0, "src".to_string()),
            (1, "src/lib.rs".to_string()),
        ]
    );

    backend.fail("list");
    studio.refresh_tree().await;
    assert!(studio.file_tree().is_empty());
}

#[tokio::test]
async fn rename_entry_moves_within_parent() {
    let backend = FakeBackend::with_files(&[("src/old.rs", "fn main() {}")]);
    let mut studio = studio(&backend);

    let dst = studio.rename_entry("src/old.rs", "new.rs").await.unwrap();

    assert_eq!(dst.as_deref(), Some("src/new.rs"));
    assert_eq!(backend.file("src/new.rs").as_deref(), Some("fn main() {}"));
    assert_eq!(studio.rename_entry("src/new.rs", "new.rs").await.unwrap(), None);
}

#[tokio::test]
async fn search_and_tests_surface_results() {
    let backend = FakeBackend::with_files(&[("a.py", "import os\nprint(1)\n")]);
    let mut studio = studio(&backend);

    let hits = studio.search("print").await.unwrap();
    assert_eq!(
        hits,
        vec![SearchHit {
            path: "a.py".to_string(),
            line: 2,
            text: "print(1)".to_string(),
        }]
    );

    let output = studio.run_tests().await.unwrap();
    assert!(!output.ok);
    assert_eq!(
        last_notice(&mut studio),
        Some((Level::Error, "Tests failed".to_string()))
    );
}

#[tokio::test]
async fn git_actions_use_shell_backend() {
    let backend = FakeBackend::with_files(&[]);
    backend.script_shell(
        "git status --short --branch",
        CommandOutput {
            stdout: "## main\n".to_string(),
            ok: true,
            code: Some(0),
        },
    );
    backend.script_shell(
        "git rev-parse --abbrev-ref HEAD",
        CommandOutput {
            stdout: "main\n".to_string(),
            ok: true,
            code: Some(0),
        },
    );
    let mut studio = studio(&backend);

    let status = studio.git_status().await;
    assert_eq!(status.branch, "main");
    assert_eq!(status.status, "## main");

    assert_eq!(studio.git_diff().await.unwrap(), "(no changes)");

    studio.quick_commit().await.unwrap();
    let calls = backend.calls();
    assert!(calls.contains(&"git add -A".to_string()));
    assert!(calls.contains(&"git commit -m WIP".to_string()));

    backend.fail("shell");
    let status = studio.git_status().await;
    assert_eq!(status.status, "git not available or repository not initialized");
}

#[tokio::test]
async fn health_reflects_backend() {
    let backend = FakeBackend::with_files(&[]);
    let mut studio = studio(&backend);

    assert_eq!(studio.health().api, ApiStatus::Unknown);
    assert_eq!(studio.refresh_health().await.api, ApiStatus::Up);

    backend.fail("health");
    assert_eq!(studio.refresh_health().await.api, ApiStatus::Down);
}
