//! Authoritative state for open files.
//!
//! Invariants maintained by every mutation:
//! - a path appears in the tab order at most once;
//! - the active path, when set, is present in the tab order;
//! - a document is dirty exactly when its buffer differs from its saved
//!   baseline (dirtiness is computed, never stored).

use std::collections::HashMap;

use tracing::debug;

use crate::config::ReopenPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    content: String,
    saved_content: String,
}

impl Document {
    fn new(content: String) -> Self {
        Self {
            saved_content: content.clone(),
            content,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Last content confirmed persisted by the backend.
    pub fn saved_content(&self) -> &str {
        &self.saved_content
    }

    pub fn is_dirty(&self) -> bool {
        self.content != self.saved_content
    }
}

/// Snapshot of a buffer taken when a save starts. The backend response is
/// applied to `path`, whatever is active by then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<String, Document>,
    /// Open order; the last entry is the most recently opened tab.
    tabs: Vec<String>,
    active: Option<String>,
    reopen_policy: ReopenPolicy,
}

impl DocumentStore {
    pub fn new(reopen_policy: ReopenPolicy) -> Self {
        Self {
            reopen_policy,
            ..Default::default()
        }
    }

    pub fn reopen_policy(&self) -> ReopenPolicy {
        self.reopen_policy
    }

    /// Open `path` with freshly fetched `content` and make it active.
    ///
    /// Re-opening an open path follows the store's [`ReopenPolicy`]. Returns
    /// `true` when a new tab was created.
    pub fn open_file(&mut self, path: &str, content: String) -> bool {
        let newly_opened = match self.documents.get_mut(path) {
            Some(doc) => {
                match self.reopen_policy {
                    ReopenPolicy::Preserve => {
                        debug!("re-opened {path}; keeping in-memory buffer");
                    }
                    ReopenPolicy::Reseed => *doc = Document::new(content),
                }
                false
            }
            None => {
                self.documents.insert(path.to_string(), Document::new(content));
                self.tabs.push(path.to_string());
                true
            }
        };
        self.active = Some(path.to_string());
        newly_opened
    }

    /// Replace the active document's buffer. Returns `false` when nothing is
    /// active.
    pub fn edit_content(&mut self, text: impl Into<String>) -> bool {
        let Some(active) = self.active.as_deref() else {
            return false;
        };
        match self.documents.get_mut(active) {
            Some(doc) => {
                doc.content = text.into();
                true
            }
            None => false,
        }
    }

    /// Replace the buffer of a specific open document, active or not.
    pub fn set_content(&mut self, path: &str, text: impl Into<String>) -> bool {
        match self.documents.get_mut(path) {
            Some(doc) => {
                doc.content = text.into();
                true
            }
            None => false,
        }
    }

    /// Snapshot the active buffer for persisting. `None` when nothing is
    /// active.
    pub fn begin_save(&self) -> Option<SaveRequest> {
        let path = self.active.as_deref()?;
        let doc = self.documents.get(path)?;
        Some(SaveRequest {
            path: path.to_string(),
            content: doc.content.clone(),
        })
    }

    /// The backend confirmed `request`. The saved baseline becomes the
    /// snapshot, so edits typed while the save was in flight stay dirty.
    /// Returns `false` if the document was closed meanwhile.
    pub fn complete_save(&mut self, request: &SaveRequest) -> bool {
        match self.documents.get_mut(&request.path) {
            Some(doc) => {
                doc.saved_content = request.content.clone();
                true
            }
            None => false,
        }
    }

    /// Close `path`. If it was active, the most recently opened remaining tab
    /// becomes active.
    pub fn close_tab(&mut self, path: &str) -> bool {
        if self.documents.remove(path).is_none() {
            return false;
        }
        self.tabs.retain(|tab| tab != path);
        if self.active.as_deref() == Some(path) {
            self.active = self.tabs.last().cloned();
        }
        true
    }

    /// Switch to an already-open path. Never fetches.
    pub fn set_active(&mut self, path: &str) -> bool {
        if !self.documents.contains_key(path) {
            return false;
        }
        self.active = Some(path.to_string());
        true
    }

    /// Re-key documents after `src` was moved to `dst` on the backend. Open
    /// documents under a moved directory follow it. Tab position, buffer and
    /// baseline are preserved. Returns the number of re-keyed documents.
    pub fn rename_path(&mut self, src: &str, dst: &str) -> usize {
        let renames: Vec<(String, String)> = self
            .tabs
            .iter()
            .filter_map(|tab| moved_path(tab, src, dst).map(|new| (tab.clone(), new)))
            .collect();
        for (old, new) in &renames {
            if self.documents.contains_key(new) {
                self.close_tab(new);
            }
            let Some(doc) = self.documents.remove(old) else {
                continue;
            };
            self.documents.insert(new.clone(), doc);
            if let Some(tab) = self.tabs.iter_mut().find(|tab| tab.as_str() == old.as_str()) {
                *tab = new.clone();
            }
            if self.active.as_deref() == Some(old.as_str()) {
                self.active = Some(new.clone());
            }
        }
        renames.len()
    }

    /// Close every document at or below `path`, e.g. after a delete.
    pub fn remove_path(&mut self, path: &str) -> usize {
        let doomed: Vec<String> = self
            .tabs
            .iter()
            .filter(|tab| moved_path(tab, path, path).is_some())
            .cloned()
            .collect();
        for tab in &doomed {
            self.close_tab(tab);
        }
        doomed.len()
    }

    pub fn active_path(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_document(&self) -> Option<&Document> {
        self.documents.get(self.active.as_deref()?)
    }

    pub fn document(&self, path: &str) -> Option<&Document> {
        self.documents.get(path)
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.documents.contains_key(path)
    }

    pub fn is_dirty(&self, path: &str) -> bool {
        self.documents.get(path).is_some_and(Document::is_dirty)
    }

    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }
}

/// Where `path` ends up when `src` moves to `dst`, if it is `src` itself or
/// lives below it.
fn moved_path(path: &str, src: &str, dst: &str) -> Option<String> {
    let src = src.trim_end_matches('/');
    if path == src {
        return Some(dst.to_string());
    }
    let rest = path.strip_prefix(src)?.strip_prefix('/')?;
    Some(format!("{}/{rest}", dst.trim_end_matches('/')))
}
