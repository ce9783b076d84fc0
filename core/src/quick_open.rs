use studio_file_search::FileMatch;
use studio_file_search::PathIndex;

/// State of the quick-open overlay.
///
/// The path list is fetched once and cached; it is only re-fetched while the
/// cache is empty. Results are recomputed from the cache on every query.
#[derive(Debug)]
pub struct QuickOpen {
    index: PathIndex,
    visible: bool,
    query: String,
    limit: usize,
}

impl QuickOpen {
    pub fn new(limit: usize) -> Self {
        Self {
            index: PathIndex::default(),
            visible: false,
            query: String::new(),
            limit,
        }
    }

    /// Show the overlay. Returns `true` when the caller must fetch the path
    /// list.
    pub fn show(&mut self) -> bool {
        self.visible = true;
        self.needs_fetch()
    }

    pub fn needs_fetch(&self) -> bool {
        self.index.is_empty()
    }

    pub fn load(&mut self, paths: Vec<String>) {
        self.index = PathIndex::new(paths);
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn results(&self) -> Vec<FileMatch> {
        self.index.search(&self.query, self.limit)
    }

    /// A result was opened: close the overlay and clear the query.
    pub fn finish_selection(&mut self) {
        self.visible = false;
        self.query.clear();
    }

    /// Escape: close the overlay, nothing else.
    pub fn dismiss(&mut self) {
        self.visible = false;
    }
}
