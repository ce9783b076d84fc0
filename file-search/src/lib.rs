use serde::Serialize;
use std::collections::BinaryHeap;

mod fuzzy_match;

pub use fuzzy_match::fuzzy_match;

/// A single ranked quick-open candidate.
///
/// * `score` – Relevance from [`fuzzy_match`] (smaller is better). `None` for
///   the unfiltered listing returned by an empty query.
/// * `path` – The candidate path as stored in the index.
/// * `index` – Position of the path in the index; breaks score ties.
/// * `indices` – Matched character positions, sorted, for highlighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    pub path: String,
    pub index: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<usize>,
}

/// Flat, ordered list of candidate paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathIndex {
    paths: Vec<String>,
}

impl PathIndex {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Rank the index against `query`, keeping at most `limit` results.
    ///
    /// An empty (or all-whitespace) query lists the first `limit` paths in
    /// index order. Otherwise results are ordered by score, then by index, so
    /// identical queries always produce identical output.
    pub fn search(&self, query: &str, limit: usize) -> Vec<FileMatch> {
        let query = query.trim();
        if query.is_empty() {
            return self
                .paths
                .iter()
                .take(limit)
                .enumerate()
                .map(|(index, path)| FileMatch {
                    score: None,
                    path: path.clone(),
                    index,
                    indices: Vec::new(),
                })
                .collect();
        }

        let mut best = BestMatches::new(limit);
        for (index, path) in self.paths.iter().enumerate() {
            if let Some((indices, score)) = fuzzy_match(path, query) {
                best.insert(score, index, indices);
            }
        }

        best.into_sorted()
            .into_iter()
            .map(|(score, index, indices)| FileMatch {
                score: Some(score),
                path: self.paths[index].clone(),
                index,
                indices,
            })
            .collect()
    }
}

impl FromIterator<String> for PathIndex {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Keeps the `max_count` lowest `(score, index)` pairs seen so far.
struct BestMatches {
    max_count: usize,
    // Max-heap on (score, index): the root is the current worst kept match.
    heap: BinaryHeap<(i32, usize, Vec<usize>)>,
}

impl BestMatches {
    fn new(max_count: usize) -> Self {
        Self {
            max_count,
            heap: BinaryHeap::new(),
        }
    }

    fn insert(&mut self, score: i32, index: usize, indices: Vec<usize>) {
        if self.max_count == 0 {
            return;
        }
        if self.heap.len() < self.max_count {
            self.heap.push((score, index, indices));
        } else if let Some(&(worst_score, worst_index, _)) = self.heap.peek()
            && (score, index) < (worst_score, worst_index)
        {
            self.heap.pop();
            self.heap.push((score, index, indices));
        }
    }

    fn into_sorted(self) -> Vec<(i32, usize, Vec<usize>)> {
        let mut matches = self.heap.into_vec();
        matches.sort_by_key(|(score, index, _)| (*score, *index));
        matches
    }
}
