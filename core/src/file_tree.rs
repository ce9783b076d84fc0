use studio_protocol::fs::FsItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub item: FsItem,
    pub expanded: bool,
    /// `None` until the directory has been listed.
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    fn new(item: FsItem) -> Self {
        Self {
            item,
            expanded: false,
            children: None,
        }
    }
}

/// One visible row of the flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub name: String,
    pub path: String,
    pub dir: bool,
    pub depth: usize,
    pub expanded: bool,
}

/// Sidebar file tree with lazily listed directories.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileTree {
    root: Vec<TreeNode>,
}

impl FileTree {
    pub fn set_root(&mut self, items: Vec<FsItem>) {
        self.root = items.into_iter().map(TreeNode::new).collect();
    }

    pub fn clear(&mut self) {
        self.root.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn node(&self, path: &str) -> Option<&TreeNode> {
        find_node(&self.root, path)
    }

    /// A directory whose children were never listed.
    pub fn needs_children(&self, path: &str) -> bool {
        self.node(path)
            .is_some_and(|node| node.item.dir && node.children.is_none())
    }

    pub fn set_children(&mut self, path: &str, items: Vec<FsItem>) -> bool {
        match find_node_mut(&mut self.root, path) {
            Some(node) if node.item.dir => {
                node.children = Some(items.into_iter().map(TreeNode::new).collect());
                true
            }
            _ => false,
        }
    }

    /// Flip a directory between expanded and collapsed. Returns the new
    /// state, or `None` when `path` is not a known directory.
    pub fn toggle(&mut self, path: &str) -> Option<bool> {
        let node = find_node_mut(&mut self.root, path)?;
        if !node.item.dir {
            return None;
        }
        node.expanded = !node.expanded;
        Some(node.expanded)
    }

    /// Rows in display order; children only appear under expanded
    /// directories.
    pub fn rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        push_rows(&self.root, 0, &mut rows);
        rows
    }
}

/// Path of `path` renamed to `new_name` within its parent directory.
pub fn sibling_path(path: &str, new_name: &str) -> String {
    match path.rsplit_once('/') {
        Some((parent, _)) => format!("{parent}/{new_name}"),
        None => new_name.to_string(),
    }
}

fn find_node<'a>(nodes: &'a [TreeNode], path: &str) -> Option<&'a TreeNode> {
    for node in nodes {
        if node.item.path == path {
            return Some(node);
        }
        if let Some(found) = node.children.as_deref().and_then(|c| find_node(c, path)) {
            return Some(found);
        }
    }
    None
}

fn find_node_mut<'a>(nodes: &'a mut [TreeNode], path: &str) -> Option<&'a mut TreeNode> {
    for node in nodes {
        if node.item.path == path {
            return Some(node);
        }
        if let Some(children) = node.children.as_mut()
            && let Some(found) = find_node_mut(children, path)
        {
            return Some(found);
        }
    }
    None
}

fn push_rows(nodes: &[TreeNode], depth: usize, rows: &mut Vec<TreeRow>) {
    for node in nodes {
        rows.push(TreeRow {
            name: node.item.name.clone(),
            path: node.item.path.clone(),
            dir: node.item.dir,
            depth,
            expanded: node.expanded,
        });
        if node.expanded
            && let Some(children) = &node.children
        {
            push_rows(children, depth + 1, rows);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(path: &str, dir: bool) -> FsItem {
        FsItem {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            dir,
        }
    }

    fn visible(tree: &FileTree) -> Vec<(usize, String)> {
        tree.rows().into_iter().map(|r| (r.depth, r.path)).collect()
    }

    #[test]
    fn children_hydrate_lazily_and_toggle() {
        let mut tree = FileTree::default();
        tree.set_root(vec![item("src", true), item("README.md", false)]);

        assert!(tree.needs_children("src"));
        assert!(!tree.needs_children("README.md"));

        assert!(tree.set_children("src", vec![item("src/lib.rs", false)]));
        assert!(!tree.needs_children("src"));
        assert_eq!(tree.toggle("src"), Some(true));
        assert_eq!(
            visible(&tree),
            vec![
                (0, "src".to_string()),
                (1, "src/lib.rs".to_string()),
                (0, "README.md".to_string()),
            ]
        );

        assert_eq!(tree.toggle("src"), Some(false));
        assert_eq!(visible(&tree).len(), 2);
        assert_eq!(tree.toggle("README.md"), None);
    }

    #[test]
    fn nested_directories_are_reachable() {
        let mut tree = FileTree::default();
        tree.set_root(vec![item("a", true)]);
        tree.set_children("a", vec![item("a/b", true)]);
        tree.set_children("a/b", vec![item("a/b/c.txt", false)]);
        tree.toggle("a");
        tree.toggle("a/b");

        assert_eq!(
            visible(&tree),
            vec![
                (0, "a".to_string()),
                (1, "a/b".to_string()),
                (2, "a/b/c.txt".to_string()),
            ]
        );
    }

    #[test]
    fn sibling_rename_stays_in_parent() {
        assert_eq!(sibling_path("src/old.rs", "new.rs"), "src/new.rs");
        assert_eq!(sibling_path("top.rs", "new.rs"), "new.rs");
    }
}
