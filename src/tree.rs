//! ASCII directory tree of the relevant files.
//!
//! The tree is built bottom-up from the vault-relative path of each relevant
//! file, so a directory only exists in it when at least one relevant file
//! lives somewhere below it. Nodes own their children outright (a plain
//! map of maps); there are no parent links.
//!
//! ```text
//! ├── Projects
//! │   ├── Alpha
//! │   │   └── plan.md
//! │   └── index.md
//! └── inbox.md
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// One entry of the tree, keyed by its name in the parent's map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    File,
    Dir(BTreeMap<String, TreeNode>),
}

impl TreeNode {
    pub fn is_file(&self) -> bool {
        matches!(self, TreeNode::File)
    }
}

/// The top level of a rendered vault.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    children: BTreeMap<String, TreeNode>,
}

impl Tree {
    /// Build the minimal tree containing `files` and their ancestors.
    ///
    /// Files that are not below `vault_root` are skipped with a warning.
    pub fn from_files(files: &[PathBuf], vault_root: &Path) -> Self {
        let mut tree = Tree::default();
        for file in files {
            let relative = match file.strip_prefix(vault_root) {
                Ok(rel) => rel,
                Err(_) => {
                    warn!(
                        "{} is not inside {}; left out of the tree",
                        file.display(),
                        vault_root.display()
                    );
                    continue;
                }
            };
            let parts: Vec<String> = relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect();
            tree.insert(&parts);
        }
        tree
    }

    fn insert(&mut self, parts: &[String]) {
        let Some((file_name, dirs)) = parts.split_last() else {
            return;
        };
        let mut level = &mut self.children;
        for dir in dirs {
            let node = level
                .entry(dir.clone())
                .or_insert_with(|| TreeNode::Dir(BTreeMap::new()));
            level = match node {
                TreeNode::Dir(children) => children,
                TreeNode::File => {
                    warn!("'{}' is both a file and a directory; skipping", dir);
                    return;
                }
            };
        }
        level.entry(file_name.clone()).or_insert(TreeNode::File);
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Box-drawing lines, depth first, directories before files.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        render_level(&self.children, "", &mut lines);
        lines.join("\n")
    }
}

/// Render `files` as a tree, or `None` when there is nothing to draw.
pub fn render_tree(files: &[PathBuf], vault_root: &Path) -> Option<String> {
    if files.is_empty() {
        return None;
    }
    let tree = Tree::from_files(files, vault_root);
    if tree.is_empty() {
        return None;
    }
    Some(tree.render())
}

fn sibling_order(a: &(&String, &TreeNode), b: &(&String, &TreeNode)) -> Ordering {
    a.1.is_file()
        .cmp(&b.1.is_file())
        .then_with(|| a.0.to_lowercase().cmp(&b.0.to_lowercase()))
        .then_with(|| a.0.cmp(b.0))
}

fn render_level(children: &BTreeMap<String, TreeNode>, prefix: &str, lines: &mut Vec<String>) {
    let mut entries: Vec<(&String, &TreeNode)> = children.iter().collect();
    entries.sort_by(sibling_order);

    let count = entries.len();
    for (i, (name, node)) in entries.into_iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { LAST_BRANCH } else { BRANCH };
        lines.push(format!("{}{}{}", prefix, connector, name));

        if let TreeNode::Dir(sub) = node {
            let continuation = if is_last { SPACE } else { PIPE };
            render_level(sub, &format!("{}{}", prefix, continuation), lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paths(root: &Path, rels: &[&str]) -> Vec<PathBuf> {
        rels.iter().map(|r| root.join(r)).collect()
    }

    #[test]
    fn test_empty_input_is_none() {
        assert_eq!(render_tree(&[], Path::new("/vault")), None);
    }

    #[test]
    fn test_dirs_before_files() {
        let root = Path::new("/vault");
        let files = paths(root, &["A/B/y.md", "A/x.md"]);
        let expected = "\
└── A
    ├── B
    │   └── y.md
    └── x.md";
        assert_eq!(render_tree(&files, root).unwrap(), expected);
    }

    #[test]
    fn test_case_insensitive_order_and_root_files() {
        let root = Path::new("/vault");
        let files = paths(
            root,
            &["beta.md", "Alpha.md", "docs/z.md", "Archive/old.md", "docs/a.md"],
        );
        let expected = "\
├── Archive
│   └── old.md
├── docs
│   ├── a.md
│   └── z.md
├── Alpha.md
└── beta.md";
        assert_eq!(render_tree(&files, root).unwrap(), expected);
    }

    #[test]
    fn test_single_root_file() {
        let root = Path::new("/vault");
        let files = paths(root, &["note.md"]);
        assert_eq!(render_tree(&files, root).unwrap(), "└── note.md");
    }

    #[test]
    fn test_only_ancestors_are_materialized() {
        let root = Path::new("/vault");
        let files = paths(root, &["a/b/c/deep.md"]);
        let tree = Tree::from_files(&files, root);
        assert_eq!(tree.children.len(), 1);
        let rendered = tree.render();
        assert_eq!(
            rendered,
            "└── a\n    └── b\n        └── c\n            └── deep.md"
        );
        // Every directory line has a file somewhere below it.
        for dir in ["a", "b", "c"] {
            assert!(rendered.contains(dir));
        }
    }

    #[test]
    fn test_outside_files_skipped() {
        let root = Path::new("/vault");
        let files = vec![PathBuf::from("/elsewhere/x.md")];
        assert_eq!(render_tree(&files, root), None);

        let files = vec![PathBuf::from("/elsewhere/x.md"), root.join("in.md")];
        assert_eq!(render_tree(&files, root).unwrap(), "└── in.md");
    }

    #[test]
    fn test_duplicate_paths_collapse() {
        let root = Path::new("/vault");
        let files = paths(root, &["a/x.md", "a/x.md"]);
        assert_eq!(render_tree(&files, root).unwrap(), "└── a\n    └── x.md");
    }
}
