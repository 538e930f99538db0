//! Box-drawn listing of the workspace for diagnostics.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Read-only snapshot of the workspace contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceTree {
    pub workspace_path: String,
    pub tree_lines: Vec<String>,
    pub tree_text: String,
}

impl WorkspaceTree {
    /// Walk `root` depth-first. Directories come before files at each level.
    pub fn capture(root: &Path) -> Self {
        let workspace_path = root.display().to_string();

        let mut tree_lines = vec![format!("{}/", workspace_path)];
        walk(root, "", &mut tree_lines);

        let tree_text = tree_lines.join("\n");
        Self {
            workspace_path,
            tree_lines,
            tree_text,
        }
    }
}

struct Entry {
    sorts_as_dir: bool,
    descend: bool,
    name: String,
    path: PathBuf,
}

fn walk(dir: &Path, prefix: &str, lines: &mut Vec<String>) {
    // Unreadable directories are left out of the listing
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    // Symlinked directories sort with directories but are never descended
    let mut items: Vec<Entry> = entries
        .filter_map(|e| e.ok())
        .map(|e| {
            let path = e.path();
            Entry {
                sorts_as_dir: path.is_dir(),
                descend: e.file_type().map(|t| t.is_dir()).unwrap_or(false),
                name: e.file_name().to_string_lossy().into_owned(),
                path,
            }
        })
        .collect();
    items.sort_by(|a, b| {
        b.sorts_as_dir
            .cmp(&a.sorts_as_dir)
            .then_with(|| a.name.cmp(&b.name))
    });

    let count = items.len();
    for (i, entry) in items.iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        lines.push(format!("{}{}{}", prefix, branch, entry.name));

        if entry.descend {
            let extension = if last { "    " } else { "│   " };
            walk(&entry.path, &format!("{}{}", prefix, extension), lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_workspace_lists_only_root() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = WorkspaceTree::capture(tmp.path());

        assert_eq!(tree.tree_lines, vec![format!("{}/", tmp.path().display())]);
        assert_eq!(tree.tree_text, tree.tree_lines[0]);
    }

    #[test]
    fn directories_sort_before_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("a.txt"), "").unwrap();
        fs::create_dir_all(root.join("zeta/inner")).unwrap();
        fs::write(root.join("zeta/file.rs"), "").unwrap();
        fs::create_dir(root.join("beta")).unwrap();

        let tree = WorkspaceTree::capture(root);
        assert_eq!(
            &tree.tree_lines[1..],
            &[
                "├── beta",
                "├── zeta",
                "│   ├── inner",
                "│   └── file.rs",
                "└── a.txt",
            ]
        );
    }

    #[test]
    fn last_directory_children_use_blank_indent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("only/child")).unwrap();

        let tree = WorkspaceTree::capture(root);
        assert_eq!(&tree.tree_lines[1..], &["└── only", "    └── child"]);
        assert!(tree.tree_text.ends_with("    └── child"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_descended() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        fs::create_dir_all(root.join("real/deep")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let tree = WorkspaceTree::capture(&root);
        assert_eq!(
            &tree.tree_lines[1..],
            &["├── link", "└── real", "    └── deep"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_sorts_before_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        fs::create_dir_all(root.join("zdir")).unwrap();
        fs::write(root.join("a.txt"), "").unwrap();
        std::os::unix::fs::symlink(root.join("zdir"), root.join("b-link")).unwrap();

        let tree = WorkspaceTree::capture(&root);
        assert_eq!(&tree.tree_lines[1..], &["├── b-link", "├── zdir", "└── a.txt"]);
    }
}
