//! Bridging trees to real directories for command-backed collaborators.
//!
//! Command generators, reviewers, and checkers run external programs that
//! only understand the filesystem. `materialize` lays a [`Tree`] out on
//! disk; `capture` reads a directory back into a `Tree`, skipping control
//! directories that belong to the harness rather than the work.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use walkdir::WalkDir;

use crate::core::tree::Tree;

/// Top-level directories excluded from capture: version control and the
/// harness's own control files.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", ".redraft", ".review"];

/// Write every file of `tree` under `root`, creating parent directories.
pub fn materialize(tree: &Tree, root: &Path) -> Result<()> {
    fs::create_dir_all(root).with_context(|| format!("create {}", root.display()))?;
    for (path, blob) in tree.entries() {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&full, blob).with_context(|| format!("write {}", full.display()))?;
    }
    Ok(())
}

/// Read a directory into a [`Tree`], skipping `excludes` at the top level.
pub fn capture(root: &Path, excludes: &[&str]) -> Result<Tree> {
    let mut tree = Tree::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.depth() != 1 {
            return true;
        }
        match entry.file_name().to_str() {
            Some(name) => !excludes.contains(&name),
            None => true,
        }
    });
    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("strip prefix {}", root.display()))?;
        let path = relative
            .to_str()
            .ok_or_else(|| anyhow!("non-UTF-8 path {}", relative.display()))?
            .replace('\\', "/");
        let contents =
            fs::read(entry.path()).with_context(|| format!("read {}", entry.path().display()))?;
        tree = tree
            .write(&path, contents)
            .with_context(|| format!("capture {path}"))?;
    }
    Ok(tree)
}

/// Clear and recreate a scratch directory.
pub fn reset_dir(root: &Path) -> Result<()> {
    if root.exists() {
        fs::remove_dir_all(root).with_context(|| format!("remove {}", root.display()))?;
    }
    fs::create_dir_all(root).with_context(|| format!("create {}", root.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tree_of;

    #[test]
    fn materialize_then_capture_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tree = tree_of(&[("main.go", "package main\n"), ("docs/a.md", "# a\n")]);

        materialize(&tree, temp.path()).expect("materialize");
        let captured = capture(temp.path(), DEFAULT_EXCLUDES).expect("capture");
        assert_eq!(captured, tree);
    }

    #[test]
    fn capture_skips_excluded_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tree = tree_of(&[
            ("kept.txt", "x"),
            (".git/config", "noise"),
            (".redraft/assignment.md", "control"),
        ]);
        materialize(&tree, temp.path()).expect("materialize");

        let captured = capture(temp.path(), DEFAULT_EXCLUDES).expect("capture");
        assert_eq!(captured, tree_of(&[("kept.txt", "x")]));
    }

    #[test]
    fn reset_dir_clears_previous_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let scratch = temp.path().join("scratch");
        fs::create_dir_all(&scratch).expect("mkdir");
        fs::write(scratch.join("stale.txt"), "old").expect("write");

        reset_dir(&scratch).expect("reset");
        assert!(scratch.exists());
        assert!(!scratch.join("stale.txt").exists());
    }
}
