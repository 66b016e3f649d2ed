//! Structural diff between two trees and its unified-text rendering.
//!
//! The text output follows the `diff -ruN before after` convention the rest
//! of the toolchain consumes: every changed file gets a `--- before/<path>` /
//! `+++ after/<path>` header, hunks use standard unified headers with three
//! lines of context, and non-UTF-8 contents collapse to a binary notice.

use std::sync::Arc;

use similar::{ChangeTag, TextDiff};

use crate::core::tree::Tree;

/// Path prefix for the "before" root in rendered diffs.
pub const BEFORE_PREFIX: &str = "before";
/// Path prefix for the "after" root in rendered diffs.
pub const AFTER_PREFIX: &str = "after";

/// A single per-path change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added {
        path: String,
        after: Arc<[u8]>,
    },
    Removed {
        path: String,
        before: Arc<[u8]>,
    },
    Modified {
        path: String,
        before: Arc<[u8]>,
        after: Arc<[u8]>,
    },
}

impl Change {
    pub fn path(&self) -> &str {
        match self {
            Change::Added { path, .. }
            | Change::Removed { path, .. }
            | Change::Modified { path, .. } => path,
        }
    }
}

/// Structural diff between two trees, ordered lexicographically by path.
///
/// Empty iff the trees are equal.
pub fn tree_diff(before: &Tree, after: &Tree) -> Vec<Change> {
    use std::cmp::Ordering;

    let mut changes = Vec::new();
    let mut before_iter = before.entries().peekable();
    let mut after_iter = after.entries().peekable();
    loop {
        let order = match (before_iter.peek(), after_iter.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((before_path, _)), Some((after_path, _))) => before_path.cmp(after_path),
        };
        match order {
            Ordering::Less => {
                if let Some((path, blob)) = before_iter.next() {
                    changes.push(Change::Removed {
                        path: path.to_string(),
                        before: Arc::clone(blob),
                    });
                }
            }
            Ordering::Greater => {
                if let Some((path, blob)) = after_iter.next() {
                    changes.push(Change::Added {
                        path: path.to_string(),
                        after: Arc::clone(blob),
                    });
                }
            }
            Ordering::Equal => {
                if let (Some((path, before_blob)), Some((_, after_blob))) =
                    (before_iter.next(), after_iter.next())
                    && before_blob != after_blob
                {
                    changes.push(Change::Modified {
                        path: path.to_string(),
                        before: Arc::clone(before_blob),
                        after: Arc::clone(after_blob),
                    });
                }
            }
        }
    }
    changes
}

/// Render change records as unified diff text with `before/` and `after/`
/// root prefixes. Returns an empty string for an empty change list.
pub fn render_unified(changes: &[Change]) -> String {
    let mut out = String::new();
    for change in changes {
        let path = change.path();
        let (before, after): (&[u8], &[u8]) = match change {
            Change::Added { after, .. } => (b"", after.as_ref()),
            Change::Removed { before, .. } => (before.as_ref(), b""),
            Change::Modified { before, after, .. } => (before.as_ref(), after.as_ref()),
        };
        match (std::str::from_utf8(before), std::str::from_utf8(after)) {
            (Ok(before_text), Ok(after_text)) => {
                render_text_file(&mut out, path, before_text, after_text);
            }
            _ => {
                out.push_str(&format!(
                    "Binary files {BEFORE_PREFIX}/{path} and {AFTER_PREFIX}/{path} differ\n"
                ));
            }
        }
    }
    out
}

fn render_text_file(out: &mut String, path: &str, before: &str, after: &str) {
    out.push_str(&format!("--- {BEFORE_PREFIX}/{path}\n"));
    out.push_str(&format!("+++ {AFTER_PREFIX}/{path}\n"));

    let diff = TextDiff::from_lines(before, after);
    for group in diff.grouped_ops(3) {
        let (old_start, old_count, new_start, new_count) = group.iter().fold(
            (usize::MAX, 0usize, usize::MAX, 0usize),
            |(os, oc, ns, nc), op| {
                let old_range = op.old_range();
                let new_range = op.new_range();
                (
                    os.min(old_range.start),
                    oc + old_range.len(),
                    ns.min(new_range.start),
                    nc + new_range.len(),
                )
            },
        );
        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            hunk_pos(old_start, old_count),
            hunk_pos(new_start, new_count)
        ));
        for op in &group {
            for line in diff.iter_changes(op) {
                let prefix = match line.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => " ",
                };
                out.push_str(prefix);
                out.push_str(line.value());
                if !line.value().ends_with('\n') {
                    out.push_str("\n\\ No newline at end of file\n");
                }
            }
        }
    }
}

/// Unified hunk position: 1-based start with count, with the conventional
/// 0-count form (`N,0`) anchored to the line before the insertion point.
fn hunk_pos(start: usize, count: usize) -> String {
    if count == 0 {
        format!("{start},0")
    } else {
        format!("{},{}", start + 1, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tree_of;

    #[test]
    fn equal_trees_produce_no_changes() {
        let tree = tree_of(&[("a.txt", "same\n")]);
        assert!(tree_diff(&tree, &tree.clone()).is_empty());
        assert_eq!(render_unified(&[]), "");
    }

    #[test]
    fn changes_are_ordered_lexicographically() {
        let before = tree_of(&[("b.txt", "old\n")]);
        let after = tree_of(&[("a.txt", "new\n"), ("c.txt", "new\n")]);
        let changes = tree_diff(&before, &after);
        let paths: Vec<&str> = changes.iter().map(Change::path).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt", "c.txt"]);
        assert!(matches!(changes[0], Change::Added { .. }));
        assert!(matches!(changes[1], Change::Removed { .. }));
    }

    #[test]
    fn added_file_renders_with_before_after_prefixes() {
        let before = tree_of(&[]);
        let after = tree_of(&[("main.go", "package main\n")]);
        let text = render_unified(&tree_diff(&before, &after));
        assert!(text.contains("--- before/main.go\n"));
        assert!(text.contains("+++ after/main.go\n"));
        assert!(text.contains("@@ -0,0 +1,1 @@\n"));
        assert!(text.contains("+package main\n"));
    }

    #[test]
    fn modified_file_renders_removed_and_added_lines() {
        let before = tree_of(&[("a.txt", "one\ntwo\nthree\n")]);
        let after = tree_of(&[("a.txt", "one\nTWO\nthree\n")]);
        let text = render_unified(&tree_diff(&before, &after));
        assert!(text.contains("-two\n"));
        assert!(text.contains("+TWO\n"));
        assert!(text.contains("@@ -1,3 +1,3 @@\n"));
    }

    #[test]
    fn binary_contents_render_as_notice() {
        let before = tree_of(&[]);
        let mut after = tree_of(&[]);
        after = after.write("blob.bin", [0xff, 0xfe, 0x00]).expect("write");
        let text = render_unified(&tree_diff(&before, &after));
        assert_eq!(
            text,
            "Binary files before/blob.bin and after/blob.bin differ\n"
        );
    }

    #[test]
    fn missing_trailing_newline_is_marked() {
        let before = tree_of(&[("a.txt", "line\n")]);
        let after = tree_of(&[("a.txt", "line")]);
        let text = render_unified(&tree_diff(&before, &after));
        assert!(text.contains("\\ No newline at end of file\n"));
    }
}
