//! Immutable workspace trees with copy-on-write edits.
//!
//! A [`Tree`] maps slash-separated relative paths to file contents.
//! Directories are implied by the paths of the files inside them. Every edit
//! returns a new `Tree`; blob contents are behind `Arc`, so snapshots in a
//! checkpoint history share storage instead of deep-copying.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::core::glob::glob_regex;

/// An immutable mapping from relative file paths to byte contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    files: BTreeMap<String, Arc<[u8]>>,
}

/// A path that does not resolve to a file or directory in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub path: String,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path not found: {}", self.path)
    }
}

impl std::error::Error for NotFound {}

/// A path rejected by validation before touching the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPath {
    pub path: String,
    pub reason: &'static str,
}

impl fmt::Display for InvalidPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path '{}': {}", self.path, self.reason)
    }
}

impl std::error::Error for InvalidPath {}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// All file paths and contents, in lexicographic path order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Arc<[u8]>)> {
        self.files.iter().map(|(path, blob)| (path.as_str(), blob))
    }

    /// Return a new tree with `contents` at `path`, implying directories
    /// into existence. Fails when the path is not a valid relative file
    /// path, shadows an existing file, or names an existing directory.
    pub fn write(&self, path: &str, contents: impl AsRef<[u8]>) -> Result<Tree, InvalidPath> {
        validate_path(path)?;
        if self.is_dir(path) {
            return Err(InvalidPath {
                path: path.to_string(),
                reason: "path is an existing directory",
            });
        }
        if self.file_ancestor(path).is_some() {
            return Err(InvalidPath {
                path: path.to_string(),
                reason: "an ancestor of the path is an existing file",
            });
        }
        let mut files = self.files.clone();
        files.insert(path.to_string(), Arc::from(contents.as_ref()));
        Ok(Tree { files })
    }

    /// Return a new tree without the file at `path`. Removing a nonexistent
    /// file is a no-op.
    pub fn remove(&self, path: &str) -> Tree {
        if !self.files.contains_key(path) {
            return self.clone();
        }
        let mut files = self.files.clone();
        files.remove(path);
        Tree { files }
    }

    /// Return a new tree without `path` and everything below it. Removing a
    /// nonexistent subtree is a no-op.
    pub fn remove_subtree(&self, path: &str) -> Tree {
        let prefix = format!("{path}/");
        let files: BTreeMap<_, _> = self
            .files
            .iter()
            .filter(|(p, _)| p.as_str() != path && !p.starts_with(&prefix))
            .map(|(p, b)| (p.clone(), b.clone()))
            .collect();
        Tree { files }
    }

    /// Read the contents of the file at `path`.
    pub fn read(&self, path: &str) -> Result<&[u8], NotFound> {
        self.files
            .get(path)
            .map(|blob| blob.as_ref())
            .ok_or_else(|| NotFound {
                path: path.to_string(),
            })
    }

    /// Immediate entry names under `path` (`""` lists the root).
    pub fn list(&self, path: &str) -> Result<BTreeSet<String>, NotFound> {
        if !path.is_empty() && !self.is_dir(path) {
            return Err(NotFound {
                path: path.to_string(),
            });
        }
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        let mut entries = BTreeSet::new();
        for file_path in self.files.keys() {
            if let Some(rest) = file_path.strip_prefix(&prefix) {
                let name = rest.split('/').next().unwrap_or(rest);
                entries.insert(name.to_string());
            }
        }
        Ok(entries)
    }

    /// File paths matching a glob pattern, in lexicographic order.
    ///
    /// `**` matches any number of path segments, `*` matches within one
    /// segment. The returned iterator borrows the tree and can be restarted
    /// by calling `glob` again.
    pub fn glob<'a>(&'a self, pattern: &str) -> impl Iterator<Item = &'a str> {
        let matcher = glob_regex(pattern);
        self.files
            .keys()
            .map(String::as_str)
            .filter(move |path| matcher.is_match(path))
    }

    /// Return a new tree with every file of `other` copied in at `path`
    /// (`""` overlays at the root). Existing content is overwritten at file
    /// granularity.
    pub fn overlay(&self, path: &str, other: &Tree) -> Result<Tree, InvalidPath> {
        let mut result = self.clone();
        for (file_path, blob) in other.entries() {
            let target = if path.is_empty() {
                file_path.to_string()
            } else {
                format!("{path}/{file_path}")
            };
            validate_path(&target)?;
            // Overlay replaces files that become directories and vice versa.
            result = result.remove_subtree(&target);
            if let Some(ancestor) = result.file_ancestor(&target) {
                result = result.remove(ancestor);
            }
            let mut files = result.files;
            files.insert(target, blob.clone());
            result = Tree { files };
        }
        Ok(result)
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = format!("{path}/");
        self.files.keys().any(|p| p.starts_with(&prefix))
    }

    /// The longest strict ancestor of `path` that is an existing file, if any.
    fn file_ancestor<'a>(&self, path: &'a str) -> Option<&'a str> {
        let mut end = path.len();
        while let Some(slash) = path[..end].rfind('/') {
            let ancestor = &path[..slash];
            if self.files.contains_key(ancestor) {
                return Some(ancestor);
            }
            end = slash;
        }
        None
    }
}

fn validate_path(path: &str) -> Result<(), InvalidPath> {
    let err = |reason| {
        Err(InvalidPath {
            path: path.to_string(),
            reason,
        })
    };
    if path.is_empty() {
        return err("path is empty");
    }
    if path.starts_with('/') {
        return err("path must be relative");
    }
    if path.ends_with('/') {
        return err("path must not end with a slash");
    }
    for segment in path.split('/') {
        match segment {
            "" => return err("path contains an empty segment"),
            "." | ".." => return err("path must not contain '.' or '..' segments"),
            _ => {}
        }
    }
    Ok(())
}
