//! Session state for one code-modification task.
//!
//! A [`Workspace`] pairs a fixed starting tree with a live current tree and
//! an append-only checkpoint history. Edits replace `current` with a new
//! tree value; `start` never changes after construction, and no operation
//! removes or reorders checkpoints. The workspace is owned exclusively by
//! the task processing it.

use std::collections::BTreeSet;
use std::fmt;

use anyhow::{Context, Result};

use crate::core::diff::{render_unified, tree_diff};
use crate::core::tree::Tree;
use crate::io::checker::{CheckOutcome, Checker};
use crate::io::notifier::Notifier;

/// A named, retained snapshot of the current tree.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub description: String,
    pub tree: Tree,
}

/// A workspace for editing files and checking the result.
pub struct Workspace {
    start: Tree,
    current: Tree,
    checkpoints: Vec<Checkpoint>,
    checkers: Vec<Box<dyn Checker>>,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("start_files", &self.start.len())
            .field("current_files", &self.current.len())
            .field("checkpoints", &self.checkpoints.len())
            .field("checkers", &self.checkers.len())
            .field("notifiers", &self.notifiers.len())
            .finish()
    }
}

impl Workspace {
    /// Create a workspace whose session reference point is `start`.
    pub fn new(start: Tree) -> Self {
        Self {
            current: start.clone(),
            start,
            checkpoints: Vec::new(),
            checkers: Vec::new(),
            notifiers: Vec::new(),
        }
    }

    pub fn with_checker(mut self, checker: Box<dyn Checker>) -> Self {
        self.checkers.push(checker);
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn start(&self) -> &Tree {
        &self.start
    }

    pub fn current(&self) -> &Tree {
        &self.current
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Replace the current tree wholesale. This is the generator boundary:
    /// the loop trusts whatever state the generator hands back.
    pub fn set_current(&mut self, tree: Tree) {
        self.current = tree;
    }

    /// Write to a file in the workspace.
    pub fn write(&mut self, path: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        self.current = self
            .current
            .write(path, contents)
            .with_context(|| format!("write {path}"))?;
        Ok(())
    }

    /// Remove a file from the workspace. Removing a missing file is a no-op.
    pub fn remove(&mut self, path: &str) {
        self.current = self.current.remove(path);
    }

    /// Remove a directory (and everything below it) from the workspace.
    pub fn remove_subtree(&mut self, path: &str) {
        self.current = self.current.remove_subtree(path);
    }

    /// Copy an entire tree into the workspace at `path`, overwriting at
    /// file granularity.
    pub fn overlay(&mut self, path: &str, tree: &Tree) -> Result<()> {
        self.current = self
            .current
            .overlay(path, tree)
            .with_context(|| format!("overlay at {path:?}"))?;
        Ok(())
    }

    /// Read the contents of a file in the workspace.
    pub fn read(&self, path: &str) -> Result<&[u8]> {
        self.current.read(path).map_err(anyhow::Error::new)
    }

    /// List the immediate entries of a directory in the workspace.
    pub fn list(&self, path: &str) -> Result<BTreeSet<String>> {
        self.current.list(path).map_err(anyhow::Error::new)
    }

    /// Walk all files matching a glob pattern.
    pub fn walk(&self, pattern: &str) -> Vec<String> {
        self.current.glob(pattern).map(str::to_string).collect()
    }

    /// Run every attached checker against the current tree, short-circuiting
    /// on the first failure. With no checkers attached this always passes.
    pub fn check(&self) -> Result<CheckOutcome> {
        for checker in &self.checkers {
            match checker.check(&self.current)? {
                CheckOutcome::Pass => {}
                fail @ CheckOutcome::Fail { .. } => return Ok(fail),
            }
        }
        Ok(CheckOutcome::Pass)
    }

    /// All changes since the start of the session, in unified diff format
    /// with `before/` (start) and `after/` (current) prefixes.
    pub fn diff(&self) -> String {
        render_unified(&tree_diff(&self.start, &self.current))
    }

    /// Save a named snapshot of the current tree, then notify.
    ///
    /// The checkpoint is recorded before any notifier runs: a notifier
    /// failure propagates to the caller but the checkpoint stays. Checkpoint
    /// success is authoritative; notification is not transactional with it.
    pub fn save(&mut self, description: &str) -> Result<()> {
        self.checkpoints.push(Checkpoint {
            description: description.to_string(),
            tree: self.current.clone(),
        });
        for notifier in &self.notifiers {
            notifier
                .notify(description)
                .with_context(|| format!("notify checkpoint {description:?}"))?;
        }
        Ok(())
    }

    /// Descriptions of all checkpoints so far, first to last.
    pub fn history(&self) -> Vec<&str> {
        self.checkpoints
            .iter()
            .map(|checkpoint| checkpoint.description.as_str())
            .collect()
    }

    /// Reset the current tree to the session's starting state. Checkpoint
    /// history is retained.
    pub fn reset(&mut self) {
        self.current = self.start.clone();
    }
}
