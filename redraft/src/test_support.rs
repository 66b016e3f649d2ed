//! Scripted collaborator doubles for tests.
//!
//! Everything here plays back a pre-written script instead of running real
//! commands, so loop and workspace behavior can be asserted cycle by cycle.
//! Available to downstream tests via the `test-support` feature.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{Result, anyhow};

use crate::core::review::Review;
use crate::core::tree::Tree;
use crate::io::checker::{CheckOutcome, Checker};
use crate::io::generator::{GenerateRequest, Generator};
use crate::io::notifier::{Notifier, ReportSink};
use crate::io::reviewer::Reviewer;
use crate::workspace::Workspace;

/// Build a tree from `(path, contents)` pairs.
///
/// Panics on invalid paths; fixture paths are literals under test control.
pub fn tree_of(files: &[(&str, &str)]) -> Tree {
    let mut tree = Tree::new();
    for (path, contents) in files {
        tree = tree.write(path, contents).expect("fixture path");
    }
    tree
}

/// Build a review with the given score and summary, no suggestions.
pub fn review(score: u8, summary: &str) -> Review {
    Review {
        score,
        summary: summary.to_string(),
        suggestions: String::new(),
    }
}

/// One scripted workspace edit.
#[derive(Debug, Clone)]
pub enum ScriptedEdit {
    Write { path: String, contents: String },
    Remove { path: String },
}

impl ScriptedEdit {
    pub fn write(path: &str, contents: &str) -> Self {
        Self::Write {
            path: path.to_string(),
            contents: contents.to_string(),
        }
    }

    pub fn remove(path: &str) -> Self {
        Self::Remove {
            path: path.to_string(),
        }
    }
}

/// A generator that plays back one list of edits per call and records the
/// feedback score (if any) it was handed each time.
#[derive(Debug)]
pub struct ScriptedGenerator {
    edits: RefCell<VecDeque<Vec<ScriptedEdit>>>,
    calls: RefCell<usize>,
    feedback_scores: RefCell<Vec<Option<u8>>>,
}

impl ScriptedGenerator {
    pub fn new(edits: Vec<Vec<ScriptedEdit>>) -> Self {
        Self {
            edits: RefCell::new(edits.into()),
            calls: RefCell::new(0),
            feedback_scores: RefCell::new(Vec::new()),
        }
    }

    /// A generator that never changes the workspace, no matter how often
    /// it is called.
    pub fn no_op() -> Self {
        Self::new(Vec::new())
    }

    /// How many times `generate` has been called.
    pub fn calls(&self) -> usize {
        *self.calls.borrow()
    }

    /// The feedback score seen on each call, in call order. `None` means
    /// the call carried no feedback.
    pub fn feedback_scores(&self) -> Vec<Option<u8>> {
        self.feedback_scores.borrow().clone()
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, workspace: &mut Workspace, request: &GenerateRequest<'_>) -> Result<()> {
        *self.calls.borrow_mut() += 1;
        self.feedback_scores
            .borrow_mut()
            .push(request.feedback.map(|review| review.score));

        let Some(edits) = self.edits.borrow_mut().pop_front() else {
            return Ok(());
        };
        for edit in edits {
            match edit {
                ScriptedEdit::Write { path, contents } => workspace.write(&path, contents)?,
                ScriptedEdit::Remove { path } => workspace.remove(&path),
            }
        }
        Ok(())
    }
}

/// A reviewer that plays back a queue of canned reviews.
#[derive(Debug)]
pub struct ScriptedReviewer {
    reviews: RefCell<VecDeque<Review>>,
}

impl ScriptedReviewer {
    pub fn new(reviews: Vec<Review>) -> Self {
        Self {
            reviews: RefCell::new(reviews.into()),
        }
    }
}

impl Reviewer for ScriptedReviewer {
    fn review(&self, _assignment: &str, _tree: &Tree, _diff: &str) -> Result<Review> {
        self.reviews
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted reviewer ran out of reviews"))
    }
}

/// A checker that plays back a queue of outcomes and counts its calls.
#[derive(Debug)]
pub struct ScriptedChecker {
    outcomes: RefCell<VecDeque<CheckOutcome>>,
    calls: Rc<RefCell<usize>>,
}

impl ScriptedChecker {
    pub fn new(outcomes: Vec<CheckOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            calls: Rc::new(RefCell::new(0)),
        }
    }

    /// Shared call counter; survives moving the checker into a workspace.
    pub fn calls(&self) -> Rc<RefCell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl Checker for ScriptedChecker {
    fn check(&self, _tree: &Tree) -> Result<CheckOutcome> {
        *self.calls.borrow_mut() += 1;
        self.outcomes
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted checker ran out of outcomes"))
    }
}

/// A notifier that records every message into a shared log, optionally
/// failing each call after recording it.
#[derive(Debug)]
pub struct SharedNotifier {
    log: Rc<RefCell<Vec<String>>>,
    fail: bool,
}

impl SharedNotifier {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            fail: true,
        }
    }

    /// Shared message log; survives moving the notifier into a workspace.
    pub fn log(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.log)
    }
}

impl Default for SharedNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for SharedNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        self.log.borrow_mut().push(message.to_string());
        if self.fail {
            return Err(anyhow!("notifier is down"));
        }
        Ok(())
    }
}

/// A report sink that records every `(key, body)` publish.
#[derive(Debug, Default)]
pub struct RecordingSink {
    published: RefCell<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published.borrow().clone()
    }
}

impl ReportSink for RecordingSink {
    fn publish(&self, key: &str, body: &str) -> Result<()> {
        self.published
            .borrow_mut()
            .push((key.to_string(), body.to_string()));
        Ok(())
    }
}
