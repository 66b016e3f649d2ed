//! Reviewer abstraction and the file-based review artifact contract.
//!
//! A file-based reviewer communicates through well-known paths inside the
//! reviewed tree: the orchestrator materializes the tree plus the
//! assignment and diff under `.review/`, the review command writes its
//! score, summary, and suggestions back to fixed paths, and the
//! orchestrator reads them out again.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::review::{Review, parse_score};
use crate::core::tree::Tree;
use crate::io::process::{command_from_argv, run_command_with_timeout};
use crate::io::snapshot::{materialize, reset_dir};

/// Input artifact: the original assignment.
pub const ASSIGNMENT_PATH: &str = ".review/assignment";
/// Input artifact: the changes under review, unified diff format.
pub const DIFF_PATH: &str = ".review/diff";
/// Output artifact: integer score, 0-10.
pub const SCORE_PATH: &str = ".review/score";
/// Output artifact: one-line summary.
pub const SUMMARY_PATH: &str = ".review/summary";
/// Output artifact: bulleted suggestions list.
pub const SUGGESTIONS_PATH: &str = ".review/suggestions";

/// Abstraction over review backends.
pub trait Reviewer {
    fn review(&self, assignment: &str, tree: &Tree, diff: &str) -> Result<Review>;
}

/// Reviewer that runs an external command against the materialized tree.
pub struct CommandReviewer {
    pub command: Vec<String>,
    pub scratch_dir: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl Reviewer for CommandReviewer {
    #[instrument(skip_all, fields(scratch = %self.scratch_dir.display()))]
    fn review(&self, assignment: &str, tree: &Tree, diff: &str) -> Result<Review> {
        reset_dir(&self.scratch_dir)?;
        materialize(tree, &self.scratch_dir)?;
        write_artifact(&self.scratch_dir.join(ASSIGNMENT_PATH), assignment)?;
        write_artifact(&self.scratch_dir.join(DIFF_PATH), diff)?;

        info!("starting reviewer command");
        let mut cmd = command_from_argv(&self.command)?;
        cmd.current_dir(&self.scratch_dir);
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)?;
        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "reviewer timed out");
            return Err(anyhow!("reviewer timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "reviewer failed");
            return Err(anyhow!(
                "reviewer failed with status {:?}\n{}",
                output.status.code(),
                output.combined()
            ));
        }

        let review = read_review(&self.scratch_dir)?;
        debug!(score = review.score, "parsed review");
        Ok(review)
    }
}

/// Read the three review artifacts back from a reviewed directory.
///
/// Missing artifacts are errors; an unparsable score surfaces the typed
/// [`ScoreParseError`](crate::core::review::ScoreParseError) for callers
/// that need to distinguish it.
pub fn read_review(dir: &Path) -> Result<Review> {
    let score_path = dir.join(SCORE_PATH);
    let raw_score = fs::read_to_string(&score_path)
        .with_context(|| format!("read review score {}", score_path.display()))?;
    let score = parse_score(&raw_score).map_err(anyhow::Error::new)?;

    let summary_path = dir.join(SUMMARY_PATH);
    let summary = fs::read_to_string(&summary_path)
        .with_context(|| format!("read review summary {}", summary_path.display()))?
        .trim_end()
        .to_string();

    let suggestions_path = dir.join(SUGGESTIONS_PATH);
    let suggestions = fs::read_to_string(&suggestions_path)
        .with_context(|| format!("read review suggestions {}", suggestions_path.display()))?
        .trim_end()
        .to_string();

    Ok(Review {
        score,
        summary,
        suggestions,
    })
}

fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
