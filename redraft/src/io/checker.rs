//! Validity gate over a workspace tree.
//!
//! A checker is a pass/fail capability: given a tree, it either passes or
//! fails with diagnostic text (typically compiler or test output). Checkers
//! are assumed deterministic for a given tree; the loop never retries them.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::core::tree::Tree;
use crate::io::process::{command_from_argv, run_command_with_timeout};
use crate::io::snapshot::{materialize, reset_dir};

/// Outcome of one checker invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Pass,
    Fail { diagnostics: String },
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, CheckOutcome::Pass)
    }
}

/// Abstraction over validity gates.
pub trait Checker {
    fn check(&self, tree: &Tree) -> Result<CheckOutcome>;
}

/// Checker that materializes the tree and runs a build/test command in it.
///
/// Non-zero exit is a `Fail` carrying the captured output; a timeout is a
/// `Fail` with a timeout notice. Only spawn-level problems are errors.
pub struct CommandChecker {
    pub command: Vec<String>,
    pub scratch_dir: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl Checker for CommandChecker {
    #[instrument(skip_all, fields(scratch = %self.scratch_dir.display()))]
    fn check(&self, tree: &Tree) -> Result<CheckOutcome> {
        reset_dir(&self.scratch_dir)?;
        materialize(tree, &self.scratch_dir)?;

        let mut cmd = command_from_argv(&self.command)?;
        cmd.current_dir(&self.scratch_dir);
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)?;

        if output.timed_out {
            return Ok(CheckOutcome::Fail {
                diagnostics: format!("check timed out after {:?}", self.timeout),
            });
        }
        if output.status.success() {
            debug!("check passed");
            return Ok(CheckOutcome::Pass);
        }
        debug!(exit_code = ?output.status.code(), "check failed");
        Ok(CheckOutcome::Fail {
            diagnostics: output.combined(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tree_of;

    fn checker(temp: &tempfile::TempDir, script: &str) -> CommandChecker {
        CommandChecker {
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            scratch_dir: temp.path().join("check"),
            timeout: Duration::from_secs(5),
            output_limit_bytes: 10_000,
        }
    }

    #[test]
    fn passing_command_yields_pass() {
        let temp = tempfile::tempdir().expect("tempdir");
        let outcome = checker(&temp, "exit 0")
            .check(&tree_of(&[("main.go", "")]))
            .expect("check");
        assert_eq!(outcome, CheckOutcome::Pass);
    }

    #[test]
    fn failing_command_yields_fail_with_diagnostics() {
        let temp = tempfile::tempdir().expect("tempdir");
        let outcome = checker(&temp, "echo boom >&2; exit 1")
            .check(&tree_of(&[]))
            .expect("check");
        match outcome {
            CheckOutcome::Fail { diagnostics } => assert!(diagnostics.contains("boom")),
            CheckOutcome::Pass => panic!("expected failure"),
        }
    }

    /// The command sees the materialized tree, not an empty directory.
    #[test]
    fn command_runs_against_materialized_tree() {
        let temp = tempfile::tempdir().expect("tempdir");
        let outcome = checker(&temp, "test -f src/lib.rs")
            .check(&tree_of(&[("src/lib.rs", "pub fn x() {}\n")]))
            .expect("check");
        assert_eq!(outcome, CheckOutcome::Pass);
    }
}
