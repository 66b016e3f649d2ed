//! Generator abstraction for drafting workspace changes.
//!
//! The [`Generator`] trait decouples the refinement loop from the agent
//! backend that actually edits code. Tests use scripted generators that
//! apply predetermined edits without spawning processes.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::review::Review;
use crate::io::process::{command_from_argv, run_command_with_timeout};
use crate::io::snapshot::{DEFAULT_EXCLUDES, capture, materialize, reset_dir};
use crate::workspace::Workspace;

/// Where a command generator finds its brief inside the scratch directory.
pub const ASSIGNMENT_PATH: &str = ".redraft/assignment.md";

/// Inputs for one drafting pass.
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    /// Description of the task to perform.
    pub assignment: &'a str,
    /// Review of the previous draft, to apply as feedback.
    pub feedback: Option<&'a Review>,
}

/// Abstraction over code-generating agent backends.
///
/// A generator advances the workspace toward completing the assignment; the
/// loop replaces its view of the workspace with whatever state the
/// generator leaves behind, unconditionally.
pub trait Generator {
    fn generate(&self, workspace: &mut Workspace, request: &GenerateRequest<'_>) -> Result<()>;
}

/// Generator that hands the workspace to an external agent command.
///
/// The current tree is materialized into the scratch directory together
/// with the assignment (and any review feedback) at [`ASSIGNMENT_PATH`];
/// the command runs with the scratch directory as its working directory and
/// edits files in place; the directory is then captured back as the new
/// current tree.
pub struct CommandGenerator {
    pub command: Vec<String>,
    pub scratch_dir: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl Generator for CommandGenerator {
    #[instrument(skip_all, fields(scratch = %self.scratch_dir.display()))]
    fn generate(&self, workspace: &mut Workspace, request: &GenerateRequest<'_>) -> Result<()> {
        reset_dir(&self.scratch_dir)?;
        materialize(workspace.current(), &self.scratch_dir)?;

        let brief_path = self.scratch_dir.join(ASSIGNMENT_PATH);
        if let Some(parent) = brief_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&brief_path, render_brief(request))
            .with_context(|| format!("write {}", brief_path.display()))?;

        info!("starting generator command");
        let mut cmd = command_from_argv(&self.command)?;
        cmd.current_dir(&self.scratch_dir);
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)?;
        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "generator timed out");
            return Err(anyhow!("generator timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "generator failed");
            return Err(anyhow!(
                "generator failed with status {:?}\n{}",
                output.status.code(),
                output.combined()
            ));
        }

        let tree = capture(&self.scratch_dir, DEFAULT_EXCLUDES)?;
        debug!(files = tree.len(), "captured generator output");
        workspace.set_current(tree);
        Ok(())
    }
}

fn render_brief(request: &GenerateRequest<'_>) -> String {
    let mut brief = format!("# Assignment\n\n{}\n", request.assignment);
    if let Some(review) = request.feedback {
        brief.push_str(&format!(
            "\n# Previous review\n\nAt the last review, you received the score: {}/10.\n\
             Apply these suggestions for improvement:\n\n{}\n",
            review.score, review.suggestions
        ));
    }
    brief
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::Tree;
    use crate::test_support::tree_of;

    fn generator(temp: &tempfile::TempDir, script: &str) -> CommandGenerator {
        CommandGenerator {
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            scratch_dir: temp.path().join("gen"),
            timeout: Duration::from_secs(5),
            output_limit_bytes: 10_000,
        }
    }

    #[test]
    fn command_edits_become_the_new_current_tree() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut ws = Workspace::new(tree_of(&[("keep.txt", "kept")]));
        let request = GenerateRequest {
            assignment: "add a greeting",
            feedback: None,
        };

        generator(&temp, "printf 'hello\\n' > hello.txt")
            .generate(&mut ws, &request)
            .expect("generate");

        assert_eq!(ws.read("hello.txt").expect("read"), b"hello\n");
        assert_eq!(ws.read("keep.txt").expect("read"), b"kept");
    }

    /// The assignment brief is visible to the command but excluded from the
    /// captured tree.
    #[test]
    fn brief_is_written_but_not_captured() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut ws = Workspace::new(Tree::new());
        let request = GenerateRequest {
            assignment: "task",
            feedback: None,
        };

        generator(
            &temp,
            "test -f .redraft/assignment.md && cp .redraft/assignment.md seen.md",
        )
        .generate(&mut ws, &request)
        .expect("generate");

        assert!(ws.read("seen.md").is_ok());
        assert!(ws.read(ASSIGNMENT_PATH).is_err());
    }

    #[test]
    fn feedback_is_rendered_into_the_brief() {
        let review = Review {
            score: 4,
            summary: "missing tests".to_string(),
            suggestions: "- add unit tests".to_string(),
        };
        let brief = render_brief(&GenerateRequest {
            assignment: "task",
            feedback: Some(&review),
        });
        assert!(brief.contains("score: 4/10"));
        assert!(brief.contains("- add unit tests"));
    }

    #[test]
    fn failing_command_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut ws = Workspace::new(Tree::new());
        let request = GenerateRequest {
            assignment: "task",
            feedback: None,
        };
        let err = generator(&temp, "echo broken >&2; exit 1")
            .generate(&mut ws, &request)
            .expect_err("generate should fail");
        assert!(format!("{err:#}").contains("broken"));
    }
}
