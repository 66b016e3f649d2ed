//! The bounded refine-and-review loop.
//!
//! One loop instance drives one task end to end, strictly sequentially:
//! each cycle drafts (generator), then reviews (reviewer), then either
//! accepts, retries with the review as feedback, or gives up once the cycle
//! budget is spent. Running out of cycles is not an error; the caller gets
//! the best-effort result with its last review attached and decides what to
//! do with it.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::core::report::ProgressReport;
use crate::core::review::{DEFAULT_ACCEPT_THRESHOLD, Review};
use crate::io::cycle_log::write_cycle;
use crate::io::generator::{GenerateRequest, Generator};
use crate::io::notifier::ReportSink;
use crate::io::reviewer::Reviewer;
use crate::workspace::Workspace;

/// Loop policy. Injectable so tests can run the loop against scripted
/// collaborators without a real generator or reviewer.
#[derive(Debug, Clone)]
pub struct RefineConfig {
    /// Maximum number of draft/review cycles.
    pub max_cycles: u32,
    /// Review score at which a draft is accepted (`>=` comparison).
    pub accept_threshold: u8,
    /// Key under which progress reports are published.
    pub report_key: String,
    /// When set, each cycle writes review/diff artifacts under this root.
    pub log_root: Option<PathBuf>,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_cycles: 5,
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            report_key: "redraft".to_string(),
            log_root: None,
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefineStop {
    /// A review met the accept threshold.
    Accepted { cycle: u32 },
    /// The cycle budget ran out without an accepting review.
    Exhausted,
}

/// Summary of one refinement session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineOutcome {
    pub stop: RefineStop,
    /// One review per executed cycle, first to last.
    pub reviews: Vec<Review>,
    /// Final unified diff against the session's starting tree.
    pub diff: String,
}

/// A session that produced zero diff against its starting tree.
///
/// Raised by callers that publish changes downstream, never by the loop
/// itself; a no-op session needs caller attention rather than a
/// pull-request with nothing in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyChangeError;

impl fmt::Display for EmptyChangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session produced no changes against the starting tree")
    }
}

impl std::error::Error for EmptyChangeError {}

/// Drive draft/review cycles until a review accepts or the budget runs out.
///
/// Each cycle: the generator advances the workspace (with the previous
/// review as feedback, if any), the reviewer scores the drift from the
/// session start, and the progress report gains a `review-{cycle}` task row
/// and is published. The loop always finalizes by appending the overall
/// diff to the report summary and publishing once more, for accepted and
/// exhausted sessions alike.
pub fn run_refine<G, R, S>(
    workspace: &mut Workspace,
    assignment: &str,
    generator: &G,
    reviewer: &R,
    report: &mut ProgressReport,
    sink: &S,
    config: &RefineConfig,
) -> Result<RefineOutcome>
where
    G: Generator,
    R: Reviewer,
    S: ReportSink,
{
    if config.max_cycles == 0 {
        return Err(anyhow!("max_cycles must be > 0"));
    }

    let mut reviews: Vec<Review> = Vec::new();
    let mut stop = RefineStop::Exhausted;

    for cycle in 1..=config.max_cycles {
        // Drafting: the generator's resulting state is trusted as-is.
        let request = GenerateRequest {
            assignment,
            feedback: reviews.last(),
        };
        generator
            .generate(workspace, &request)
            .with_context(|| format!("generate (cycle {cycle})"))?;

        // Reviewing: always against total drift since session start.
        let diff = workspace.diff();
        let review = reviewer
            .review(assignment, workspace.current(), &diff)
            .with_context(|| format!("review (cycle {cycle})"))?;
        let accepted = review.accepted(config.accept_threshold);
        info!(cycle, score = review.score, accepted, "review complete");

        let glyph = if accepted { "✅" } else { "❗" };
        report.start_task(
            &format!("review-{cycle}"),
            &format!("Code review #{cycle}"),
            &format!("{glyph} {}/10: {}", review.score, review.summary),
        );
        sink.publish(&config.report_key, &report.render())
            .with_context(|| format!("publish review progress (cycle {cycle})"))?;

        if let Some(log_root) = &config.log_root {
            write_cycle(log_root, cycle, &review, accepted, &diff)
                .with_context(|| format!("write cycle log (cycle {cycle})"))?;
        }

        reviews.push(review);
        if accepted {
            stop = RefineStop::Accepted { cycle };
            break;
        }
    }

    let diff = workspace.diff();
    report.append_summary(&format!("\n### Result\n\n```\n{diff}\n```\n"));
    sink.publish(&config.report_key, &report.render())
        .context("publish final progress")?;

    Ok(RefineOutcome {
        stop,
        reviews,
        diff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::review::ScoreParseError;
    use crate::core::tree::Tree;
    use crate::test_support::{
        RecordingSink, ScriptedEdit, ScriptedGenerator, ScriptedReviewer, review,
    };

    fn config() -> RefineConfig {
        RefineConfig::default()
    }

    /// Scenario: empty start, the generator writes one file, the reviewer
    /// scores 8 on cycle 1. The loop accepts after exactly one cycle and
    /// the final diff shows the added file.
    #[test]
    fn accepts_on_first_cycle() {
        let mut ws = Workspace::new(Tree::new());
        let generator = ScriptedGenerator::new(vec![vec![ScriptedEdit::write(
            "main.go",
            "package main\n",
        )]]);
        let reviewer = ScriptedReviewer::new(vec![review(8, "ship it")]);
        let sink = RecordingSink::new();
        let mut report = ProgressReport::new();

        let outcome = run_refine(
            &mut ws,
            "write fizzbuzz",
            &generator,
            &reviewer,
            &mut report,
            &sink,
            &config(),
        )
        .expect("refine");

        assert_eq!(outcome.stop, RefineStop::Accepted { cycle: 1 });
        assert_eq!(outcome.reviews.len(), 1);
        assert!(outcome.diff.contains("+++ after/main.go"));
        // One publish per cycle plus the final one.
        assert_eq!(sink.published().len(), 2);
    }

    /// Scenario: the generator never changes anything and the reviewer
    /// always scores 3. The loop runs exactly `max_cycles` cycles, ends
    /// exhausted, and the final diff is empty.
    #[test]
    fn exhausts_after_max_cycles() {
        let mut ws = Workspace::new(Tree::new());
        let generator = ScriptedGenerator::no_op();
        let reviewer = ScriptedReviewer::new(vec![
            review(3, "weak"),
            review(3, "weak"),
            review(3, "weak"),
            review(3, "weak"),
            review(3, "weak"),
        ]);
        let sink = RecordingSink::new();
        let mut report = ProgressReport::new();

        let outcome = run_refine(
            &mut ws,
            "impossible task",
            &generator,
            &reviewer,
            &mut report,
            &sink,
            &config(),
        )
        .expect("refine");

        assert_eq!(outcome.stop, RefineStop::Exhausted);
        assert_eq!(outcome.reviews.len(), 5);
        assert_eq!(outcome.diff, "");
        assert_eq!(generator.calls(), 5);
        assert_eq!(sink.published().len(), 6);
    }

    /// A score exactly at the threshold accepts.
    #[test]
    fn threshold_tie_accepts() {
        let mut ws = Workspace::new(Tree::new());
        let generator = ScriptedGenerator::no_op();
        let reviewer = ScriptedReviewer::new(vec![review(7, "barely")]);
        let sink = RecordingSink::new();
        let mut report = ProgressReport::new();

        let outcome = run_refine(
            &mut ws,
            "task",
            &generator,
            &reviewer,
            &mut report,
            &sink,
            &config(),
        )
        .expect("refine");
        assert_eq!(outcome.stop, RefineStop::Accepted { cycle: 1 });
    }

    /// The previous cycle's review is threaded into the next generator
    /// call as feedback; the first call has none.
    #[test]
    fn feedback_carries_the_previous_review() {
        let mut ws = Workspace::new(Tree::new());
        let generator = ScriptedGenerator::no_op();
        let reviewer = ScriptedReviewer::new(vec![review(3, "weak"), review(9, "fixed")]);
        let sink = RecordingSink::new();
        let mut report = ProgressReport::new();

        let outcome = run_refine(
            &mut ws,
            "task",
            &generator,
            &reviewer,
            &mut report,
            &sink,
            &config(),
        )
        .expect("refine");

        assert_eq!(outcome.stop, RefineStop::Accepted { cycle: 2 });
        assert_eq!(generator.feedback_scores(), vec![None, Some(3)]);
    }

    #[test]
    fn report_gains_review_tasks_and_result_summary() {
        let mut ws = Workspace::new(Tree::new());
        let generator = ScriptedGenerator::new(vec![vec![ScriptedEdit::write("a.txt", "x\n")]]);
        let reviewer = ScriptedReviewer::new(vec![review(8, "good")]);
        let sink = RecordingSink::new();
        let mut report = ProgressReport::new();

        run_refine(
            &mut ws,
            "task",
            &generator,
            &reviewer,
            &mut report,
            &sink,
            &config(),
        )
        .expect("refine");

        let tasks = report.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].key, "review-1");
        assert_eq!(tasks[0].description, "Code review #1");
        assert_eq!(tasks[0].status, "✅ 8/10: good");
        assert!(report.summary().contains("### Result"));

        let (key, final_body) = sink.published().last().cloned().expect("final publish");
        assert_eq!(key, "redraft");
        assert!(final_body.contains("+++ after/a.txt"));
    }

    /// Reviewer errors are fatal to the cycle and carry the cycle index as
    /// context; a bad score is never treated as a low score.
    #[test]
    fn reviewer_errors_propagate_with_cycle_context() {
        struct BadScoreReviewer;
        impl Reviewer for BadScoreReviewer {
            fn review(&self, _: &str, _: &Tree, _: &str) -> Result<Review> {
                Err(anyhow::Error::new(ScoreParseError::NotAnInteger {
                    raw: "great".to_string(),
                }))
            }
        }

        let mut ws = Workspace::new(Tree::new());
        let generator = ScriptedGenerator::no_op();
        let sink = RecordingSink::new();
        let mut report = ProgressReport::new();

        let err = run_refine(
            &mut ws,
            "task",
            &generator,
            &BadScoreReviewer,
            &mut report,
            &sink,
            &config(),
        )
        .expect_err("refine should fail");

        assert!(format!("{err:#}").contains("cycle 1"));
        assert!(err.chain().any(|cause| cause.is::<ScoreParseError>()));
    }

    /// Cycle logs are written when a log root is configured.
    #[test]
    fn writes_cycle_logs_when_configured() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut ws = Workspace::new(Tree::new());
        let generator = ScriptedGenerator::no_op();
        let reviewer = ScriptedReviewer::new(vec![review(8, "good")]);
        let sink = RecordingSink::new();
        let mut report = ProgressReport::new();
        let cfg = RefineConfig {
            log_root: Some(temp.path().to_path_buf()),
            ..RefineConfig::default()
        };

        run_refine(
            &mut ws,
            "task",
            &generator,
            &reviewer,
            &mut report,
            &sink,
            &cfg,
        )
        .expect("refine");

        assert!(temp.path().join("1/review.json").is_file());
        assert!(temp.path().join("1/diff.patch").is_file());
    }
}
