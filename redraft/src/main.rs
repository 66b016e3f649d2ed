//! Iterative code-refinement session runner.
//!
//! Drives an external generator command through bounded draft-and-review
//! cycles over a snapshot of a project directory, publishing a progress
//! report as it goes and printing the final diff on stdout.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};

use redraft::core::report::ProgressReport;
use redraft::exit_codes;
use redraft::io::checker::{CheckOutcome, CommandChecker};
use redraft::io::config::{RunConfig, load_config, write_config};
use redraft::io::generator::CommandGenerator;
use redraft::io::notifier::FileSink;
use redraft::io::reviewer::CommandReviewer;
use redraft::io::snapshot::{DEFAULT_EXCLUDES, capture};
use redraft::logging;
use redraft::refine::{EmptyChangeError, RefineConfig, RefineStop, run_refine};
use redraft::workspace::Workspace;

const CONFIG_FILE: &str = "redraft.toml";

#[derive(Parser)]
#[command(
    name = "redraft",
    version,
    about = "Iterative code-refinement session runner"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `redraft.toml` if missing.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
        /// Project directory.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Run draft/review cycles for an assignment and print the final diff.
    Run {
        /// File holding the assignment text.
        #[arg(short, long)]
        assignment: PathBuf,
        /// Project directory to snapshot and refine.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Config file path (defaults to `redraft.toml` under --dir).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the configured checker against the project directory.
    Check {
        /// Project directory to snapshot and check.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Config file path (defaults to `redraft.toml` under --dir).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            let code = if err.chain().any(|cause| cause.is::<EmptyChangeError>()) {
                exit_codes::NO_CHANGES
            } else {
                exit_codes::INVALID
            };
            std::process::exit(code);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force, dir } => cmd_init(&dir, force),
        Command::Run {
            assignment,
            dir,
            config,
        } => cmd_run(&assignment, &dir, config.as_deref()),
        Command::Check { dir, config } => cmd_check(&dir, config.as_deref()),
    }
}

fn cmd_init(dir: &Path, force: bool) -> Result<i32> {
    let path = dir.join(CONFIG_FILE);
    if !force && path.exists() {
        return Ok(exit_codes::OK);
    }
    write_config(&path, &RunConfig::default())?;
    Ok(exit_codes::OK)
}

fn cmd_run(assignment_path: &Path, dir: &Path, config_path: Option<&Path>) -> Result<i32> {
    let cfg = load_project_config(dir, config_path)?;
    if cfg.generator.command.is_empty() {
        return Err(anyhow!("no generator command configured"));
    }
    if cfg.reviewer.command.is_empty() {
        return Err(anyhow!("no reviewer command configured"));
    }
    let assignment = fs::read_to_string(assignment_path)
        .with_context(|| format!("read {}", assignment_path.display()))?;

    let start = capture(dir, DEFAULT_EXCLUDES)?;
    let state_dir = dir.join(".redraft");
    let timeout = Duration::from_secs(cfg.command_timeout_secs);

    let generator = CommandGenerator {
        command: cfg.generator.command.clone(),
        scratch_dir: state_dir.join("scratch/generator"),
        timeout,
        output_limit_bytes: cfg.output_limit_bytes,
    };
    let reviewer = CommandReviewer {
        command: cfg.reviewer.command.clone(),
        scratch_dir: state_dir.join("scratch/reviewer"),
        timeout,
        output_limit_bytes: cfg.output_limit_bytes,
    };
    let mut workspace = Workspace::new(start);
    if !cfg.checker.command.is_empty() {
        workspace = workspace.with_checker(Box::new(CommandChecker {
            command: cfg.checker.command.clone(),
            scratch_dir: state_dir.join("scratch/checker"),
            timeout,
            output_limit_bytes: cfg.output_limit_bytes,
        }));
    }

    let mut report = ProgressReport::new();
    report.write_title(assignment.lines().next().unwrap_or("redraft session"));
    let sink = FileSink {
        dir: state_dir.join("reports"),
    };
    let refine_config = RefineConfig {
        max_cycles: cfg.max_cycles,
        accept_threshold: cfg.accept_threshold,
        report_key: "redraft".to_string(),
        log_root: Some(state_dir.join("cycles")),
    };

    let outcome = run_refine(
        &mut workspace,
        &assignment,
        &generator,
        &reviewer,
        &mut report,
        &sink,
        &refine_config,
    )?;

    if outcome.diff.is_empty() {
        return Err(anyhow::Error::new(EmptyChangeError));
    }
    if let CheckOutcome::Fail { diagnostics } = workspace.check()? {
        eprintln!("check failed:\n{diagnostics}");
        return Ok(exit_codes::INVALID);
    }

    println!("{}", outcome.diff);
    match outcome.stop {
        RefineStop::Accepted { .. } => Ok(exit_codes::OK),
        RefineStop::Exhausted => Ok(exit_codes::EXHAUSTED),
    }
}

fn cmd_check(dir: &Path, config_path: Option<&Path>) -> Result<i32> {
    let cfg = load_project_config(dir, config_path)?;
    if cfg.checker.command.is_empty() {
        return Err(anyhow!("no checker command configured"));
    }
    let tree = capture(dir, DEFAULT_EXCLUDES)?;
    let checker = CommandChecker {
        command: cfg.checker.command.clone(),
        scratch_dir: dir.join(".redraft/scratch/checker"),
        timeout: Duration::from_secs(cfg.command_timeout_secs),
        output_limit_bytes: cfg.output_limit_bytes,
    };
    let workspace = Workspace::new(tree).with_checker(Box::new(checker));
    match workspace.check()? {
        CheckOutcome::Pass => {
            println!("ok");
            Ok(exit_codes::OK)
        }
        CheckOutcome::Fail { diagnostics } => {
            eprintln!("check failed:\n{diagnostics}");
            Ok(exit_codes::INVALID)
        }
    }
}

fn load_project_config(dir: &Path, config_path: Option<&Path>) -> Result<RunConfig> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => dir.join(CONFIG_FILE),
    };
    load_config(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::parse_from(["redraft", "init"]);
        match cli.command {
            Command::Init { force, dir } => {
                assert!(!force);
                assert_eq!(dir, PathBuf::from("."));
            }
            _ => panic!("expected init"),
        }
    }

    #[test]
    fn parse_run_with_assignment() {
        let cli = Cli::parse_from(["redraft", "run", "--assignment", "task.md"]);
        match cli.command {
            Command::Run {
                assignment,
                dir,
                config,
            } => {
                assert_eq!(assignment, PathBuf::from("task.md"));
                assert_eq!(dir, PathBuf::from("."));
                assert!(config.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_check_with_custom_config() {
        let cli = Cli::parse_from(["redraft", "check", "--config", "other.toml"]);
        match cli.command {
            Command::Check { dir, config } => {
                assert_eq!(dir, PathBuf::from("."));
                assert_eq!(config, Some(PathBuf::from("other.toml")));
            }
            _ => panic!("expected check"),
        }
    }
}
