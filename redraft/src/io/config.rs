//! Run configuration stored in `redraft.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::review::{DEFAULT_ACCEPT_THRESHOLD, SCORE_MAX};

/// Run configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to sensible
/// values; a missing file is equivalent to an empty one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum number of draft/review cycles before giving up.
    pub max_cycles: u32,

    /// Review score at which a draft is accepted (`>=` comparison).
    pub accept_threshold: u8,

    /// Wall-clock budget in seconds for each collaborator command.
    pub command_timeout_secs: u64,

    /// Truncate collaborator stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    pub generator: CommandConfig,
    pub reviewer: CommandConfig,
    /// Optional: leave the command empty to run without a checker.
    pub checker: CommandConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    /// Command to execute, argv-style (e.g. `["codex", "exec"]`).
    pub command: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_cycles: 5,
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            command_timeout_secs: 30 * 60,
            output_limit_bytes: 100_000,
            generator: CommandConfig::default(),
            reviewer: CommandConfig::default(),
            checker: CommandConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_cycles == 0 {
            return Err(anyhow!("max_cycles must be > 0"));
        }
        if self.accept_threshold > SCORE_MAX {
            return Err(anyhow!("accept_threshold must be <= {SCORE_MAX}"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    if !path.exists() {
        let cfg = RunConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RunConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
