//! Per-cycle artifact logging.
//!
//! When a log root is configured, each refinement cycle leaves its review
//! and diff on disk under `<root>/<cycle>/` so a run can be inspected after
//! the fact. These are product artifacts, always written when enabled,
//! independent of `RUST_LOG`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::review::Review;

#[derive(Debug, Clone, Serialize)]
pub struct CycleMeta {
    pub cycle: u32,
    pub score: u8,
    pub accepted: bool,
}

#[derive(Debug, Clone)]
pub struct CyclePaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub review_path: PathBuf,
    pub diff_path: PathBuf,
}

impl CyclePaths {
    pub fn new(root: &Path, cycle: u32) -> Self {
        let dir = root.join(cycle.to_string());
        Self {
            meta_path: dir.join("meta.json"),
            review_path: dir.join("review.json"),
            diff_path: dir.join("diff.patch"),
            dir,
        }
    }
}

/// Write one cycle's artifacts. Files are written in a fixed order to keep
/// partially written logs predictable.
pub fn write_cycle(
    root: &Path,
    cycle: u32,
    review: &Review,
    accepted: bool,
    diff: &str,
) -> Result<CyclePaths> {
    let paths = CyclePaths::new(root, cycle);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create cycle dir {}", paths.dir.display()))?;

    let meta = CycleMeta {
        cycle,
        score: review.score,
        accepted,
    };
    write_json(&paths.meta_path, &meta)?;
    write_json(&paths.review_path, review)?;
    fs::write(&paths.diff_path, diff)
        .with_context(|| format!("write {}", paths.diff_path.display()))?;

    Ok(paths)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
