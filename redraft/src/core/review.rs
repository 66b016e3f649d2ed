//! Review records and score handling.
//!
//! A reviewer scores the workspace 0-10 with a one-line summary and a
//! bulleted suggestions list. The loop accepts at `score >= threshold`
//! (a score exactly at the threshold accepts).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Accept threshold used when nothing else is configured.
pub const DEFAULT_ACCEPT_THRESHOLD: u8 = 7;

/// Highest valid review score.
pub const SCORE_MAX: u8 = 10;

/// Structured output of one review cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Integer score, 0 (worst) to 10 (best).
    pub score: u8,
    /// One-line summary of the review.
    pub summary: String,
    /// Bulleted, actionable suggestions for the next draft.
    pub suggestions: String,
}

impl Review {
    pub fn accepted(&self, threshold: u8) -> bool {
        self.score >= threshold
    }
}

/// A review score that could not be parsed.
///
/// This is fatal to the cycle that produced it; a bad score is never
/// silently treated as a low score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreParseError {
    NotAnInteger { raw: String },
    OutOfRange { value: i64 },
}

impl fmt::Display for ScoreParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreParseError::NotAnInteger { raw } => {
                write!(f, "review score is not a base-10 integer: {raw:?}")
            }
            ScoreParseError::OutOfRange { value } => {
                write!(f, "review score {value} is outside 0..={SCORE_MAX}")
            }
        }
    }
}

impl std::error::Error for ScoreParseError {}

/// Parse a review score from raw reviewer output.
///
/// Accepts a trimmed base-10 integer in `0..=10`. Out-of-range integers are
/// rejected rather than clamped: a reviewer emitting them is malfunctioning,
/// and clamping could turn that into a spurious acceptance.
pub fn parse_score(raw: &str) -> Result<u8, ScoreParseError> {
    let trimmed = raw.trim();
    let value: i64 = trimmed.parse().map_err(|_| ScoreParseError::NotAnInteger {
        raw: trimmed.to_string(),
    })?;
    if !(0..=i64::from(SCORE_MAX)).contains(&value) {
        return Err(ScoreParseError::OutOfRange { value });
    }
    Ok(value as u8)
}
