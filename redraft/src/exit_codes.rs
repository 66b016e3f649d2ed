//! Stable exit codes for redraft CLI commands.

/// Command succeeded; for `run`, a review accepted the draft.
pub const OK: i32 = 0;
/// Command failed due to invalid config/arguments or a collaborator error.
pub const INVALID: i32 = 1;
/// `redraft run` spent every cycle without an accepting review.
pub const EXHAUSTED: i32 = 2;
/// `redraft run` finished with zero diff against the starting tree.
pub const NO_CHANGES: i32 = 3;
