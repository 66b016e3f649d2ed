//! Iterative code-refinement session runner.
//!
//! This crate drives an external code generator through bounded
//! draft-and-review cycles over an immutable file tree. The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (trees, diffs, reviews,
//!   progress reports). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem snapshots, process
//!   execution, report publishing). Isolated to enable scripted doubles in
//!   tests.
//!
//! [`workspace`] ties a session's trees, checkers and notifiers together;
//! [`refine`] runs the cycle loop on top of it.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod refine;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workspace;
