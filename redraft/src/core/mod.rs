//! Pure, deterministic session logic.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod diff;
pub mod glob;
pub mod report;
pub mod review;
pub mod tree;
