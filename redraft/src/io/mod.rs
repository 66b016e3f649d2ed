//! Side-effecting collaborator boundaries.

pub mod checker;
pub mod config;
pub mod cycle_log;
pub mod generator;
pub mod notifier;
pub mod process;
pub mod reviewer;
pub mod snapshot;
