//! Exact solver for the block relocation problem: retrieve all blocks of a
//! bay in non-decreasing priority order with a provably minimal number of
//! relocations, or the best bounds a time budget allows.

pub mod instance;
pub mod lower_bound;
pub mod report;
pub mod search;
pub mod state;
pub mod timer;
pub mod types;
pub mod upper_bound;

pub use instance::{Instance, InstanceError};
pub use report::Report;
pub use search::{solve, Solver};
pub use types::Move;
