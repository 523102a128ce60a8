//! Core value types shared across the solver.

use std::fmt;

/// A single relocation: the priority of the block moved, its source stack,
/// and its destination stack.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Move {
    pub pri: u32,
    pub src: usize,
    pub dst: usize,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.pri, self.src, self.dst)
    }
}

/// Kind of the last change applied to a stack. `Never` marks a stack
/// untouched since the initial layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    Never,
    MoveOut,
    MoveIn,
    Retrieve,
}
