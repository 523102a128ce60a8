//! Solve reports.

use std::fmt;

use crate::types::Move;

/// Outcome of a solve: the bound trajectory, the best plan found, and the
/// search counters. `best_lb == best_ub` means the plan is provably optimal;
/// otherwise the time budget ran out and both values are valid bounds.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    pub root_lb: usize,
    pub init_ub: usize,
    pub best_lb: usize,
    pub best_ub: usize,
    pub solution: Vec<Move>,
    pub time_to_best_lb: f64,
    pub time_to_best_ub: f64,
    pub total_time: f64,
    pub n_nodes: u64,
    pub n_probe: u64,
}

impl Report {
    /// Report for a bay already solved by retrievals alone.
    pub fn solved() -> Report {
        Report::default()
    }

    #[must_use]
    pub fn is_optimal(&self) -> bool {
        self.best_lb == self.best_ub
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "bounds: lb = {} (root {}), ub = {} (init {}){}",
            self.best_lb,
            self.root_lb,
            self.best_ub,
            self.init_ub,
            if self.is_optimal() { " [optimal]" } else { "" }
        )?;
        writeln!(
            f,
            "nodes: {} / probes: {} / time: {:.3}s (lb @ {:.3}s, ub @ {:.3}s)",
            self.n_nodes,
            self.n_probe,
            self.total_time,
            self.time_to_best_lb,
            self.time_to_best_ub
        )?;
        writeln!(f, "solution ({} relocations):", self.solution.len())?;
        for (i, mv) in self.solution.iter().enumerate() {
            writeln!(f, "  {:>3}. {}", i + 1, mv)?;
        }
        Ok(())
    }
}
