//! Wall-clock bookkeeping for the search.
//!
//! The search is single-threaded; the deadline is enforced cooperatively by
//! polling the clock every `TIMER_CYCLE` nodes, so all this module needs is
//! elapsed seconds and a deadline test.

use std::time::{Duration, Instant};

/// A started wall clock with a hard deadline.
#[derive(Clone, Copy, Debug)]
pub struct SearchClock {
    start: Instant,
    deadline: Instant,
}

impl SearchClock {
    /// Start the clock; the deadline sits `budget` from now.
    #[must_use]
    pub fn start(budget: Duration) -> SearchClock {
        let start = Instant::now();
        SearchClock {
            start,
            deadline: start + budget,
        }
    }

    /// Seconds elapsed since the clock started.
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// True once the deadline has passed.
    #[inline]
    #[must_use]
    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}
