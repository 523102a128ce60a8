//! Problem instances and their plain-text format.
//!
//! The customary layout is one header line `S T` (stacks, tiers), one line
//! with the largest priority value, then one line per stack holding its
//! height followed by the priorities bottom-up:
//!
//! ```text
//! 3 3
//! 3
//! 3 3 1 2
//! 0
//! 0
//! ```

use std::fmt;
use std::str::FromStr;

/// Error type for instance parsing and validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceError {
    /// Fewer lines than the header promises
    MissingLine { line: usize },
    /// A token that is not a positive integer where one is expected
    BadToken { line: usize, token: String },
    /// Bay dimensions that cannot hold any block
    BadDimensions { n_stacks: usize, n_tiers: usize },
    /// A stack line whose height exceeds the tier cap
    TooTall { stack: usize, height: usize, n_tiers: usize },
    /// A stack line with fewer priorities than its declared height
    ShortStack { stack: usize, expected: usize, found: usize },
    /// A priority outside `1..=max_prio`
    PriorityOutOfRange { stack: usize, priority: u32, max_prio: u32 },
}

impl fmt::Display for InstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceError::MissingLine { line } => {
                write!(f, "missing line {line}")
            }
            InstanceError::BadToken { line, token } => {
                write!(f, "bad token '{token}' on line {line}")
            }
            InstanceError::BadDimensions { n_stacks, n_tiers } => {
                write!(f, "bay of {n_stacks} stacks x {n_tiers} tiers cannot hold blocks")
            }
            InstanceError::TooTall { stack, height, n_tiers } => {
                write!(f, "stack {stack} has height {height}, tier cap is {n_tiers}")
            }
            InstanceError::ShortStack { stack, expected, found } => {
                write!(f, "stack {stack} declares {expected} blocks, lists {found}")
            }
            InstanceError::PriorityOutOfRange { stack, priority, max_prio } => {
                write!(f, "priority {priority} on stack {stack} outside 1..={max_prio}")
            }
        }
    }
}

impl std::error::Error for InstanceError {}

/// An immutable bay layout: `n_stacks` stacks capped at `n_tiers` tiers,
/// holding blocks with priorities in `1..=max_prio` (bottom-up per stack).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instance {
    n_stacks: usize,
    n_tiers: usize,
    max_prio: u32,
    n_blocks: usize,
    stacks: Vec<Vec<u32>>,
}

impl Instance {
    /// Build an instance from per-stack priority lists (bottom-up).
    /// `max_prio` is taken as the largest priority present.
    pub fn new(
        n_stacks: usize,
        n_tiers: usize,
        stacks: Vec<Vec<u32>>,
    ) -> Result<Instance, InstanceError> {
        let max_prio = stacks
            .iter()
            .flatten()
            .copied()
            .max()
            .unwrap_or(1);
        Instance::with_max_prio(n_stacks, n_tiers, max_prio, stacks)
    }

    fn with_max_prio(
        n_stacks: usize,
        n_tiers: usize,
        max_prio: u32,
        stacks: Vec<Vec<u32>>,
    ) -> Result<Instance, InstanceError> {
        if n_stacks == 0 || n_tiers == 0 {
            return Err(InstanceError::BadDimensions { n_stacks, n_tiers });
        }
        debug_assert_eq!(stacks.len(), n_stacks);
        let mut n_blocks = 0;
        for (s, stack) in stacks.iter().enumerate() {
            if stack.len() > n_tiers {
                return Err(InstanceError::TooTall {
                    stack: s,
                    height: stack.len(),
                    n_tiers,
                });
            }
            for &p in stack {
                if p == 0 || p > max_prio {
                    return Err(InstanceError::PriorityOutOfRange {
                        stack: s,
                        priority: p,
                        max_prio,
                    });
                }
            }
            n_blocks += stack.len();
        }
        Ok(Instance {
            n_stacks,
            n_tiers,
            max_prio,
            n_blocks,
            stacks,
        })
    }

    pub fn n_stacks(&self) -> usize {
        self.n_stacks
    }

    pub fn n_tiers(&self) -> usize {
        self.n_tiers
    }

    pub fn max_prio(&self) -> u32 {
        self.max_prio
    }

    pub fn n_blocks(&self) -> usize {
        self.n_blocks
    }

    /// Height of stack `s` in the initial layout.
    pub fn height(&self, s: usize) -> usize {
        self.stacks[s].len()
    }

    /// Priority at tier `t` (1-based) of stack `s`.
    pub fn priority(&self, s: usize, t: usize) -> u32 {
        self.stacks[s][t - 1]
    }
}

fn parse_token<T: FromStr>(line_no: usize, token: &str) -> Result<T, InstanceError> {
    token.parse().map_err(|_| InstanceError::BadToken {
        line: line_no,
        token: token.to_string(),
    })
}

impl FromStr for Instance {
    type Err = InstanceError;

    fn from_str(s: &str) -> Result<Instance, InstanceError> {
        let mut lines = s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .enumerate();

        let (no, header) = lines.next().ok_or(InstanceError::MissingLine { line: 1 })?;
        let mut tok = header.split_whitespace();
        let n_stacks: usize = parse_token(no + 1, tok.next().unwrap_or(""))?;
        let n_tiers: usize = parse_token(no + 1, tok.next().unwrap_or(""))?;

        let (no, prio_line) = lines.next().ok_or(InstanceError::MissingLine { line: 2 })?;
        let max_prio: u32 = parse_token(no + 1, prio_line)?;

        let mut stacks = Vec::with_capacity(n_stacks);
        for s in 0..n_stacks {
            let (no, line) = lines
                .next()
                .ok_or(InstanceError::MissingLine { line: 3 + s })?;
            let mut tok = line.split_whitespace();
            let height: usize = parse_token(no + 1, tok.next().unwrap_or(""))?;
            let prios: Vec<u32> = tok
                .map(|t| parse_token(no + 1, t))
                .collect::<Result<_, _>>()?;
            if prios.len() != height {
                return Err(InstanceError::ShortStack {
                    stack: s,
                    expected: height,
                    found: prios.len(),
                });
            }
            stacks.push(prios);
        }

        Instance::with_max_prio(n_stacks, n_tiers, max_prio, stacks)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.n_stacks, self.n_tiers)?;
        writeln!(f, "{}", self.max_prio)?;
        for stack in &self.stacks {
            write!(f, "{}", stack.len())?;
            for p in stack {
                write!(f, " {p}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_documented_layout() {
        let inst: Instance = "3 3\n3\n3 3 1 2\n0\n0\n".parse().unwrap();
        assert_eq!(inst.n_stacks(), 3);
        assert_eq!(inst.n_tiers(), 3);
        assert_eq!(inst.max_prio(), 3);
        assert_eq!(inst.n_blocks(), 3);
        assert_eq!(inst.height(0), 3);
        assert_eq!(inst.priority(0, 1), 3);
        assert_eq!(inst.priority(0, 3), 2);
        assert_eq!(inst.height(1), 0);
    }

    #[test]
    fn display_round_trips() {
        let inst = Instance::new(3, 4, vec![vec![6, 1, 5, 2], vec![4, 3], vec![]]).unwrap();
        let text = inst.to_string();
        let back: Instance = text.parse().unwrap();
        assert_eq!(inst, back);
    }

    #[test]
    fn rejects_overfull_stack() {
        let err = Instance::new(2, 2, vec![vec![1, 2, 3], vec![]]).unwrap_err();
        assert!(matches!(err, InstanceError::TooTall { stack: 0, .. }));
    }

    #[test]
    fn rejects_zero_priority() {
        let err = Instance::new(2, 2, vec![vec![1, 0], vec![]]).unwrap_err();
        assert!(matches!(err, InstanceError::PriorityOutOfRange { .. }));
    }

    #[test]
    fn rejects_height_mismatch() {
        let err = "2 2\n2\n2 1\n0\n".parse::<Instance>().unwrap_err();
        assert!(matches!(err, InstanceError::ShortStack { stack: 0, .. }));
    }

    #[test]
    fn rejects_priority_above_declared_max() {
        let err = "2 2\n2\n1 5\n0\n".parse::<Instance>().unwrap_err();
        assert!(matches!(err, InstanceError::PriorityOutOfRange { .. }));
    }
}
