use tsp_ga_derive::CliValue;

/// Which way elite tours travel around the node ring.
#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "ring-direction")]
pub enum RingDirection {
    /// Node `k` sends to `k - 1`.
    #[cli(alias = "anticlockwise", alias = "ccw")]
    AntiClockwise,
    /// Node `k` sends to `k + 1`.
    #[cli(alias = "cw")]
    Clockwise,
}

impl RingDirection {
    /// Rank that `rank` sends to in a ring of `size`.
    pub fn target(self, rank: usize, size: usize) -> usize {
        match self {
            Self::AntiClockwise => predecessor(rank, size),
            Self::Clockwise => successor(rank, size),
        }
    }

    /// Rank that sends to `rank` in a ring of `size`.
    pub fn source(self, rank: usize, size: usize) -> usize {
        match self {
            Self::AntiClockwise => successor(rank, size),
            Self::Clockwise => predecessor(rank, size),
        }
    }
}

pub fn successor(rank: usize, size: usize) -> usize {
    (rank + 1) % size
}

pub fn predecessor(rank: usize, size: usize) -> usize {
    (rank + size - 1) % size
}
