//! Partitioning of a sequence into launch-sized tiles.
//!
//! A sequence of `len` elements is covered in two phases:
//!
//! - **Bulk**: while at least one full group (`max_lanes_per_group * unroll`
//!   elements) remains, launch `min(remaining / per_group, max_groups)` full
//!   groups and advance by exactly the elements they cover.
//! - **Remainder**: while anything remains, launch one group of
//!   `min(max_lanes_per_group, remaining)` lanes at unroll 1.
//!
//! Tiles are contiguous, never overlap, and their union is `0..len`. The plan
//! depends only on `len`, the limits and the unroll factor.

use std::iter::FusedIterator;
use std::ops::Range;

use super::launch::{LaunchConfig, LaunchLimits};
use crate::error::{Error, Result};

/// Scheduling phase a tile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Full groups at the configured unroll factor.
    Bulk,
    /// Single-group tail launches at unroll 1.
    Remainder,
}

/// One launch worth of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// First element of the tile within the sequence.
    pub offset: usize,
    /// Launch geometry covering the tile.
    pub config: LaunchConfig,
    /// Phase that produced the tile.
    pub phase: Phase,
}

impl Tile {
    /// Number of elements in the tile.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.config.elements()
    }

    /// Tiles are never empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index range of the tile within the sequence.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len()
    }
}

/// Launch and element counts per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    /// Number of bulk launches.
    pub bulk_launches: usize,
    /// Elements covered by bulk launches.
    pub bulk_elements: usize,
    /// Number of remainder launches.
    pub remainder_launches: usize,
    /// Elements covered by remainder launches.
    pub remainder_elements: usize,
}

impl PlanSummary {
    /// Total launches across both phases.
    #[must_use]
    pub const fn launches(&self) -> usize {
        self.bulk_launches + self.remainder_launches
    }

    /// Total elements across both phases.
    #[must_use]
    pub const fn elements(&self) -> usize {
        self.bulk_elements + self.remainder_elements
    }
}

/// Iterator over the tiles covering a sequence.
#[derive(Debug, Clone)]
pub struct TilePlan {
    len: usize,
    offset: usize,
    limits: LaunchLimits,
    unroll: usize,
}

impl TilePlan {
    /// Plans `len` elements under `limits` with `unroll` elements per lane in
    /// the bulk phase.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLimits`] for zero limits or when a full launch
    /// at `unroll` would cover more than `usize::MAX` elements, and
    /// [`Error::ConfigInvalid`] for a zero unroll factor.
    pub fn new(len: usize, limits: LaunchLimits, unroll: usize) -> Result<Self> {
        limits.validate()?;
        if unroll == 0 {
            return Err(Error::ConfigInvalid {
                key: "unroll".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if limits.checked_elements_per_launch(unroll).is_none() {
            return Err(Error::InvalidLimits {
                max_groups: limits.max_groups,
                max_lanes_per_group: limits.max_lanes_per_group,
            });
        }
        Ok(Self {
            len,
            offset: 0,
            limits,
            unroll,
        })
    }

    /// Total elements being planned.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the planned sequence is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements not yet covered by a yielded tile.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.len - self.offset
    }

    /// Counts launches and elements per phase for the tiles not yet yielded.
    #[must_use]
    pub fn summary(&self) -> PlanSummary {
        self.clone()
            .fold(PlanSummary::default(), |mut summary, tile| {
                match tile.phase {
                    Phase::Bulk => {
                        summary.bulk_launches += 1;
                        summary.bulk_elements += tile.len();
                    }
                    Phase::Remainder => {
                        summary.remainder_launches += 1;
                        summary.remainder_elements += tile.len();
                    }
                }
                summary
            })
    }
}

impl Iterator for TilePlan {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        let remaining = self.remaining();
        if remaining == 0 {
            return None;
        }

        let lanes_max = self.limits.max_lanes_per_group;
        let per_group = self.limits.elements_per_group(self.unroll);

        let tile = if remaining >= per_group {
            let groups = (remaining / per_group).min(self.limits.max_groups);
            Tile {
                offset: self.offset,
                config: LaunchConfig::new(groups, lanes_max, self.unroll),
                phase: Phase::Bulk,
            }
        } else {
            Tile {
                offset: self.offset,
                config: LaunchConfig::new(1, remaining.min(lanes_max), 1),
                phase: Phase::Remainder,
            }
        };

        self.offset += tile.len();
        Some(tile)
    }
}

impl FusedIterator for TilePlan {}


// ============================================================================
// Property-based tests with proptest
// ============================================================================
