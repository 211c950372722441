//! Launch geometry: hardware limits, per-launch configuration and lane ids.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum lanes per group on the reference accelerator.
pub const MAX_LANES_PER_GROUP: usize = 512;

/// Maximum groups per launch on the reference accelerator.
pub const MAX_GROUPS: usize = 8192;

/// Elements processed per lane in bulk launches unless overridden.
pub const DEFAULT_UNROLL: usize = 4;

/// Hardware caps on a single launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaunchLimits {
    /// Maximum number of concurrently schedulable groups in one launch.
    #[serde(default = "default_max_groups")]
    pub max_groups: usize,
    /// Maximum number of parallel lanes per group.
    #[serde(default = "default_max_lanes_per_group")]
    pub max_lanes_per_group: usize,
}

fn default_max_groups() -> usize {
    MAX_GROUPS
}
fn default_max_lanes_per_group() -> usize {
    MAX_LANES_PER_GROUP
}

impl Default for LaunchLimits {
    fn default() -> Self {
        Self {
            max_groups: MAX_GROUPS,
            max_lanes_per_group: MAX_LANES_PER_GROUP,
        }
    }
}

impl LaunchLimits {
    /// Creates limits, rejecting zero caps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLimits`] if either cap is zero.
    pub fn new(max_groups: usize, max_lanes_per_group: usize) -> Result<Self> {
        let limits = Self {
            max_groups,
            max_lanes_per_group,
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Checks that both caps are non-zero and a full launch is addressable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLimits`] if either cap is zero or
    /// `max_groups * max_lanes_per_group` overflows `usize`.
    pub fn validate(&self) -> Result<()> {
        if self.max_groups == 0
            || self.max_lanes_per_group == 0
            || self.checked_elements_per_launch(1).is_none()
        {
            return Err(Error::InvalidLimits {
                max_groups: self.max_groups,
                max_lanes_per_group: self.max_lanes_per_group,
            });
        }
        Ok(())
    }

    /// Elements covered by one full group at the given unroll factor.
    ///
    /// Saturates at `usize::MAX`.
    #[must_use]
    pub const fn elements_per_group(&self, unroll: usize) -> usize {
        self.max_lanes_per_group.saturating_mul(unroll)
    }

    /// Elements covered by the largest launch at `unroll`, or `None` if that
    /// count overflows `usize`.
    #[must_use]
    pub fn checked_elements_per_launch(&self, unroll: usize) -> Option<usize> {
        self.max_groups
            .checked_mul(self.max_lanes_per_group)?
            .checked_mul(unroll)
    }
}

/// Shape of one kernel launch: `groups` x `lanes_per_group` lanes, each
/// processing `unroll` consecutive elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchConfig {
    /// Number of groups in the launch grid.
    pub groups: usize,
    /// Number of lanes in each group.
    pub lanes_per_group: usize,
    /// Elements per lane.
    pub unroll: usize,
}

impl LaunchConfig {
    /// Creates a launch configuration.
    #[must_use]
    pub const fn new(groups: usize, lanes_per_group: usize, unroll: usize) -> Self {
        Self {
            groups,
            lanes_per_group,
            unroll,
        }
    }

    /// Total lanes in the launch.
    #[must_use]
    pub const fn lanes(&self) -> usize {
        self.groups * self.lanes_per_group
    }

    /// Elements covered by one group.
    #[must_use]
    pub const fn elements_per_group(&self) -> usize {
        self.lanes_per_group.saturating_mul(self.unroll)
    }

    /// Total elements covered by the launch.
    #[must_use]
    pub const fn elements(&self) -> usize {
        self.groups.saturating_mul(self.elements_per_group())
    }

    /// Whether the configuration fits within `limits`.
    #[must_use]
    pub const fn fits(&self, limits: &LaunchLimits) -> bool {
        self.groups <= limits.max_groups && self.lanes_per_group <= limits.max_lanes_per_group
    }
}

/// Identifies one lane inside a launch grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneId {
    /// Group index within the launch.
    pub group: usize,
    /// Lane index within the group.
    pub lane: usize,
}

impl LaneId {
    /// Creates a lane id.
    #[must_use]
    pub const fn new(group: usize, lane: usize) -> Self {
        Self { group, lane }
    }

    /// Linear lane index across the launch.
    #[must_use]
    pub const fn global(&self, lanes_per_group: usize) -> usize {
        self.group * lanes_per_group + self.lane
    }

    /// First tile element handled by this lane.
    #[must_use]
    pub const fn base(&self, lanes_per_group: usize, unroll: usize) -> usize {
        self.global(lanes_per_group) * unroll
    }
}
