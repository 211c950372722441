//! Device abstraction.
//!
//! A [`Device`] accepts launches described by a [`LaunchConfig`] and a
//! [`Kernel`], and reports runtime failures only when asked through
//! [`Device::synchronize`]. Launches themselves never return an error: a
//! failed launch performs no writes and latches a sticky status that stays set
//! (and blocks further launches) until the next `synchronize`.
//!
//! [`HostDevice`] runs every lane on the calling thread. It stands in for an
//! accelerator in tests and on machines without one, and can record launches
//! or inject faults.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

use super::kernel::Kernel;
use super::launch::{LaneId, LaunchConfig, LaunchLimits};

/// Device-runtime failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Launch geometry is malformed.
    #[error("invalid launch #{launch}: {reason}")]
    InvalidLaunch {
        /// Index of the failed launch on its device.
        launch: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Launch geometry exceeds a hardware cap.
    #[error("launch #{launch} exceeds {what}: requested {requested}, max {max}")]
    LimitExceeded {
        /// Index of the failed launch on its device.
        launch: usize,
        /// Which cap was exceeded.
        what: &'static str,
        /// Requested amount.
        requested: usize,
        /// Hardware maximum.
        max: usize,
    },

    /// Launch was accepted but failed while executing.
    #[error("launch #{launch} failed: {message}")]
    LaunchFailed {
        /// Index of the failed launch on its device.
        launch: usize,
        /// Runtime message.
        message: String,
    },
}

/// Narrow launch interface implemented by every execution backend.
pub trait Device {
    /// Human-readable device name.
    fn name(&self) -> String;

    /// Hardware caps for a single launch.
    fn limits(&self) -> LaunchLimits;

    /// Submits one launch covering `out`, which must hold exactly
    /// `config.elements()` elements.
    fn launch<K: Kernel>(&self, config: LaunchConfig, kernel: &K, out: &mut [K::Output]);

    /// Waits for submitted launches and returns the first failure since the
    /// previous call, clearing it.
    ///
    /// # Errors
    ///
    /// Returns the latched [`DeviceError`], if any.
    fn synchronize(&self) -> Result<(), DeviceError>;
}

/// One accepted or rejected launch, as seen by a recording device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchRecord {
    /// Launch index on the device.
    pub index: usize,
    /// Geometry of the launch.
    pub config: LaunchConfig,
    /// Whether the launch executed.
    pub executed: bool,
}

/// Launch counter plus sticky error status shared by the device backends.
#[derive(Debug, Default)]
pub(crate) struct DeviceStatus {
    launches: AtomicUsize,
    error: Mutex<Option<DeviceError>>,
}

impl DeviceStatus {
    /// Allocates the next launch index.
    pub(crate) fn next_launch(&self) -> usize {
        self.launches.fetch_add(1, Ordering::Relaxed)
    }

    /// Whether an earlier failure is still latched.
    pub(crate) fn is_faulted(&self) -> bool {
        self.error.lock().is_some()
    }

    /// Latches `err` unless a failure is already pending.
    pub(crate) fn fail(&self, err: DeviceError) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            log::trace!("device fault latched: {err}");
            *slot = Some(err);
        }
    }

    /// Returns and clears the pending failure.
    pub(crate) fn take(&self) -> Result<(), DeviceError> {
        match self.error.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Checks a launch against device limits and the kernel it runs.
pub(crate) fn validate_launch<K: Kernel>(
    launch: usize,
    config: &LaunchConfig,
    limits: &LaunchLimits,
    out_len: usize,
) -> Result<(), DeviceError> {
    if config.groups == 0 || config.lanes_per_group == 0 {
        return Err(DeviceError::InvalidLaunch {
            launch,
            reason: format!(
                "empty grid ({} groups x {} lanes)",
                config.groups, config.lanes_per_group
            ),
        });
    }
    if config.groups > limits.max_groups {
        return Err(DeviceError::LimitExceeded {
            launch,
            what: "group count",
            requested: config.groups,
            max: limits.max_groups,
        });
    }
    if config.lanes_per_group > limits.max_lanes_per_group {
        return Err(DeviceError::LimitExceeded {
            launch,
            what: "lanes per group",
            requested: config.lanes_per_group,
            max: limits.max_lanes_per_group,
        });
    }
    if config.unroll != K::UNROLL {
        return Err(DeviceError::InvalidLaunch {
            launch,
            reason: format!(
                "config unroll {} does not match kernel unroll {}",
                config.unroll,
                K::UNROLL
            ),
        });
    }
    if config.elements() != out_len {
        return Err(DeviceError::InvalidLaunch {
            launch,
            reason: format!(
                "grid covers {} elements but tile holds {}",
                config.elements(),
                out_len
            ),
        });
    }
    Ok(())
}

/// Same-thread device: executes every lane of every group in order.
#[derive(Debug)]
pub struct HostDevice {
    limits: LaunchLimits,
    status: DeviceStatus,
    fail_after: Option<usize>,
    recording: bool,
    records: Mutex<Vec<LaunchRecord>>,
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDevice {
    /// Creates a host device with the reference accelerator limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(LaunchLimits::default())
    }

    /// Creates a host device with custom limits.
    #[must_use]
    pub fn with_limits(limits: LaunchLimits) -> Self {
        Self {
            limits,
            status: DeviceStatus::default(),
            fail_after: None,
            recording: false,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Keeps a log of every launch, readable through [`HostDevice::launches`].
    #[must_use]
    pub fn recording(mut self) -> Self {
        self.recording = true;
        self
    }

    /// Makes every launch with index `>= n` fail at runtime.
    #[must_use]
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Launches seen so far (empty unless recording).
    #[must_use]
    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.records.lock().clone()
    }

    fn record(&self, index: usize, config: LaunchConfig, executed: bool) {
        if self.recording {
            self.records.lock().push(LaunchRecord {
                index,
                config,
                executed,
            });
        }
    }
}

impl Device for HostDevice {
    fn name(&self) -> String {
        "host".to_string()
    }

    fn limits(&self) -> LaunchLimits {
        self.limits
    }

    fn launch<K: Kernel>(&self, config: LaunchConfig, kernel: &K, out: &mut [K::Output]) {
        let index = self.status.next_launch();

        if self.status.is_faulted() {
            self.record(index, config, false);
            return;
        }
        if let Err(err) = validate_launch::<K>(index, &config, &self.limits, out.len()) {
            self.status.fail(err);
            self.record(index, config, false);
            return;
        }
        if self.fail_after.is_some_and(|n| index >= n) {
            self.status.fail(DeviceError::LaunchFailed {
                launch: index,
                message: "injected fault".to_string(),
            });
            self.record(index, config, false);
            return;
        }

        let lanes = config.lanes_per_group;
        for (group, group_out) in out.chunks_mut(config.elements_per_group()).enumerate() {
            for lane in 0..lanes {
                kernel.run_lane(LaneId::new(group, lane), lanes, group_out);
            }
        }
        self.record(index, config, true);
    }

    fn synchronize(&self) -> Result<(), DeviceError> {
        self.status.take()
    }
}
