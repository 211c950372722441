//! Accelerator dispatch layer.
//!
//! Elementwise map and zip over arbitrarily long sequences, partitioned into
//! launches that respect a device's group and lane caps:
//!
//! - [`unroll`]: compile-time fixed-count iteration used inside kernels
//! - [`kernel`]: per-lane bodies (map, zip, in-place update)
//! - [`tiling`]: bulk/remainder partitioning of a sequence into tiles
//! - [`scheduler`]: launches one kernel per tile and checks the device
//! - [`device`]: the launch interface and the same-thread host device
//! - `parallel`: rayon-backed device (feature `parallel`)

pub mod device;
pub mod kernel;
pub mod launch;
#[cfg(feature = "parallel")]
#[cfg_attr(docsrs, doc(cfg(feature = "parallel")))]
pub mod parallel;
pub mod scheduler;
pub mod tiling;
pub mod unroll;

pub use device::{Device, DeviceError, HostDevice, LaunchRecord};
pub use kernel::{Kernel, MapKernel, UpdateKernel, ZipKernel};
pub use launch::{LaneId, LaunchConfig, LaunchLimits, DEFAULT_UNROLL, MAX_GROUPS, MAX_LANES_PER_GROUP};
#[cfg(feature = "parallel")]
pub use parallel::ParallelDevice;
pub use scheduler::Scheduler;
pub use tiling::{Phase, PlanSummary, Tile, TilePlan};

use crate::config::{DeviceKind, DispatchConfig};
use crate::error::Result;

/// Device selected at runtime from a [`DispatchConfig`].
#[derive(Debug)]
pub enum ConfiguredDevice {
    /// Same-thread host device.
    Host(HostDevice),
    /// Multi-threaded device.
    #[cfg(feature = "parallel")]
    Parallel(ParallelDevice),
}

impl ConfiguredDevice {
    /// Builds the device named by `config.device`, capped at `config.limits`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or names a backend
    /// this build does not include.
    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        config.validate()?;
        match config.device {
            DeviceKind::Host => Ok(Self::Host(HostDevice::with_limits(config.limits()))),
            #[cfg(feature = "parallel")]
            DeviceKind::Parallel => Ok(Self::Parallel(ParallelDevice::with_limits(config.limits()))),
            #[cfg(not(feature = "parallel"))]
            DeviceKind::Parallel => Err(crate::error::Error::ConfigInvalid {
                key: "device".to_string(),
                message: "parallel device requires the `parallel` feature".to_string(),
            }),
        }
    }
}

impl Device for ConfiguredDevice {
    fn name(&self) -> String {
        match self {
            Self::Host(device) => device.name(),
            #[cfg(feature = "parallel")]
            Self::Parallel(device) => device.name(),
        }
    }

    fn limits(&self) -> LaunchLimits {
        match self {
            Self::Host(device) => device.limits(),
            #[cfg(feature = "parallel")]
            Self::Parallel(device) => device.limits(),
        }
    }

    fn launch<K: Kernel>(&self, config: LaunchConfig, kernel: &K, out: &mut [K::Output]) {
        match self {
            Self::Host(device) => device.launch(config, kernel, out),
            #[cfg(feature = "parallel")]
            Self::Parallel(device) => device.launch(config, kernel, out),
        }
    }

    fn synchronize(&self) -> std::result::Result<(), DeviceError> {
        match self {
            Self::Host(device) => device.synchronize(),
            #[cfg(feature = "parallel")]
            Self::Parallel(device) => device.synchronize(),
        }
    }
}

/// Builds a scheduler and device from `config`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn scheduler_from_config(config: &DispatchConfig) -> Result<Scheduler<ConfiguredDevice>> {
    let device = ConfiguredDevice::from_config(config)?;
    Scheduler::from_config(device, config)
}
