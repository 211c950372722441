//! Multi-threaded device backed by rayon.
//!
//! Groups of a launch run concurrently on the rayon pool, each over its own
//! disjoint chunk of the tile output; lanes within a group run in order.
//! Results are identical to [`HostDevice`](super::device::HostDevice).

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::device::{validate_launch, Device, DeviceError, DeviceStatus};
use super::kernel::Kernel;
use super::launch::{LaneId, LaunchConfig, LaunchLimits};
use crate::error::{Error, Result};

/// Device that spreads the groups of each launch across worker threads.
#[derive(Debug)]
pub struct ParallelDevice {
    limits: LaunchLimits,
    status: DeviceStatus,
    pool: Option<ThreadPool>,
}

impl Default for ParallelDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ParallelDevice {
    /// Uses the global rayon pool and the reference accelerator limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(LaunchLimits::default())
    }

    /// Uses the global rayon pool with custom limits.
    #[must_use]
    pub fn with_limits(limits: LaunchLimits) -> Self {
        Self {
            limits,
            status: DeviceStatus::default(),
            pool: None,
        }
    }

    /// Runs launches on a dedicated pool of `threads` workers.
    ///
    /// # Errors
    ///
    /// Returns an error if `threads` is zero or the pool cannot be built.
    pub fn with_threads(limits: LaunchLimits, threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::ConfigInvalid {
                key: "threads".to_string(),
                message: "must be positive".to_string(),
            });
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| Error::ConfigInvalid {
                key: "threads".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            limits,
            status: DeviceStatus::default(),
            pool: Some(pool),
        })
    }

    /// Worker count used by launches.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, ThreadPool::current_num_threads)
    }
}

fn run_groups<K: Kernel>(config: LaunchConfig, kernel: &K, out: &mut [K::Output]) {
    let lanes = config.lanes_per_group;
    out.par_chunks_mut(config.elements_per_group())
        .enumerate()
        .for_each(|(group, group_out)| {
            for lane in 0..lanes {
                kernel.run_lane(LaneId::new(group, lane), lanes, group_out);
            }
        });
}

impl Device for ParallelDevice {
    fn name(&self) -> String {
        format!("parallel ({} threads)", self.threads())
    }

    fn limits(&self) -> LaunchLimits {
        self.limits
    }

    fn launch<K: Kernel>(&self, config: LaunchConfig, kernel: &K, out: &mut [K::Output]) {
        let index = self.status.next_launch();
        if self.status.is_faulted() {
            return;
        }
        if let Err(err) = validate_launch::<K>(index, &config, &self.limits, out.len()) {
            self.status.fail(err);
            return;
        }

        match &self.pool {
            Some(pool) => pool.install(|| run_groups(config, kernel, out)),
            None => run_groups(config, kernel, out),
        }
    }

    fn synchronize(&self) -> std::result::Result<(), DeviceError> {
        self.status.take()
    }
}


// ============================================================================
// Property-based tests with proptest
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::accel::device::HostDevice;
    use crate::accel::scheduler::Scheduler;
    use proptest::prelude::*;

    fn pair(groups: usize, lanes: usize) -> (Scheduler<HostDevice>, Scheduler<ParallelDevice>) {
        let limits = LaunchLimits::new(groups, lanes).unwrap();
        (
            Scheduler::new(HostDevice::with_limits(limits)),
            Scheduler::new(ParallelDevice::with_limits(limits)),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Invariant: a whole transform (bulk and remainder) matches the host device
        #[test]
        fn prop_transform_matches_host(
            input in prop::collection::vec(any::<i32>(), 0..3000),
            groups in 1usize..5,
            lanes in 1usize..65,
        ) {
            let (host, parallel) = pair(groups, lanes);
            let f = |x: &i32| x.wrapping_mul(31) ^ 0x5a5a;

            let mut expected = vec![0; input.len()];
            let mut actual = vec![0; input.len()];
            host.transform_unrolled::<4, _, _, _>(&input, &mut expected, f).unwrap();
            parallel.transform_unrolled::<4, _, _, _>(&input, &mut actual, f).unwrap();
            prop_assert_eq!(&actual, &expected);

            let mut expected = vec![0; input.len()];
            let mut actual = vec![0; input.len()];
            host.transform_unrolled::<1, _, _, _>(&input, &mut expected, f).unwrap();
            parallel.transform_unrolled::<1, _, _, _>(&input, &mut actual, f).unwrap();
            prop_assert_eq!(actual, expected);
        }

        /// Invariant: a whole zip_transform matches the host device
        #[test]
        fn prop_zip_transform_matches_host(
            lhs in prop::collection::vec(any::<i64>(), 0..2000),
            groups in 1usize..5,
            lanes in 1usize..65,
        ) {
            let rhs: Vec<i64> = lhs.iter().rev().copied().collect();
            let (host, parallel) = pair(groups, lanes);
            let f = |a: &i64, b: &i64| a.wrapping_sub(*b).rotate_left(3);

            let mut expected = vec![0; lhs.len()];
            let mut actual = vec![0; lhs.len()];
            host.zip_transform_unrolled::<2, _, _, _, _>(&lhs, &rhs, &mut expected, f).unwrap();
            parallel.zip_transform_unrolled::<2, _, _, _, _>(&lhs, &rhs, &mut actual, f).unwrap();
            prop_assert_eq!(actual, expected);
        }

        /// Invariant: a whole in-place update matches the host device
        #[test]
        fn prop_update_matches_host(
            target in prop::collection::vec(-1.0e6f32..1.0e6, 0..2000),
            groups in 1usize..5,
            lanes in 1usize..65,
        ) {
            let source: Vec<f32> = (0..target.len()).map(|i| i as f32 * 0.5).collect();
            let (host, parallel) = pair(groups, lanes);
            let f = |t: &f32, s: &f32| t * 1.5 - s;

            let mut expected = target.clone();
            let mut actual = target;
            host.update_unrolled::<8, _, _, _>(&mut expected, &source, f).unwrap();
            parallel.update_unrolled::<8, _, _, _>(&mut actual, &source, f).unwrap();

            let expected_bits: Vec<u32> = expected.iter().map(|v| v.to_bits()).collect();
            let actual_bits: Vec<u32> = actual.iter().map(|v| v.to_bits()).collect();
            prop_assert_eq!(actual_bits, expected_bits);
        }
    }
}
