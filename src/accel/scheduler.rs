//! Tiling scheduler.
//!
//! Splits a sequence of arbitrary length into tiles (see
//! [`tiling`](super::tiling)), launches one kernel per tile on a [`Device`],
//! and checks the device for failures after the bulk batch and after the
//! remainder batch. A failure aborts the call; tiles launched before it may
//! already have written their output.

use super::device::Device;
use super::kernel::{MapKernel, UpdateKernel, ZipKernel};
use super::launch::{LaunchLimits, DEFAULT_UNROLL};
use super::tiling::{Phase, Tile, TilePlan};
use crate::config::DispatchConfig;
use crate::error::{Error, Result};

/// Host-side dispatcher of elementwise kernels.
///
/// # Example
///
/// ```
/// use trueno_tiling::accel::{HostDevice, Scheduler};
///
/// let scheduler = Scheduler::new(HostDevice::new());
/// let input: Vec<i32> = (1..=9).collect();
/// let mut output = vec![0; 9];
/// scheduler.transform(&input, &mut output, |x| x * x).unwrap();
/// assert_eq!(output, vec![1, 4, 9, 16, 25, 36, 49, 64, 81]);
/// ```
#[derive(Debug)]
pub struct Scheduler<D: Device> {
    device: D,
    limits: LaunchLimits,
}

impl<D: Device> Scheduler<D> {
    /// Creates a scheduler that uses the device's own limits.
    pub fn new(device: D) -> Self {
        let limits = device.limits();
        Self { device, limits }
    }

    /// Creates a scheduler with explicit limits.
    ///
    /// Limits above the device's caps are not clamped: launches that exceed
    /// them fail on the device and surface as [`Error::Device`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLimits`] if either limit is zero.
    pub fn with_limits(device: D, limits: LaunchLimits) -> Result<Self> {
        limits.validate()?;
        Ok(Self { device, limits })
    }

    /// Creates a scheduler from a dispatch configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(device: D, config: &DispatchConfig) -> Result<Self> {
        config.validate()?;
        Self::with_limits(device, config.limits())
    }

    /// The device launches are submitted to.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Limits used for partitioning.
    pub fn limits(&self) -> LaunchLimits {
        self.limits
    }

    /// Consumes the scheduler, returning its device.
    pub fn into_device(self) -> D {
        self.device
    }

    /// Unary map with the default unroll factor: `output[i] = f(&input[i])`.
    ///
    /// Only `output[..input.len()]` is written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutputTooShort`] before any launch if `output` is
    /// shorter than `input`, [`Error::InvalidLimits`] if a full launch at the
    /// unroll factor would cover more than `usize::MAX` elements, or
    /// [`Error::Device`] if a launch fails.
    pub fn transform<T, U, F>(&self, input: &[T], output: &mut [U], f: F) -> Result<()>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync,
    {
        self.transform_unrolled::<DEFAULT_UNROLL, T, U, F>(input, output, f)
    }

    /// Unary map processing `UNROLL` elements per lane in bulk launches.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::transform`].
    pub fn transform_unrolled<const UNROLL: usize, T, U, F>(
        &self,
        input: &[T],
        output: &mut [U],
        f: F,
    ) -> Result<()>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync,
    {
        let len = input.len();
        let output = output_prefix(output, len)?;

        self.dispatch("transform", len, UNROLL, |tile| {
            let range = tile.range();
            let input = &input[range.clone()];
            let output = &mut output[range];
            match tile.phase {
                Phase::Bulk => self.device.launch(
                    tile.config,
                    &MapKernel::<_, _, _, UNROLL>::new(input, &f),
                    output,
                ),
                Phase::Remainder => self.device.launch(
                    tile.config,
                    &MapKernel::<_, _, _, 1>::new(input, &f),
                    output,
                ),
            }
        })
    }

    /// Binary zip with the default unroll factor:
    /// `output[i] = f(&lhs[i], &rhs[i])`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the inputs differ in length,
    /// [`Error::OutputTooShort`] if `output` is shorter than the inputs, or
    /// [`Error::Device`] if a launch fails.
    pub fn zip_transform<A, B, U, F>(&self, lhs: &[A], rhs: &[B], output: &mut [U], f: F) -> Result<()>
    where
        A: Sync,
        B: Sync,
        U: Send,
        F: Fn(&A, &B) -> U + Sync,
    {
        self.zip_transform_unrolled::<DEFAULT_UNROLL, A, B, U, F>(lhs, rhs, output, f)
    }

    /// Binary zip processing `UNROLL` elements per lane in bulk launches.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::zip_transform`].
    pub fn zip_transform_unrolled<const UNROLL: usize, A, B, U, F>(
        &self,
        lhs: &[A],
        rhs: &[B],
        output: &mut [U],
        f: F,
    ) -> Result<()>
    where
        A: Sync,
        B: Sync,
        U: Send,
        F: Fn(&A, &B) -> U + Sync,
    {
        let len = equal_lengths(lhs.len(), rhs.len())?;
        let output = output_prefix(output, len)?;

        self.dispatch("zip_transform", len, UNROLL, |tile| {
            let range = tile.range();
            let lhs = &lhs[range.clone()];
            let rhs = &rhs[range.clone()];
            let output = &mut output[range];
            match tile.phase {
                Phase::Bulk => self.device.launch(
                    tile.config,
                    &ZipKernel::<_, _, _, _, UNROLL>::new(lhs, rhs, &f),
                    output,
                ),
                Phase::Remainder => self.device.launch(
                    tile.config,
                    &ZipKernel::<_, _, _, _, 1>::new(lhs, rhs, &f),
                    output,
                ),
            }
        })
    }

    /// In-place binary update with the default unroll factor:
    /// `target[i] = f(&target[i], &source[i])`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the sequences differ in length, or
    /// [`Error::Device`] if a launch fails.
    pub fn update<T, S, F>(&self, target: &mut [T], source: &[S], f: F) -> Result<()>
    where
        T: Send,
        S: Sync,
        F: Fn(&T, &S) -> T + Sync,
    {
        self.update_unrolled::<DEFAULT_UNROLL, T, S, F>(target, source, f)
    }

    /// In-place binary update processing `UNROLL` elements per lane in bulk
    /// launches.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::update`].
    pub fn update_unrolled<const UNROLL: usize, T, S, F>(
        &self,
        target: &mut [T],
        source: &[S],
        f: F,
    ) -> Result<()>
    where
        T: Send,
        S: Sync,
        F: Fn(&T, &S) -> T + Sync,
    {
        let len = equal_lengths(target.len(), source.len())?;

        self.dispatch("update", len, UNROLL, |tile| {
            let range = tile.range();
            let source = &source[range.clone()];
            let target = &mut target[range];
            match tile.phase {
                Phase::Bulk => self.device.launch(
                    tile.config,
                    &UpdateKernel::<_, _, _, UNROLL>::new(source, &f),
                    target,
                ),
                Phase::Remainder => self.device.launch(
                    tile.config,
                    &UpdateKernel::<_, _, _, 1>::new(source, &f),
                    target,
                ),
            }
        })
    }

    /// Walks the tile plan, checking the device at each batch boundary.
    fn dispatch(
        &self,
        op: &'static str,
        len: usize,
        unroll: usize,
        mut launch: impl FnMut(&Tile),
    ) -> Result<()> {
        let plan = TilePlan::new(len, self.limits, unroll)?;

        if log::log_enabled!(log::Level::Debug) {
            let summary = plan.summary();
            log::debug!(
                "{op} begin device={} len={len} unroll={unroll} bulk_launches={} bulk_elements={} remainder_launches={} remainder_elements={}",
                self.device.name(),
                summary.bulk_launches,
                summary.bulk_elements,
                summary.remainder_launches,
                summary.remainder_elements
            );
        }

        let mut batch = Phase::Bulk;
        for tile in plan {
            if tile.phase != batch {
                self.check(op)?;
                batch = tile.phase;
            }
            log::trace!(
                "{op} launch phase={:?} offset={} groups={} lanes={} unroll={}",
                tile.phase,
                tile.offset,
                tile.config.groups,
                tile.config.lanes_per_group,
                tile.config.unroll
            );
            launch(&tile);
        }
        self.check(op)
    }

    /// Error check: surfaces any failure latched by the device.
    fn check(&self, op: &'static str) -> Result<()> {
        self.device.synchronize().map_err(|err| {
            log::error!("{op} aborted on {}: {err}", self.device.name());
            Error::Device(err)
        })
    }
}

fn output_prefix<U>(output: &mut [U], len: usize) -> Result<&mut [U]> {
    if output.len() < len {
        return Err(Error::OutputTooShort {
            required: len,
            available: output.len(),
        });
    }
    Ok(&mut output[..len])
}

fn equal_lengths(left: usize, right: usize) -> Result<usize> {
    if left != right {
        return Err(Error::LengthMismatch { left, right });
    }
    Ok(left)
}


// ============================================================================
// Property-based tests with proptest
// ============================================================================
