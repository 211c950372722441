//! Matrix assignment on top of the tiling scheduler.
//!
//! Each assignment issues one scheduler call per major line of the target
//! (a row for row-major, a column for column-major). Lines are processed in
//! order and a device failure aborts the assignment, leaving earlier lines
//! written.

use std::borrow::Cow;
use std::ops::{Add, Mul, Sub};

use crate::accel::device::Device;
use crate::accel::scheduler::Scheduler;
use crate::error::{Error, Result};
use crate::matrix::DenseMatrix;

/// Element types the assignment backend can combine.
pub trait Element:
    Copy + Send + Sync + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self>
{
}

impl<T> Element for T where
    T: Copy + Send + Sync + Add<Output = T> + Sub<Output = T> + Mul<Output = T>
{
}

/// Combining function applied by an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    /// `target = source`
    Copy,
    /// `target = target + source`
    Add,
    /// `target = target - source`
    Sub,
    /// `target = target * source`, elementwise.
    Mul,
    /// Schur product assignment. Not supported.
    Schur,
}

impl AssignOp {
    /// Operation name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Copy => "assign",
            Self::Add => "add_assign",
            Self::Sub => "sub_assign",
            Self::Mul => "mult_assign",
            Self::Schur => "schur_assign",
        }
    }
}

/// Applies `op` elementwise from `source` into `target`.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if the shapes differ; nothing is launched.
/// - [`Error::Unsupported`] for [`AssignOp::Schur`].
/// - [`Error::Device`] if a launch fails; lines before the failing one keep
///   their new values.
pub fn assign_with<D, T>(
    scheduler: &Scheduler<D>,
    target: &mut DenseMatrix<T>,
    source: &DenseMatrix<T>,
    op: AssignOp,
) -> Result<()>
where
    D: Device,
    T: Element,
{
    check_dimensions(target, source)?;
    if op == AssignOp::Schur {
        return Err(Error::Unsupported("schur product assignment"));
    }
    if target.is_empty() {
        return Ok(());
    }

    let source = if source.storage_order() == target.storage_order() {
        Cow::Borrowed(source)
    } else {
        log::debug!(
            "{} relaying source from {:?} to {:?}",
            op.name(),
            source.storage_order(),
            target.storage_order()
        );
        Cow::Owned(source.to_storage_order(target.storage_order()))
    };

    log::debug!(
        "{} {}x{} {:?} lines={}",
        op.name(),
        target.rows(),
        target.columns(),
        target.storage_order(),
        target.major_count()
    );

    for i in 0..target.major_count() {
        let (Some(dst), Some(src)) = (target.major_line_mut(i), source.major_line(i)) else {
            continue;
        };
        match op {
            AssignOp::Copy => scheduler.transform(src, dst, |s| *s)?,
            AssignOp::Add => scheduler.update(dst, src, |t, s| *t + *s)?,
            AssignOp::Sub => scheduler.update(dst, src, |t, s| *t - *s)?,
            AssignOp::Mul => scheduler.update(dst, src, |t, s| *t * *s)?,
            AssignOp::Schur => return Err(Error::Unsupported("schur product assignment")),
        }
    }
    Ok(())
}

/// `target = source`.
///
/// # Errors
///
/// See [`assign_with`].
pub fn assign<D: Device, T: Element>(
    scheduler: &Scheduler<D>,
    target: &mut DenseMatrix<T>,
    source: &DenseMatrix<T>,
) -> Result<()> {
    assign_with(scheduler, target, source, AssignOp::Copy)
}

/// `target += source`.
///
/// # Errors
///
/// See [`assign_with`].
pub fn add_assign<D: Device, T: Element>(
    scheduler: &Scheduler<D>,
    target: &mut DenseMatrix<T>,
    source: &DenseMatrix<T>,
) -> Result<()> {
    assign_with(scheduler, target, source, AssignOp::Add)
}

/// `target -= source`.
///
/// # Errors
///
/// See [`assign_with`].
pub fn sub_assign<D: Device, T: Element>(
    scheduler: &Scheduler<D>,
    target: &mut DenseMatrix<T>,
    source: &DenseMatrix<T>,
) -> Result<()> {
    assign_with(scheduler, target, source, AssignOp::Sub)
}

/// Elementwise `target *= source`.
///
/// # Errors
///
/// See [`assign_with`].
pub fn mult_assign<D: Device, T: Element>(
    scheduler: &Scheduler<D>,
    target: &mut DenseMatrix<T>,
    source: &DenseMatrix<T>,
) -> Result<()> {
    assign_with(scheduler, target, source, AssignOp::Mul)
}

/// Schur product assignment.
///
/// # Errors
///
/// Always fails: [`Error::DimensionMismatch`] for unequal shapes, otherwise
/// [`Error::Unsupported`].
pub fn schur_assign<D: Device, T: Element>(
    scheduler: &Scheduler<D>,
    target: &mut DenseMatrix<T>,
    source: &DenseMatrix<T>,
) -> Result<()> {
    assign_with(scheduler, target, source, AssignOp::Schur)
}

fn check_dimensions<T>(target: &DenseMatrix<T>, source: &DenseMatrix<T>) -> Result<()> {
    if target.shape() != source.shape() {
        return Err(Error::DimensionMismatch {
            target_rows: target.rows(),
            target_columns: target.columns(),
            source_rows: source.rows(),
            source_columns: source.columns(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::device::HostDevice;
    use crate::accel::launch::LaunchLimits;
    use crate::matrix::StorageOrder;

    fn recording_scheduler() -> Scheduler<HostDevice> {
        Scheduler::new(HostDevice::new().recording())
    }

    fn m(rows: &[[i64; 2]]) -> DenseMatrix<i64> {
        DenseMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_add_assign_two_by_two() {
        let scheduler = recording_scheduler();
        let mut target = m(&[[1, 2], [3, 4]]);
        let source = m(&[[10, 20], [30, 40]]);

        add_assign(&scheduler, &mut target, &source).unwrap();

        assert_eq!(target, m(&[[11, 22], [33, 44]]));
        // One remainder launch per row.
        assert_eq!(scheduler.device().launches().len(), 2);
    }

    #[test]
    fn test_sub_and_mult_assign() {
        let scheduler = recording_scheduler();
        let mut target = m(&[[5, 6], [7, 8]]);
        let source = m(&[[1, 2], [3, 4]]);

        sub_assign(&scheduler, &mut target, &source).unwrap();
        assert_eq!(target, m(&[[4, 4], [4, 4]]));

        mult_assign(&scheduler, &mut target, &source).unwrap();
        assert_eq!(target, m(&[[4, 8], [12, 16]]));
    }

    #[test]
    fn test_assign_copies_source() {
        let scheduler = recording_scheduler();
        let mut target = DenseMatrix::<i64>::new(2, 2, StorageOrder::RowMajor).unwrap();
        let source = m(&[[1, 2], [3, 4]]);
        assign(&scheduler, &mut target, &source).unwrap();
        assert_eq!(target, source);
    }

    #[test]
    fn test_assign_self_copy_is_identity() {
        let scheduler = recording_scheduler();
        let mut a = m(&[[9, -1], [0, 7]]);
        let snapshot = a.clone();
        assign(&scheduler, &mut a, &snapshot).unwrap();
        assert_eq!(a, snapshot);
    }

    #[test]
    fn test_dimension_mismatch_launches_nothing() {
        let scheduler = recording_scheduler();
        let mut target = DenseMatrix::<i64>::new(2, 3, StorageOrder::RowMajor).unwrap();
        let source = DenseMatrix::<i64>::new(3, 2, StorageOrder::RowMajor).unwrap();

        for op in [AssignOp::Copy, AssignOp::Add, AssignOp::Sub, AssignOp::Mul, AssignOp::Schur] {
            let err = assign_with(&scheduler, &mut target, &source, op).unwrap_err();
            assert!(matches!(
                err,
                Error::DimensionMismatch {
                    target_rows: 2,
                    target_columns: 3,
                    source_rows: 3,
                    source_columns: 2,
                }
            ));
        }
        assert!(scheduler.device().launches().is_empty());
    }

    #[test]
    fn test_schur_is_unsupported() {
        let scheduler = recording_scheduler();
        let mut target = m(&[[1, 2], [3, 4]]);
        let source = target.clone();
        let err = schur_assign(&scheduler, &mut target, &source).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        assert_eq!(target, source);
        assert!(scheduler.device().launches().is_empty());
    }

    #[test]
    fn test_column_major_dispatches_per_column() {
        let scheduler = recording_scheduler();
        let mut target = DenseMatrix::<i64>::new(2, 3, StorageOrder::ColumnMajor).unwrap();
        let source = DenseMatrix::from_rows(&[[1, 2, 3], [4, 5, 6]])
            .unwrap()
            .to_storage_order(StorageOrder::ColumnMajor);

        add_assign(&scheduler, &mut target, &source).unwrap();

        assert_eq!(target.to_rows(), vec![vec![1, 2, 3], vec![4, 5, 6]]);
        let launches = scheduler.device().launches();
        assert_eq!(launches.len(), 3);
        assert!(launches.iter().all(|l| l.config.lanes_per_group == 2));
    }

    #[test]
    fn test_mixed_storage_orders() {
        let scheduler = recording_scheduler();
        let mut target = DenseMatrix::from_rows(&[[1, 1, 1], [2, 2, 2]]).unwrap();
        let source = DenseMatrix::from_rows(&[[1, 2, 3], [4, 5, 6]])
            .unwrap()
            .to_storage_order(StorageOrder::ColumnMajor);

        add_assign(&scheduler, &mut target, &source).unwrap();

        assert_eq!(target.storage_order(), StorageOrder::RowMajor);
        assert_eq!(target.to_rows(), vec![vec![2, 3, 4], vec![6, 7, 8]]);
    }

    #[test]
    fn test_empty_matrices_launch_nothing() {
        let scheduler = recording_scheduler();
        let mut target = DenseMatrix::<f32>::new(0, 5, StorageOrder::RowMajor).unwrap();
        let source = DenseMatrix::<f32>::new(0, 5, StorageOrder::ColumnMajor).unwrap();
        add_assign(&scheduler, &mut target, &source).unwrap();

        let mut target = DenseMatrix::<f32>::new(3, 0, StorageOrder::RowMajor).unwrap();
        let source = DenseMatrix::<f32>::new(3, 0, StorageOrder::RowMajor).unwrap();
        assign(&scheduler, &mut target, &source).unwrap();

        assert!(scheduler.device().launches().is_empty());
    }

    #[test]
    fn test_long_rows_span_bulk_and_remainder() {
        let limits = LaunchLimits::new(2, 8).unwrap();
        let scheduler = Scheduler::new(HostDevice::with_limits(limits).recording());
        let columns = 2 * 8 * 4 + 5;
        let mut target = DenseMatrix::<i32>::new(2, columns, StorageOrder::RowMajor).unwrap();
        let source = DenseMatrix::from_vec(
            2,
            columns,
            StorageOrder::RowMajor,
            (0..2 * columns as i32).collect(),
        )
        .unwrap();

        assign(&scheduler, &mut target, &source).unwrap();

        assert_eq!(target, source);
        // Per row: one bulk launch plus one remainder launch.
        assert_eq!(scheduler.device().launches().len(), 4);
    }

    #[test]
    fn test_device_failure_keeps_earlier_rows() {
        // Each 2-wide row is a single launch; the second launch fails.
        let scheduler = Scheduler::new(HostDevice::new().fail_after(1));
        let mut target = m(&[[0, 0], [0, 0], [0, 0]]);
        let source = m(&[[1, 2], [3, 4], [5, 6]]);

        let err = assign(&scheduler, &mut target, &source).unwrap_err();

        assert!(matches!(err, Error::Device(_)));
        assert_eq!(target, m(&[[1, 2], [0, 0], [0, 0]]));
    }

    #[test]
    fn test_op_names() {
        assert_eq!(AssignOp::Copy.name(), "assign");
        assert_eq!(AssignOp::Mul.name(), "mult_assign");
    }
}
