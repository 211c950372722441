//! Device kernels.
//!
//! A kernel is the body executed by one lane. Lane `(group, lane)` of a launch
//! with `L` lanes per group and unroll factor `U` owns tile elements
//! `base..base + U` where `base = (group * L + lane) * U`. The map, zip and
//! update kernels all follow this one addressing rule.
//!
//! Kernels do no bounds checking of their own beyond slice indexing; the
//! scheduler only launches geometries whose element count equals the tile
//! length.

use std::marker::PhantomData;

use super::launch::LaneId;
use super::unroll::{unroll, NonZeroUnroll};

/// Work executed by a single lane of a launch.
pub trait Kernel: Sync {
    /// Output element type.
    type Output: Send;

    /// Elements processed per lane.
    const UNROLL: usize;

    /// Runs lane `id`.
    ///
    /// `group_out` is the output slice of the lane's group, i.e. tile elements
    /// `id.group * lanes_per_group * UNROLL` onward, `lanes_per_group * UNROLL`
    /// long. Inputs held by the kernel are indexed tile-relative.
    fn run_lane(&self, id: LaneId, lanes_per_group: usize, group_out: &mut [Self::Output]);
}

/// Unary map kernel: `out[i] = f(&input[i])`.
pub struct MapKernel<'a, T, U, F, const UNROLL: usize> {
    input: &'a [T],
    f: &'a F,
    _out: PhantomData<fn() -> U>,
}

impl<'a, T, U, F, const UNROLL: usize> MapKernel<'a, T, U, F, UNROLL>
where
    F: Fn(&T) -> U,
{
    /// Creates a map kernel over one tile of input.
    pub fn new(input: &'a [T], f: &'a F) -> Self {
        let () = NonZeroUnroll::<UNROLL>::OK;
        Self {
            input,
            f,
            _out: PhantomData,
        }
    }
}

impl<T, U, F, const UNROLL: usize> Kernel for MapKernel<'_, T, U, F, UNROLL>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync,
{
    type Output = U;
    const UNROLL: usize = UNROLL;

    #[inline]
    fn run_lane(&self, id: LaneId, lanes_per_group: usize, group_out: &mut [U]) {
        let base = id.base(lanes_per_group, UNROLL);
        let local = id.lane * UNROLL;
        unroll::<UNROLL, _>(|k| {
            group_out[local + k] = (self.f)(&self.input[base + k]);
        });
    }
}

/// Binary zip kernel: `out[i] = f(&lhs[i], &rhs[i])`.
pub struct ZipKernel<'a, A, B, U, F, const UNROLL: usize> {
    lhs: &'a [A],
    rhs: &'a [B],
    f: &'a F,
    _out: PhantomData<fn() -> U>,
}

impl<'a, A, B, U, F, const UNROLL: usize> ZipKernel<'a, A, B, U, F, UNROLL>
where
    F: Fn(&A, &B) -> U,
{
    /// Creates a zip kernel over one tile of each input.
    pub fn new(lhs: &'a [A], rhs: &'a [B], f: &'a F) -> Self {
        let () = NonZeroUnroll::<UNROLL>::OK;
        debug_assert_eq!(lhs.len(), rhs.len());
        Self {
            lhs,
            rhs,
            f,
            _out: PhantomData,
        }
    }
}

impl<A, B, U, F, const UNROLL: usize> Kernel for ZipKernel<'_, A, B, U, F, UNROLL>
where
    A: Sync,
    B: Sync,
    U: Send,
    F: Fn(&A, &B) -> U + Sync,
{
    type Output = U;
    const UNROLL: usize = UNROLL;

    #[inline]
    fn run_lane(&self, id: LaneId, lanes_per_group: usize, group_out: &mut [U]) {
        let base = id.base(lanes_per_group, UNROLL);
        let local = id.lane * UNROLL;
        unroll::<UNROLL, _>(|k| {
            group_out[local + k] = (self.f)(&self.lhs[base + k], &self.rhs[base + k]);
        });
    }
}

/// In-place binary kernel: `out[i] = f(&out[i], &source[i])`.
///
/// The output doubles as the left operand, which is how compound assignment
/// (`+=`, `-=`, `*=`) reads and writes the target in one pass.
pub struct UpdateKernel<'a, T, S, F, const UNROLL: usize> {
    source: &'a [S],
    f: &'a F,
    _target: PhantomData<fn(T) -> T>,
}

impl<'a, T, S, F, const UNROLL: usize> UpdateKernel<'a, T, S, F, UNROLL>
where
    F: Fn(&T, &S) -> T,
{
    /// Creates an update kernel over one tile of the source.
    pub fn new(source: &'a [S], f: &'a F) -> Self {
        let () = NonZeroUnroll::<UNROLL>::OK;
        Self {
            source,
            f,
            _target: PhantomData,
        }
    }
}

impl<T, S, F, const UNROLL: usize> Kernel for UpdateKernel<'_, T, S, F, UNROLL>
where
    T: Send,
    S: Sync,
    F: Fn(&T, &S) -> T + Sync,
{
    type Output = T;
    const UNROLL: usize = UNROLL;

    #[inline]
    fn run_lane(&self, id: LaneId, lanes_per_group: usize, group_out: &mut [T]) {
        let base = id.base(lanes_per_group, UNROLL);
        let local = id.lane * UNROLL;
        unroll::<UNROLL, _>(|k| {
            let value = (self.f)(&group_out[local + k], &self.source[base + k]);
            group_out[local + k] = value;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_all<K: Kernel>(kernel: &K, groups: usize, lanes: usize, out: &mut [K::Output]) {
        for (group, chunk) in out.chunks_mut(lanes * K::UNROLL).take(groups).enumerate() {
            for lane in 0..lanes {
                kernel.run_lane(LaneId::new(group, lane), lanes, chunk);
            }
        }
    }

    #[test]
    fn test_map_kernel_single_lane() {
        let input = [1, 2, 3, 4];
        let square = |x: &i32| x * x;
        let kernel = MapKernel::<_, _, _, 4>::new(&input, &square);
        let mut out = [0; 4];
        kernel.run_lane(LaneId::new(0, 0), 1, &mut out);
        assert_eq!(out, [1, 4, 9, 16]);
    }

    #[test]
    fn test_map_kernel_lane_addressing() {
        // Two groups of two lanes, unroll 2: lane (1, 1) owns elements 6..8.
        let input: Vec<i32> = (0..8).collect();
        let neg = |x: &i32| -x;
        let kernel = MapKernel::<_, _, _, 2>::new(&input, &neg);
        let mut group_out = [0; 4];
        kernel.run_lane(LaneId::new(1, 1), 2, &mut group_out);
        assert_eq!(group_out, [0, 0, -6, -7]);
    }

    #[test]
    fn test_map_kernel_full_grid() {
        let input: Vec<u32> = (0..24).collect();
        let double = |x: &u32| x * 2;
        let kernel = MapKernel::<_, _, _, 3>::new(&input, &double);
        let mut out = vec![0; 24];
        run_all(&kernel, 2, 4, &mut out);
        let expected: Vec<u32> = (0..24).map(|x| x * 2).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_map_kernel_changes_type() {
        let input = [1.5f64, 2.5];
        let to_string = |x: &f64| format!("{x}");
        let kernel = MapKernel::<_, _, _, 1>::new(&input, &to_string);
        let mut out = vec![String::new(); 2];
        run_all(&kernel, 1, 2, &mut out);
        assert_eq!(out, vec!["1.5".to_string(), "2.5".to_string()]);
    }

    #[test]
    fn test_zip_kernel_applies_unroll() {
        let lhs: Vec<i64> = (0..16).collect();
        let rhs: Vec<i64> = (0..16).map(|x| x * 10).collect();
        let add = |a: &i64, b: &i64| a + b;
        let kernel = ZipKernel::<_, _, _, _, 4>::new(&lhs, &rhs, &add);
        let mut out = vec![0; 16];
        run_all(&kernel, 2, 2, &mut out);
        let expected: Vec<i64> = (0..16).map(|x| x * 11).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_update_kernel_in_place() {
        let source = [10, 20, 30, 40];
        let add = |t: &i32, s: &i32| t + s;
        let kernel = UpdateKernel::<_, _, _, 2>::new(&source, &add);
        let mut target = [1, 2, 3, 4];
        run_all(&kernel, 1, 2, &mut target);
        assert_eq!(target, [11, 22, 33, 44]);
    }

    #[test]
    fn test_kernel_unroll_constant() {
        let input = [0u8; 4];
        let id = |x: &u8| *x;
        let kernel = MapKernel::<_, _, _, 4>::new(&input, &id);
        fn unroll_of<K: Kernel>(_: &K) -> usize {
            K::UNROLL
        }
        assert_eq!(unroll_of(&kernel), 4);
    }
}
