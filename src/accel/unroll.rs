//! Compile-time loop unrolling.
//!
//! `unroll::<N, _>(f)` calls `f(0)`, `f(1)`, ..., `f(N - 1)` exactly once each.
//! `N` is a const generic, so after inlining every index is a constant and the
//! optimizer emits the calls as straight-line code with no loop counter.

/// Invokes `f` once for every index in `0..N`.
///
/// No allocation, no state beyond what `f` captures. `N == 0` is a no-op.
///
/// # Example
///
/// ```
/// use trueno_tiling::accel::unroll::unroll;
///
/// let mut seen = [false; 4];
/// unroll::<4, _>(|i| seen[i] = true);
/// assert!(seen.iter().all(|&s| s));
/// ```
#[inline(always)]
pub fn unroll<const N: usize, F>(mut f: F)
where
    F: FnMut(usize),
{
    let mut i = 0;
    while i < N {
        f(i);
        i += 1;
    }
}

/// Compile-time guard rejecting a zero unroll factor.
///
/// Referencing [`NonZeroUnroll::OK`] fails to monomorphize for `N == 0`.
pub struct NonZeroUnroll<const N: usize>;

impl<const N: usize> NonZeroUnroll<N> {
    /// Evaluates to `()` for `N > 0`.
    pub const OK: () = assert!(N > 0, "unroll factor must be at least 1");
}
