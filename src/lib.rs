//! # Trueno-Tiling
//!
//! Tiled elementwise dispatch for data-parallel accelerators, and dense-matrix
//! assignment built on top of it.
//!
//! A device runs *launches*: grids of groups, each group a fixed number of
//! lanes, each lane handling a fixed number of consecutive elements. Devices
//! cap both the number of groups and the number of lanes per group, so a long
//! sequence must be split into several launches. The scheduler does that
//! split and guarantees every element is processed exactly once.
//!
//! ## Features
//!
//! - **Tiling**: bulk launches at full width, then one narrow remainder launch
//! - **Unrolling**: compile-time per-lane element count
//! - **Error checking**: the device is checked after each batch of launches
//! - **Assignment**: copy, add, subtract and multiply on row- or column-major matrices
//!
//! ## Quick Start
//!
//! ```rust
//! use trueno_tiling::prelude::*;
//!
//! let scheduler = Scheduler::new(HostDevice::new());
//!
//! let mut a = DenseMatrix::from_rows(&[[1, 2], [3, 4]])?;
//! let b = DenseMatrix::from_rows(&[[10, 20], [30, 40]])?;
//! add_assign(&scheduler, &mut a, &b)?;
//! assert_eq!(a.to_rows(), vec![vec![11, 22], vec![33, 44]]);
//! # Ok::<(), trueno_tiling::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel`: Enable the rayon-backed [`accel::ParallelDevice`]
//! - `full`: All features enabled

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code (Cloudflare incident 2025-11-18)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Dispatch Modules
// ============================================================================

/// Kernels, devices, tiling and the scheduler.
pub mod accel;

/// Scheduler configuration (YAML + environment).
pub mod config;

// ============================================================================
// Matrix Modules
// ============================================================================

/// Host-side dense matrix.
pub mod matrix;

/// Matrix assignment backend.
pub mod assign;

// ============================================================================
// Error Types
// ============================================================================

/// Error types for trueno-tiling operations.
pub mod error;

pub use error::{Error, Result};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and functions for convenient imports.
///
/// ```rust
/// use trueno_tiling::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "parallel")]
    pub use crate::accel::ParallelDevice;
    pub use crate::accel::{Device, HostDevice, LaunchLimits, Scheduler};
    pub use crate::assign::{
        add_assign, assign, assign_with, mult_assign, schur_assign, sub_assign, AssignOp,
    };
    pub use crate::config::{DeviceKind, DispatchConfig};
    pub use crate::error::{Error, Result};
    pub use crate::matrix::{DenseMatrix, StorageOrder};
}

// ============================================================================
// Re-exports
// ============================================================================

/// Re-export trueno for matrix interop.
pub use trueno;
