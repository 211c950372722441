//! Error types for trueno-tiling operations.

use thiserror::Error;

use crate::accel::device::DeviceError;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trueno-tiling operations.
///
/// Precondition violations are reported before any device work is issued.
/// Device failures are reported after the batch of launches that caused them,
/// so earlier tiles or rows may already have been written.
#[derive(Error, Debug)]
pub enum Error {
    /// Target and source matrices have different shapes.
    #[error(
        "Dimension mismatch: target is {target_rows}x{target_columns}, source is {source_rows}x{source_columns}"
    )]
    DimensionMismatch {
        /// Rows of the target matrix.
        target_rows: usize,
        /// Columns of the target matrix.
        target_columns: usize,
        /// Rows of the source matrix.
        source_rows: usize,
        /// Columns of the source matrix.
        source_columns: usize,
    },

    /// Binary inputs of unequal length.
    #[error("Length mismatch: left has {left} elements, right has {right} elements")]
    LengthMismatch {
        /// Length of the left input.
        left: usize,
        /// Length of the right input.
        right: usize,
    },

    /// Output sequence cannot hold the result.
    #[error("Output too short: {required} elements required, {available} available")]
    OutputTooShort {
        /// Number of elements the operation writes.
        required: usize,
        /// Length of the output sequence.
        available: usize,
    },

    /// Matrix data length does not match its shape.
    #[error("Invalid matrix data: {rows}x{columns} needs {expected} elements, got {actual}")]
    InvalidData {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        columns: usize,
        /// Expected element count.
        expected: usize,
        /// Provided element count.
        actual: usize,
    },

    /// Launch limits must be non-zero.
    #[error("Invalid launch limits: max_groups={max_groups}, max_lanes_per_group={max_lanes_per_group}")]
    InvalidLimits {
        /// Maximum group count per launch.
        max_groups: usize,
        /// Maximum lanes per group.
        max_lanes_per_group: usize,
    },

    /// Device-runtime failure reported by the error check after a batch of launches.
    #[error("Device failure: {0}")]
    Device(#[from] DeviceError),

    /// Operation declared but not supported by the accelerator backend.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Configuration parsing error with line number.
    #[error("Configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed, 0 if unknown).
        line: usize,
        /// Parser message.
        message: String,
    },

    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with an invalid value.
        key: String,
        /// Why the value is invalid.
        message: String,
    },

    /// Conversion to or from a trueno matrix failed.
    #[error("trueno interop error: {0}")]
    Trueno(String),
}
