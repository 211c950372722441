//! Host-side dense matrix.
//!
//! Owns its elements in a single contiguous buffer laid out row-major or
//! column-major. A *major line* is a row of a row-major matrix or a column of
//! a column-major one; each major line is contiguous and is the unit the
//! assignment backend hands to the scheduler.

use crate::error::{Error, Result};

/// Memory layout of a [`DenseMatrix`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StorageOrder {
    /// Consecutive elements of a row are adjacent.
    #[default]
    RowMajor,
    /// Consecutive elements of a column are adjacent.
    ColumnMajor,
}

/// Dense matrix with contiguous storage.
///
/// # Example
///
/// ```
/// use trueno_tiling::matrix::{DenseMatrix, StorageOrder};
///
/// let m = DenseMatrix::from_rows(&[[1, 2, 3], [4, 5, 6]]).unwrap();
/// assert_eq!(m.rows(), 2);
/// assert_eq!(m.columns(), 3);
/// assert_eq!(m.get(1, 2), Some(&6));
///
/// let t = m.to_storage_order(StorageOrder::ColumnMajor);
/// assert_eq!(t.as_slice(), &[1, 4, 2, 5, 3, 6]);
/// assert_eq!(t.get(1, 2), Some(&6));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<T> {
    rows: usize,
    columns: usize,
    order: StorageOrder,
    data: Vec<T>,
}

impl<T: Clone + Default> DenseMatrix<T> {
    /// Creates a `rows` x `columns` matrix of default values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if `rows * columns` overflows.
    pub fn new(rows: usize, columns: usize, order: StorageOrder) -> Result<Self> {
        let len = element_count(rows, columns, 0)?;
        Ok(Self {
            rows,
            columns,
            order,
            data: vec![T::default(); len],
        })
    }
}

impl<T> DenseMatrix<T> {
    /// Wraps `data` laid out in `order`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if `data.len() != rows * columns` or the
    /// product overflows.
    pub fn from_vec(rows: usize, columns: usize, order: StorageOrder, data: Vec<T>) -> Result<Self> {
        let expected = element_count(rows, columns, data.len())?;
        if data.len() != expected {
            return Err(Error::InvalidData {
                rows,
                columns,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            rows,
            columns,
            order,
            data,
        })
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    /// `(rows, columns)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    /// Memory layout.
    #[must_use]
    pub const fn storage_order(&self) -> StorageOrder {
        self.order
    }

    /// Total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the matrix has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw storage in layout order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consumes the matrix, returning its storage.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Number of major lines (rows if row-major, columns if column-major).
    #[must_use]
    pub const fn major_count(&self) -> usize {
        match self.order {
            StorageOrder::RowMajor => self.rows,
            StorageOrder::ColumnMajor => self.columns,
        }
    }

    /// Length of each major line.
    #[must_use]
    pub const fn minor_len(&self) -> usize {
        match self.order {
            StorageOrder::RowMajor => self.columns,
            StorageOrder::ColumnMajor => self.rows,
        }
    }

    /// Major line `i` as a contiguous slice.
    #[must_use]
    pub fn major_line(&self, i: usize) -> Option<&[T]> {
        if i >= self.major_count() {
            return None;
        }
        let len = self.minor_len();
        Some(&self.data[i * len..(i + 1) * len])
    }

    /// Major line `i` as a contiguous mutable slice.
    pub fn major_line_mut(&mut self, i: usize) -> Option<&mut [T]> {
        if i >= self.major_count() {
            return None;
        }
        let len = self.minor_len();
        Some(&mut self.data[i * len..(i + 1) * len])
    }

    /// Element at `(row, column)`.
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> Option<&T> {
        self.index(row, column).map(|idx| &self.data[idx])
    }

    /// Mutable element at `(row, column)`.
    pub fn get_mut(&mut self, row: usize, column: usize) -> Option<&mut T> {
        self.index(row, column).map(move |idx| &mut self.data[idx])
    }

    /// Sets the element at `(row, column)`.
    ///
    /// Does nothing if the coordinates are out of bounds.
    pub fn set(&mut self, row: usize, column: usize, value: T) {
        if let Some(slot) = self.get_mut(row, column) {
            *slot = value;
        }
    }

    #[inline]
    fn index(&self, row: usize, column: usize) -> Option<usize> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        Some(match self.order {
            StorageOrder::RowMajor => row * self.columns + column,
            StorageOrder::ColumnMajor => column * self.rows + row,
        })
    }
}

impl<T: Clone> DenseMatrix<T> {
    /// Builds a row-major matrix from equally long rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if the rows are ragged.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Result<Self> {
        let columns = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(element_count(rows.len(), columns, 0)?);
        for row in rows {
            let row = row.as_ref();
            if row.len() != columns {
                return Err(Error::InvalidData {
                    rows: rows.len(),
                    columns,
                    expected: columns,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(rows.len(), columns, StorageOrder::RowMajor, data)
    }

    /// Copy of the matrix laid out in `order`.
    #[must_use]
    pub fn to_storage_order(&self, order: StorageOrder) -> Self {
        if order == self.order {
            return self.clone();
        }
        let mut data = Vec::with_capacity(self.data.len());
        match order {
            StorageOrder::RowMajor => {
                for row in 0..self.rows {
                    for column in 0..self.columns {
                        data.push(self.data[column * self.rows + row].clone());
                    }
                }
            }
            StorageOrder::ColumnMajor => {
                for column in 0..self.columns {
                    for row in 0..self.rows {
                        data.push(self.data[row * self.columns + column].clone());
                    }
                }
            }
        }
        Self {
            rows: self.rows,
            columns: self.columns,
            order,
            data,
        }
    }

    /// Rows as owned vectors, independent of layout.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        (0..self.rows)
            .map(|row| {
                (0..self.columns)
                    .filter_map(|column| self.get(row, column).cloned())
                    .collect()
            })
            .collect()
    }
}

/// `rows * columns`, or [`Error::InvalidData`] if it overflows.
fn element_count(rows: usize, columns: usize, actual: usize) -> Result<usize> {
    rows.checked_mul(columns).ok_or(Error::InvalidData {
        rows,
        columns,
        expected: usize::MAX,
        actual,
    })
}

// ============================================================================
// trueno interop
// ============================================================================

impl DenseMatrix<f32> {
    /// Copies a row-major `trueno::Matrix`.
    #[must_use]
    pub fn from_trueno(matrix: &trueno::Matrix<f32>) -> Self {
        Self {
            rows: matrix.rows(),
            columns: matrix.cols(),
            order: StorageOrder::RowMajor,
            data: matrix.as_slice().to_vec(),
        }
    }

    /// Converts into a `trueno::Matrix`, relaying column-major data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Trueno`] if trueno rejects the buffer.
    pub fn to_trueno(&self) -> Result<trueno::Matrix<f32>> {
        let row_major = self.to_storage_order(StorageOrder::RowMajor);
        trueno::Matrix::from_vec(self.rows, self.columns, row_major.data)
            .map_err(|e| Error::Trueno(e.to_string()))
    }
}
