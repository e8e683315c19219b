//! Dense matrices indexed by sorted position.

use std::fmt;

/// Dense row-major 2-D store.
///
/// Rows and columns are positions in the name-sorted element, device and user
/// collections of a [`Problem`](crate::problem::Problem). Reads outside the matrix
/// yield `T::default()` and writes outside it are ignored; callers only ever index
/// with positions taken from the same problem.
#[derive(Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Matrix<T> {
    /// Create a matrix filled with `T::default()`.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, T::default())
    }

    /// Create a matrix filled with `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Build a matrix from a function of `(row, col)`.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let data = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .map(|(r, c)| f(r, c))
            .collect();

        Self { rows, cols, data }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then_some(row * self.cols + col)
    }

    /// Value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        self.offset(row, col)
            .and_then(|offset| self.data.get(offset))
            .copied()
    }

    /// Value at `(row, col)`, or `T::default()` outside the matrix.
    pub fn at(&self, row: usize, col: usize) -> T {
        self.get(row, col).unwrap_or_default()
    }

    /// Overwrite the value at `(row, col)`; a write outside the matrix is ignored.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        if let Some(slot) = self
            .offset(row, col)
            .and_then(|offset| self.data.get_mut(offset))
        {
            *slot = value;
        }
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, col: usize) -> impl Iterator<Item = T> + '_ {
        (0..self.rows).map(move |row| self.at(row, col))
    }

    /// Values of one row, left to right.
    pub fn row(&self, row: usize) -> impl Iterator<Item = T> + '_ {
        (0..self.cols).map(move |col| self.at(row, col))
    }

    /// Apply `f` to every value in place.
    pub fn map_in_place(&mut self, mut f: impl FnMut(T) -> T) {
        for value in &mut self.data {
            *value = f(*value);
        }
    }
}

impl Matrix<f64> {
    /// Scale one column to `[0, 1]` by dividing by its maximum.
    ///
    /// The lower bound of the range is pinned at zero rather than the column minimum.
    /// A column whose maximum does not exceed `epsilon` is left untouched, so an
    /// all-zero column stays all-zero.
    pub fn normalize_column(&mut self, col: usize, epsilon: f64) {
        let max = self.column(col).fold(0.0_f64, f64::max);

        if max > epsilon {
            for row in 0..self.rows {
                let value = self.at(row, col);
                self.set(row, col, value / max);
            }
        }
    }

    /// Divide every value of a column by `divisor`.
    pub fn divide_column(&mut self, col: usize, divisor: f64) {
        for row in 0..self.rows {
            let value = self.at(row, col);
            self.set(row, col, value / divisor);
        }
    }

    /// Smallest and largest value in the matrix, if it is not empty.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.data.iter().copied().fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

impl Matrix<bool> {
    /// Number of `true` values in a column.
    pub fn count_column(&self, col: usize) -> usize {
        self.column(col).filter(|&v| v).count()
    }

    /// Whether any value in a column is `true`.
    pub fn any_in_column(&self, col: usize) -> bool {
        self.column(col).any(|v| v)
    }
}

impl<T: Copy + Default + fmt::Debug> fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();

        for row in 0..self.rows {
            list.entry(&self.row(row).collect::<Vec<_>>());
        }

        list.finish()
    }
}
