use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("Length array size {size} does not match any dimension of data shape {shape:?}")]
    ShapeMismatch { size: usize, shape: (usize, usize) },
}

/// Tile a 1-D length vector into the shape of a `(rows, cols)` data array.
///
/// A vector with one entry per row becomes constant rows; otherwise a
/// vector with one entry per column is repeated on every row. The row
/// interpretation wins when the data is square.
pub fn tile_length_to_match_data(
    lengths: ArrayView1<'_, f64>,
    shape: (usize, usize),
) -> Result<Array2<f64>, GridError> {
    let (rows, cols) = shape;
    if lengths.len() == rows {
        Ok(Array2::from_shape_fn(shape, |(i, _)| lengths[i]))
    } else if lengths.len() == cols {
        Ok(Array2::from_shape_fn(shape, |(_, j)| lengths[j]))
    } else {
        Err(GridError::ShapeMismatch {
            size: lengths.len(),
            shape,
        })
    }
}

/// Repeat `row` on `rows` identical rows.
pub fn broadcast_rows(row: ArrayView1<'_, f64>, rows: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, row.len()), |(_, j)| row[j])
}

/// Row-major flattening, the order the plot series expect.
pub fn flatten(data: &Array2<f64>) -> Array1<f64> {
    data.iter().copied().collect()
}
