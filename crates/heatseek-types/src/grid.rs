//! [`ThermalGrid`] – one immutable 8×8 frame from the thermal array.
//!
//! Rows run top-to-bottom, columns left-to-right as seen by the sensor.  The
//! per-column maximum is computed once at construction so every consumer of
//! the frame sees the same aggregation.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::HeatError;

/// Number of rows and columns in a frame.
pub const GRID_SIZE: usize = 8;

/// Total number of pixels in a frame.
pub const GRID_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// A single 8×8 thermal frame (°C).
///
/// Every value is guaranteed finite.  Serialises as a list of eight rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "[[f32; GRID_SIZE]; GRID_SIZE]",
    into = "[[f32; GRID_SIZE]; GRID_SIZE]"
)]
pub struct ThermalGrid {
    rows: [[f32; GRID_SIZE]; GRID_SIZE],
    column_max: [f32; GRID_SIZE],
}

impl ThermalGrid {
    /// Build a frame from row-major rows.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Sensor`] if any value is NaN or infinite.
    pub fn from_rows(rows: [[f32; GRID_SIZE]; GRID_SIZE]) -> Result<Self, HeatError> {
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_finite() {
                    return Err(HeatError::Sensor(format!(
                        "non-finite reading {value} at row {r}, column {c}"
                    )));
                }
            }
        }

        let mut column_max = [f32::NEG_INFINITY; GRID_SIZE];
        for row in &rows {
            for (max, value) in column_max.iter_mut().zip(row) {
                *max = max.max(*value);
            }
        }

        Ok(Self { rows, column_max })
    }

    /// Build a frame from a flat row-major slice of exactly 64 values.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Sensor`] on a wrong length or a non-finite value.
    pub fn from_slice(values: &[f32]) -> Result<Self, HeatError> {
        if values.len() != GRID_CELLS {
            return Err(HeatError::Sensor(format!(
                "expected {GRID_CELLS} readings, got {}",
                values.len()
            )));
        }
        let mut rows = [[0.0; GRID_SIZE]; GRID_SIZE];
        for (row, chunk) in rows.iter_mut().zip(values.chunks_exact(GRID_SIZE)) {
            row.copy_from_slice(chunk);
        }
        Self::from_rows(rows)
    }

    /// Build a frame whose every row equals `columns`, so that
    /// [`column_max`][Self::column_max] returns exactly `columns`.
    pub fn from_column_max(columns: [f32; GRID_SIZE]) -> Result<Self, HeatError> {
        Self::from_rows([columns; GRID_SIZE])
    }

    /// A frame with every pixel at `value`.
    pub fn uniform(value: f32) -> Result<Self, HeatError> {
        Self::from_column_max([value; GRID_SIZE])
    }

    /// The raw rows.
    pub fn rows(&self) -> &[[f32; GRID_SIZE]; GRID_SIZE] {
        &self.rows
    }

    /// Maximum temperature in each column.
    pub fn column_max(&self) -> &[f32; GRID_SIZE] {
        &self.column_max
    }

    /// Maximum over an inclusive range of columns.
    ///
    /// Returns `f32::NEG_INFINITY` for an empty or out-of-bounds range.
    pub fn max_over(&self, columns: RangeInclusive<usize>) -> f32 {
        self.column_max
            .get(columns)
            .map(|cols| cols.iter().copied().fold(f32::NEG_INFINITY, f32::max))
            .unwrap_or(f32::NEG_INFINITY)
    }

    /// All 64 readings, row-major.
    pub fn flatten(&self) -> Vec<f32> {
        self.rows.iter().flatten().copied().collect()
    }
}

impl TryFrom<[[f32; GRID_SIZE]; GRID_SIZE]> for ThermalGrid {
    type Error = HeatError;

    fn try_from(rows: [[f32; GRID_SIZE]; GRID_SIZE]) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<ThermalGrid> for [[f32; GRID_SIZE]; GRID_SIZE] {
    fn from(grid: ThermalGrid) -> Self {
        grid.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_max_picks_hottest_row_per_column() {
        let mut rows = [[20.0; GRID_SIZE]; GRID_SIZE];
        rows[3][0] = 31.5;
        rows[7][4] = 40.0;
        rows[0][7] = 22.25;
        let grid = ThermalGrid::from_rows(rows).unwrap();

        assert_eq!(grid.column_max()[0], 31.5);
        assert_eq!(grid.column_max()[4], 40.0);
        assert_eq!(grid.column_max()[7], 22.25);
        assert_eq!(grid.column_max()[1], 20.0);
    }

    #[test]
    fn non_finite_reading_is_rejected() {
        let mut rows = [[20.0; GRID_SIZE]; GRID_SIZE];
        rows[2][5] = f32::NAN;
        let err = ThermalGrid::from_rows(rows).unwrap_err();
        assert!(matches!(err, HeatError::Sensor(ref msg) if msg.contains("row 2, column 5")));

        rows[2][5] = f32::INFINITY;
        assert!(ThermalGrid::from_rows(rows).is_err());
    }

    #[test]
    fn from_slice_requires_64_values() {
        assert!(ThermalGrid::from_slice(&[1.0; 63]).is_err());
        assert!(ThermalGrid::from_slice(&[1.0; 65]).is_err());

        let values: Vec<f32> = (0..GRID_CELLS).map(|v| v as f32).collect();
        let grid = ThermalGrid::from_slice(&values).unwrap();
        assert_eq!(grid.rows()[1][0], 8.0);
        assert_eq!(grid.column_max()[3], 59.0);
        assert_eq!(grid.flatten(), values);
    }

    #[test]
    fn max_over_zone() {
        let grid =
            ThermalGrid::from_column_max([10.0, 12.0, 35.0, 30.0, 31.0, 29.0, 5.0, 7.0]).unwrap();
        assert_eq!(grid.max_over(0..=1), 12.0);
        assert_eq!(grid.max_over(2..=5), 35.0);
        assert_eq!(grid.max_over(6..=7), 7.0);
        assert_eq!(grid.max_over(6..=9), f32::NEG_INFINITY);
    }

    #[test]
    fn json_is_a_list_of_rows() {
        let grid = ThermalGrid::uniform(21.5).unwrap();
        let json = serde_json::to_string(&grid).unwrap();
        assert!(json.starts_with("[[21.5,"));
        let back: ThermalGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn json_with_wrong_shape_is_rejected() {
        let short = "[[1.0, 2.0]]";
        assert!(serde_json::from_str::<ThermalGrid>(short).is_err());
    }
}
