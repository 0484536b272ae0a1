//! Heat classifier.
//!
//! Maps a [`ThermalGrid`] to a [`Decision`] by comparing per-zone column
//! maxima against fixed [`Thresholds`].
//!
//! # Zones
//!
//! Column indices follow the sensor mounting, so "right" is on the low
//! column indices:
//!
//! | Zone | Columns |
//! |---|---|
//! | right | 0–1 |
//! | front | 2–5 |
//! | left | 6–7 |
//!
//! # Priority
//!
//! ```text
//! front > front_launch   → Launch
//! front > front_forward  → MoveForward
//! right > side_threshold → TurnRight
//! left  > side_threshold → TurnLeft
//! otherwise              → Idle
//! ```
//!
//! The first matching row wins, and every comparison is strict.
//!
//! # Example
//!
//! ```rust
//! use heatseek_perception::classifier::classify;
//! use heatseek_types::{Decision, ThermalGrid, Thresholds};
//!
//! let grid = ThermalGrid::from_column_max([10.0, 10.0, 35.0, 35.0, 35.0, 35.0, 10.0, 10.0])?;
//! assert_eq!(classify(&grid, &Thresholds::default()), Decision::Launch);
//! # Ok::<(), heatseek_types::HeatError>(())
//! ```

use std::ops::RangeInclusive;

use heatseek_types::{Decision, HeatError, ThermalGrid, Thresholds};
use tracing::debug;

/// Columns facing the right-hand side of the platform.
pub const RIGHT_COLUMNS: RangeInclusive<usize> = 0..=1;
/// Columns facing straight ahead.
pub const FRONT_COLUMNS: RangeInclusive<usize> = 2..=5;
/// Columns facing the left-hand side of the platform.
pub const LEFT_COLUMNS: RangeInclusive<usize> = 6..=7;

/// Hottest reading in each zone of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneMaxima {
    pub right: f32,
    pub front: f32,
    pub left: f32,
}

/// Compute the per-zone maxima of `grid`.
pub fn zone_maxima(grid: &ThermalGrid) -> ZoneMaxima {
    ZoneMaxima {
        right: grid.max_over(RIGHT_COLUMNS),
        front: grid.max_over(FRONT_COLUMNS),
        left: grid.max_over(LEFT_COLUMNS),
    }
}

/// Classify `grid` against `thresholds`.  Pure and total: every finite grid
/// yields a decision.
pub fn classify(grid: &ThermalGrid, thresholds: &Thresholds) -> Decision {
    decide(&zone_maxima(grid), thresholds)
}

/// Apply the priority table to precomputed zone maxima.
pub fn decide(zones: &ZoneMaxima, thresholds: &Thresholds) -> Decision {
    if zones.front > thresholds.front_launch {
        Decision::Launch
    } else if zones.front > thresholds.front_forward {
        Decision::MoveForward
    } else if zones.right > thresholds.side_threshold {
        Decision::TurnRight
    } else if zones.left > thresholds.side_threshold {
        Decision::TurnLeft
    } else {
        Decision::Idle
    }
}

/// A classifier bound to a validated set of [`Thresholds`].
#[derive(Debug, Clone, Copy)]
pub struct HeatClassifier {
    thresholds: Thresholds,
}

impl HeatClassifier {
    /// Validate `thresholds` and bind them.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Config`] if the thresholds are invalid.
    pub fn new(thresholds: Thresholds) -> Result<Self, HeatError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Classify `grid`, returning the zone maxima alongside the decision.
    pub fn classify(&self, grid: &ThermalGrid) -> (Decision, ZoneMaxima) {
        let zones = zone_maxima(grid);
        let decision = decide(&zones, &self.thresholds);
        debug!(
            right = zones.right,
            front = zones.front,
            left = zones.left,
            decision = %decision,
            "frame classified"
        );
        (decision, zones)
    }
}
