//! Property tests for the classifier priority table.

use heatseek_perception::classify;
use heatseek_types::{Decision, GRID_SIZE, ThermalGrid, Thresholds};
use proptest::prelude::*;

fn thresholds() -> Thresholds {
    Thresholds {
        front_launch: 33.0,
        front_forward: 29.0,
        side_threshold: 26.0,
    }
}

fn any_rows() -> impl Strategy<Value = [[f32; GRID_SIZE]; GRID_SIZE]> {
    proptest::array::uniform8(proptest::array::uniform8(-20.0f32..80.0))
}

proptest! {
    /// A front reading above `front_launch` wins regardless of the sides.
    #[test]
    fn hot_front_always_launches(
        rows in any_rows(),
        row in 0usize..GRID_SIZE,
        col in 2usize..=5,
        excess in 0.01f32..40.0,
    ) {
        let mut rows = rows;
        rows[row][col] = thresholds().front_launch + excess;
        let grid = ThermalGrid::from_rows(rows).unwrap();
        prop_assert_eq!(classify(&grid, &thresholds()), Decision::Launch);
    }

    /// Everything below every threshold is idle.
    #[test]
    fn cold_frame_is_idle(rows in proptest::array::uniform8(
        proptest::array::uniform8(-20.0f32..26.0)
    )) {
        let grid = ThermalGrid::from_rows(rows).unwrap();
        prop_assert_eq!(classify(&grid, &thresholds()), Decision::Idle);
    }

    /// A front maximum exactly at `front_launch` never launches.
    #[test]
    fn front_at_launch_threshold_never_launches(
        rows in proptest::array::uniform8(proptest::array::uniform8(-20.0f32..33.0)),
        row in 0usize..GRID_SIZE,
        col in 2usize..=5,
    ) {
        let mut rows = rows;
        rows[row][col] = thresholds().front_launch;
        let grid = ThermalGrid::from_rows(rows).unwrap();
        prop_assert_eq!(classify(&grid, &thresholds()), Decision::MoveForward);
    }

    /// Classification is deterministic.
    #[test]
    fn classify_is_deterministic(rows in any_rows()) {
        let grid = ThermalGrid::from_rows(rows).unwrap();
        prop_assert_eq!(classify(&grid, &thresholds()), classify(&grid.clone(), &thresholds()));
    }
}
