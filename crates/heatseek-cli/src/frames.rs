//! Frame files for replay: a JSON array of frames, each either an 8×8 grid
//! of rows or a flat row-major list of 64 readings (as the sensor reports
//! them).
//!
//! ```json
//! [
//!   [[20.1, 20.4, 21.0, 22.3, 22.1, 21.0, 20.2, 20.0], ...7 more rows],
//!   [20.1, 20.4, 21.0, ...61 more readings],
//!   ...
//! ]
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use heatseek_types::{HeatError, ThermalGrid};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFrame {
    Rows(ThermalGrid),
    Flat(Vec<f32>),
}

/// Read and validate every frame in `path`.
///
/// # Errors
///
/// Returns [`HeatError::Config`] if the file cannot be read, or
/// [`HeatError::Serialization`] if any frame is not a valid 8×8 grid or
/// flat list of 64 finite readings.
pub fn load(path: &Path) -> Result<Vec<ThermalGrid>, HeatError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| HeatError::Config(format!("failed to read frames {}: {e}", path.display())))?;
    parse(&raw)
}

pub fn parse(raw: &str) -> Result<Vec<ThermalGrid>, HeatError> {
    let frames: Vec<RawFrame> = serde_json::from_str(raw)
        .map_err(|e| HeatError::Serialization(format!("invalid frames: {e}")))?;
    frames
        .into_iter()
        .enumerate()
        .map(|(i, frame)| match frame {
            RawFrame::Rows(grid) => Ok(grid),
            RawFrame::Flat(values) => ThermalGrid::from_slice(&values)
                .map_err(|e| HeatError::Serialization(format!("invalid frame {i}: {e}"))),
        })
        .collect()
}

/// A short built-in script that exercises every decision: nothing, heat on
/// the right, then the left, then ahead, then close enough to launch.
pub fn demo() -> Result<Vec<ThermalGrid>, HeatError> {
    [
        [21.0, 21.0, 22.0, 22.0, 22.0, 22.0, 21.0, 21.0],
        [28.0, 27.5, 23.0, 22.0, 22.0, 22.0, 21.0, 21.0],
        [21.0, 21.0, 22.0, 22.0, 22.0, 23.0, 27.0, 28.0],
        [22.0, 23.0, 30.5, 31.0, 30.0, 29.5, 23.0, 22.0],
        [22.0, 24.0, 34.0, 36.5, 35.0, 33.5, 24.0, 22.0],
    ]
    .into_iter()
    .map(ThermalGrid::from_column_max)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatseek_perception::classify;
    use heatseek_types::{Decision, Thresholds};

    #[test]
    fn demo_covers_every_decision() {
        let thresholds = Thresholds::default();
        let decisions: Vec<Decision> = demo()
            .unwrap()
            .iter()
            .map(|g| classify(g, &thresholds))
            .collect();
        assert_eq!(
            decisions,
            [
                Decision::Idle,
                Decision::TurnRight,
                Decision::TurnLeft,
                Decision::MoveForward,
                Decision::Launch,
            ]
        );
    }

    #[test]
    fn parse_accepts_grid_array() {
        let row = "[20,20,20,20,20,20,20,20]";
        let grid = format!("[{}]", vec![row; 8].join(","));
        let frames = parse(&format!("[{grid},{grid}]")).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].column_max()[3], 20.0);
    }

    #[test]
    fn parse_accepts_flat_readings() {
        let mut values = vec![20.0_f32; 64];
        values[8] = 31.5;
        let frames = parse(&format!("[{values:?}]")).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].rows()[1][0], 31.5);
        assert_eq!(frames[0].column_max()[0], 31.5);
    }

    #[test]
    fn parse_rejects_flat_frame_of_wrong_length() {
        let frames = format!("[{:?}]", vec![20.0_f32; 63]);
        assert!(matches!(parse(&frames), Err(HeatError::Serialization(_))));
    }

    #[test]
    fn parse_rejects_short_rows() {
        let grid = format!("[{}]", vec!["[20,20]"; 8].join(","));
        assert!(matches!(
            parse(&format!("[{grid}]")),
            Err(HeatError::Serialization(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("frames.json");
        let frames = demo().unwrap();
        fs::write(&path, serde_json::to_string(&frames).unwrap()).unwrap();
        assert_eq!(load(&path).unwrap(), frames);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        assert!(matches!(
            load(&dir.path().join("absent.json")),
            Err(HeatError::Config(_))
        ));
    }
}
