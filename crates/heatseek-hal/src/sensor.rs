//! Generic `ThermalSensor` trait for 8×8 infrared arrays.

use async_trait::async_trait;
use heatseek_types::{HeatError, ThermalGrid};

/// A thermal array that produces one [`ThermalGrid`] per read.
#[async_trait]
pub trait ThermalSensor: Send {
    /// Stable identifier for this sensor, e.g. `"amg8833"`.
    fn id(&self) -> &str;

    /// Read the next complete frame.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Sensor`] if the bus read fails or the frame
    /// contains non-finite values.
    async fn read_frame(&mut self) -> Result<ThermalGrid, HeatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockSensor {
        reads: usize,
    }

    #[async_trait]
    impl ThermalSensor for MockSensor {
        fn id(&self) -> &str {
            "mock_array"
        }

        async fn read_frame(&mut self) -> Result<ThermalGrid, HeatError> {
            self.reads += 1;
            if self.reads % 2 == 0 {
                return Err(HeatError::Sensor("i2c nack".to_string()));
            }
            ThermalGrid::uniform(20.0)
        }
    }

    #[tokio::test]
    async fn mock_sensor_alternates_frames_and_faults() {
        let mut sensor = MockSensor { reads: 0 };
        assert_eq!(sensor.id(), "mock_array");
        let frame = sensor.read_frame().await.unwrap();
        assert_eq!(frame.column_max()[0], 20.0);
        assert!(matches!(
            sensor.read_frame().await,
            Err(HeatError::Sensor(_))
        ));
    }
}
