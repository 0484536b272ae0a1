//! In-process simulated drivers for CI/CD testing without physical hardware.
//!
//! - [`SimGpio`] records every write and can inject faults or stalls.  A
//!   cloned [`SimGpioProbe`] stays with the test after the port has been
//!   moved into an [`ActuatorController`][crate::controller::ActuatorController].
//! - [`ReplaySensor`] plays back a fixed list of frames (or read failures).
//!
//! # Example
//!
//! ```rust
//! use heatseek_hal::sim::{ReplaySensor, SimGpio};
//! use heatseek_types::ThermalGrid;
//!
//! let gpio = SimGpio::new("sim_gpio");
//! let probe = gpio.probe();
//! assert!(probe.writes().is_empty());
//!
//! let sensor = ReplaySensor::new("sim_array", vec![ThermalGrid::uniform(20.0)?]).looping();
//! assert_eq!(sensor.remaining(), 1);
//! # Ok::<(), heatseek_types::HeatError>(())
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use heatseek_types::{HeatError, ThermalGrid};

use crate::gpio::{GpioPort, PinId, PwmChannelId};
use crate::sensor::ThermalSensor;

// ────────────────────────────────────────────────────────────────────────────
// Simulated GPIO
// ────────────────────────────────────────────────────────────────────────────

/// One recorded hardware write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GpioWrite {
    Output { pin: PinId, level: bool },
    Pwm { channel: PwmChannelId, duty: f32 },
}

#[derive(Debug, Default)]
struct SimGpioState {
    writes: Vec<GpioWrite>,
    levels: HashMap<PinId, bool>,
    duties: HashMap<PwmChannelId, f32>,
    fail_remaining: usize,
    stall: Option<Duration>,
    released: bool,
}

/// A simulated GPIO header.  Always succeeds unless a fault is armed via
/// [`SimGpioProbe::fail_next`] or a stall via [`SimGpioProbe::stall_writes`].
pub struct SimGpio {
    id: String,
    state: Arc<Mutex<SimGpioState>>,
}

impl SimGpio {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Arc::default(),
        }
    }

    /// A handle that observes (and can sabotage) this port.
    pub fn probe(&self) -> SimGpioProbe {
        SimGpioProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimGpioState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Applies armed stalls and faults ahead of a write.
    async fn before_write(&self, target: String) -> Result<(), HeatError> {
        let (stall, fail, released) = {
            let mut state = self.lock();
            let fail = state.fail_remaining > 0;
            if fail {
                state.fail_remaining -= 1;
            }
            (state.stall, fail, state.released)
        };
        if released {
            return Err(HeatError::Actuation {
                component: self.id.clone(),
                details: format!("write to {target} after release"),
            });
        }
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
        if fail {
            return Err(HeatError::Actuation {
                component: self.id.clone(),
                details: format!("injected fault writing {target}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GpioPort for SimGpio {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set_output(&mut self, pin: PinId, level: bool) -> Result<(), HeatError> {
        self.before_write(format!("pin {pin}")).await?;
        let mut state = self.lock();
        state.levels.insert(pin, level);
        state.writes.push(GpioWrite::Output { pin, level });
        Ok(())
    }

    async fn set_pwm_duty(
        &mut self,
        channel: PwmChannelId,
        duty_percent: f32,
    ) -> Result<(), HeatError> {
        self.before_write(format!("pwm channel {channel}")).await?;
        let mut state = self.lock();
        state.duties.insert(channel, duty_percent);
        state.writes.push(GpioWrite::Pwm {
            channel,
            duty: duty_percent,
        });
        Ok(())
    }

    async fn release(&mut self) -> Result<(), HeatError> {
        let mut state = self.lock();
        state.duties.clear();
        state.levels.clear();
        state.released = true;
        Ok(())
    }
}

/// Observer for a [`SimGpio`] that has been moved elsewhere.
#[derive(Clone)]
pub struct SimGpioProbe {
    state: Arc<Mutex<SimGpioState>>,
}

impl SimGpioProbe {
    fn lock(&self) -> MutexGuard<'_, SimGpioState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every successful write so far, oldest first.
    pub fn writes(&self) -> Vec<GpioWrite> {
        self.lock().writes.clone()
    }

    /// Forget the recorded write history (current levels are kept).
    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Last level written to `pin`.
    pub fn level(&self, pin: PinId) -> Option<bool> {
        self.lock().levels.get(&pin).copied()
    }

    /// Last duty written to `channel`.
    pub fn duty(&self, channel: PwmChannelId) -> Option<f32> {
        self.lock().duties.get(&channel).copied()
    }

    /// Every duty written to `channel`, oldest first.
    pub fn pwm_history(&self, channel: PwmChannelId) -> Vec<f32> {
        self.lock()
            .writes
            .iter()
            .filter_map(|w| match *w {
                GpioWrite::Pwm { channel: c, duty } if c == channel => Some(duty),
                _ => None,
            })
            .collect()
    }

    pub fn is_released(&self) -> bool {
        self.lock().released
    }

    /// Make the next `n` writes fail.
    pub fn fail_next(&self, n: usize) {
        self.lock().fail_remaining = n;
    }

    /// Delay every subsequent write by `stall` (`None` to disable).
    pub fn stall_writes(&self, stall: Option<Duration>) {
        self.lock().stall = stall;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Replay sensor
// ────────────────────────────────────────────────────────────────────────────

/// A thermal sensor that plays back a fixed script of reads.
pub struct ReplaySensor {
    id: String,
    readings: Vec<Result<ThermalGrid, HeatError>>,
    cursor: usize,
    looping: bool,
}

impl ReplaySensor {
    /// Replay `frames` once, then report the sensor as exhausted.
    pub fn new(id: impl Into<String>, frames: Vec<ThermalGrid>) -> Self {
        Self::from_readings(id, frames.into_iter().map(Ok).collect())
    }

    /// Replay arbitrary reads, including failures.
    pub fn from_readings(
        id: impl Into<String>,
        readings: Vec<Result<ThermalGrid, HeatError>>,
    ) -> Self {
        Self {
            id: id.into(),
            readings,
            cursor: 0,
            looping: false,
        }
    }

    /// Start over from the first reading once the script runs out.
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Reads left before the script is exhausted (or wraps).
    pub fn remaining(&self) -> usize {
        self.readings.len().saturating_sub(self.cursor)
    }
}

#[async_trait]
impl ThermalSensor for ReplaySensor {
    fn id(&self) -> &str {
        &self.id
    }

    async fn read_frame(&mut self) -> Result<ThermalGrid, HeatError> {
        if self.cursor >= self.readings.len() {
            if self.looping && !self.readings.is_empty() {
                self.cursor = 0;
            } else {
                return Err(HeatError::Sensor(format!("{}: replay exhausted", self.id)));
            }
        }
        let reading = self.readings[self.cursor].clone();
        self.cursor += 1;
        reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sim_gpio_records_levels_and_duties() {
        let mut gpio = SimGpio::new("sim");
        let probe = gpio.probe();

        gpio.set_output(22, true).await.unwrap();
        gpio.set_pwm_duty(13, 30.0).await.unwrap();
        gpio.set_pwm_duty(13, 0.0).await.unwrap();

        assert_eq!(probe.level(22), Some(true));
        assert_eq!(probe.duty(13), Some(0.0));
        assert_eq!(probe.pwm_history(13), vec![30.0, 0.0]);
        assert_eq!(probe.writes().len(), 3);
    }

    #[tokio::test]
    async fn sim_gpio_injected_fault_is_not_recorded() {
        let mut gpio = SimGpio::new("sim");
        let probe = gpio.probe();
        probe.fail_next(1);

        assert!(matches!(
            gpio.set_output(5, true).await,
            Err(HeatError::Actuation { .. })
        ));
        assert!(probe.writes().is_empty());
        // The fault is consumed.
        gpio.set_output(5, true).await.unwrap();
        assert_eq!(probe.level(5), Some(true));
    }

    #[tokio::test]
    async fn sim_gpio_rejects_writes_after_release() {
        let mut gpio = SimGpio::new("sim");
        let probe = gpio.probe();
        gpio.release().await.unwrap();
        assert!(probe.is_released());
        assert!(gpio.set_pwm_duty(5, 2.5).await.is_err());
    }

    #[tokio::test]
    async fn replay_sensor_plays_script_then_exhausts() {
        let frame = ThermalGrid::uniform(18.0).unwrap();
        let mut sensor = ReplaySensor::from_readings(
            "replay",
            vec![Ok(frame.clone()), Err(HeatError::Sensor("bus".into()))],
        );
        assert_eq!(sensor.read_frame().await.unwrap(), frame);
        assert!(sensor.read_frame().await.is_err());
        assert_eq!(sensor.remaining(), 0);
        let err = sensor.read_frame().await.unwrap_err();
        assert!(err.to_string().contains("exhausted"));
    }

    #[tokio::test]
    async fn looping_replay_wraps_around() {
        let a = ThermalGrid::uniform(1.0).unwrap();
        let b = ThermalGrid::uniform(2.0).unwrap();
        let mut sensor = ReplaySensor::new("replay", vec![a.clone(), b.clone()]).looping();
        assert_eq!(sensor.read_frame().await.unwrap(), a);
        assert_eq!(sensor.read_frame().await.unwrap(), b);
        assert_eq!(sensor.read_frame().await.unwrap(), a);
    }

    #[tokio::test]
    async fn empty_looping_replay_still_errors() {
        let mut sensor = ReplaySensor::new("replay", Vec::new()).looping();
        assert!(sensor.read_frame().await.is_err());
    }
}
