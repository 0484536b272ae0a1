//! Pin assignments and launch timing for the platform.
//!
//! [`PinMap`] maps each logical role to a physical pin and is validated once
//! at startup, before the [`ActuatorController`][crate::controller::ActuatorController]
//! touches any hardware.  [`LaunchProfile`] holds the duty cycles and step
//! interval of the launch sequence.
//!
//! Defaults match the reference wiring (BCM numbering):
//!
//! | Role | Pin |
//! |---|---|
//! | `motor_a_dir1` / `motor_a_dir2` | 22 / 23 |
//! | `motor_b_dir1` / `motor_b_dir2` | 25 / 24 |
//! | `motor_a_enable` / `motor_b_enable` (PWM) | 13 / 19 |
//! | `servo` (PWM, 50 Hz) | 5 |

use std::collections::HashMap;
use std::time::Duration;

use heatseek_types::HeatError;
use serde::{Deserialize, Serialize};

use crate::gpio::{PinId, PwmChannelId};

/// Logical role → physical pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinMap {
    pub motor_a_dir1: PinId,
    pub motor_a_dir2: PinId,
    pub motor_b_dir1: PinId,
    pub motor_b_dir2: PinId,
    pub motor_a_enable: PwmChannelId,
    pub motor_b_enable: PwmChannelId,
    pub servo: PwmChannelId,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            motor_a_dir1: 22,
            motor_a_dir2: 23,
            motor_b_dir1: 25,
            motor_b_dir2: 24,
            motor_a_enable: 13,
            motor_b_enable: 19,
            servo: 5,
        }
    }
}

impl PinMap {
    /// Every role with its pin, in a fixed order.
    pub fn roles(&self) -> [(&'static str, PinId); 7] {
        [
            ("motor_a_dir1", self.motor_a_dir1),
            ("motor_a_dir2", self.motor_a_dir2),
            ("motor_b_dir1", self.motor_b_dir1),
            ("motor_b_dir2", self.motor_b_dir2),
            ("motor_a_enable", self.motor_a_enable),
            ("motor_b_enable", self.motor_b_enable),
            ("servo", self.servo),
        ]
    }

    /// The four drive-direction outputs.
    pub fn direction_pins(&self) -> [(&'static str, PinId); 4] {
        [
            ("motor_a_dir1", self.motor_a_dir1),
            ("motor_a_dir2", self.motor_a_dir2),
            ("motor_b_dir1", self.motor_b_dir1),
            ("motor_b_dir2", self.motor_b_dir2),
        ]
    }

    /// The two motor enable PWM channels.
    pub fn motor_channels(&self) -> [(&'static str, PwmChannelId); 2] {
        [
            ("motor_a_enable", self.motor_a_enable),
            ("motor_b_enable", self.motor_b_enable),
        ]
    }

    /// Reject a map that assigns the same pin to two roles.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Config`] naming both roles.
    pub fn validate(&self) -> Result<(), HeatError> {
        let mut seen: HashMap<PinId, &'static str> = HashMap::new();
        for (role, pin) in self.roles() {
            if let Some(other) = seen.insert(pin, role) {
                return Err(HeatError::Config(format!(
                    "pin {pin} assigned to both '{other}' and '{role}'"
                )));
            }
        }
        Ok(())
    }
}

/// Duty cycles and timing of the launch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchProfile {
    /// Motor enable duty while spinning (percent).
    pub motor_duty: u8,
    /// Servo duty at rest (percent of a 50 Hz period).
    pub servo_neutral_duty: f32,
    /// Servo duty when pushing a payload out.
    pub servo_deployed_duty: f32,
    /// One time unit of the sequence, in milliseconds.
    pub step_interval_ms: u64,
    /// Upper bound on a single hardware write, in milliseconds.
    pub write_timeout_ms: u64,
}

impl Default for LaunchProfile {
    fn default() -> Self {
        Self {
            motor_duty: 30,
            servo_neutral_duty: 2.5,
            servo_deployed_duty: 10.0,
            step_interval_ms: 1000,
            write_timeout_ms: 250,
        }
    }
}

impl LaunchProfile {
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// # Errors
    ///
    /// Returns [`HeatError::Config`] for out-of-range duties or zero
    /// durations.
    pub fn validate(&self) -> Result<(), HeatError> {
        if self.motor_duty > 100 {
            return Err(HeatError::Config(format!(
                "motor_duty must be 0-100, got {}",
                self.motor_duty
            )));
        }
        for (name, duty) in [
            ("servo_neutral_duty", self.servo_neutral_duty),
            ("servo_deployed_duty", self.servo_deployed_duty),
        ] {
            if !(0.0..=100.0).contains(&duty) {
                return Err(HeatError::Config(format!("{name} must be 0-100, got {duty}")));
            }
        }
        if self.step_interval_ms == 0 {
            return Err(HeatError::Config("step_interval_ms must be > 0".to_string()));
        }
        if self.write_timeout_ms == 0 {
            return Err(HeatError::Config("write_timeout_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_is_valid() {
        assert!(PinMap::default().validate().is_ok());
    }

    #[test]
    fn duplicate_pin_is_rejected() {
        let map = PinMap {
            servo: 22,
            ..PinMap::default()
        };
        let err = map.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("motor_a_dir1") && msg.contains("servo"), "{msg}");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let map: PinMap = toml::from_str("servo = 12").unwrap();
        assert_eq!(map.servo, 12);
        assert_eq!(map.motor_a_dir1, 22);
    }

    #[test]
    fn default_profile_matches_reference_timing() {
        let profile = LaunchProfile::default();
        assert_eq!(profile.motor_duty, 30);
        assert_eq!(profile.step_interval(), Duration::from_secs(1));
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn profile_rejects_bad_values() {
        let p = LaunchProfile {
            motor_duty: 101,
            ..LaunchProfile::default()
        };
        assert!(p.validate().is_err());

        let p = LaunchProfile {
            servo_deployed_duty: f32::NAN,
            ..LaunchProfile::default()
        };
        assert!(p.validate().is_err());

        let p = LaunchProfile {
            step_interval_ms: 0,
            ..LaunchProfile::default()
        };
        assert!(p.validate().is_err());
    }
}
