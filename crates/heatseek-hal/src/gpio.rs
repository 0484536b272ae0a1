//! Generic `GpioPort` trait for digital outputs and PWM channels.
//!
//! Drivers implement this trait and hand it to an
//! [`ActuatorController`][crate::controller::ActuatorController], which then
//! owns it exclusively.  The controller only ever talks to the trait, so the
//! same sequencing logic runs against a real GPIO header or the in-process
//! [`SimGpio`][crate::sim::SimGpio].

use async_trait::async_trait;
use heatseek_types::HeatError;

/// Identifier of a digital output pin (BCM numbering on a Raspberry Pi).
pub type PinId = u8;

/// Identifier of a PWM channel, named by the pin it is attached to.
pub type PwmChannelId = u8;

/// Digital output and PWM hardware primitives.
///
/// Writes may block on real hardware; the controller bounds every call with
/// a timeout.
#[async_trait]
pub trait GpioPort: Send {
    /// Stable identifier for this port, e.g. `"bcm_header"`.
    fn id(&self) -> &str;

    /// Drive `pin` high (`true`) or low (`false`).
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Actuation`] if the write cannot be applied.
    async fn set_output(&mut self, pin: PinId, level: bool) -> Result<(), HeatError>;

    /// Set the duty cycle of `channel` to `duty_percent` (0–100).
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Actuation`] if the write cannot be applied.
    async fn set_pwm_duty(
        &mut self,
        channel: PwmChannelId,
        duty_percent: f32,
    ) -> Result<(), HeatError>;

    /// Stop all PWM generation and hand every pin back to the system.
    async fn release(&mut self) -> Result<(), HeatError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Minimal in-process port used only for tests.
    #[derive(Default)]
    struct MockPort {
        levels: HashMap<PinId, bool>,
        duties: HashMap<PwmChannelId, f32>,
    }

    #[async_trait]
    impl GpioPort for MockPort {
        fn id(&self) -> &str {
            "mock"
        }

        async fn set_output(&mut self, pin: PinId, level: bool) -> Result<(), HeatError> {
            self.levels.insert(pin, level);
            Ok(())
        }

        async fn set_pwm_duty(
            &mut self,
            channel: PwmChannelId,
            duty_percent: f32,
        ) -> Result<(), HeatError> {
            if !(0.0..=100.0).contains(&duty_percent) {
                return Err(HeatError::Actuation {
                    component: format!("pwm{channel}"),
                    details: format!("duty {duty_percent} out of range"),
                });
            }
            self.duties.insert(channel, duty_percent);
            Ok(())
        }

        async fn release(&mut self) -> Result<(), HeatError> {
            self.levels.clear();
            self.duties.clear();
            Ok(())
        }
    }

    #[tokio::test]
    async fn mock_port_records_writes() {
        let mut port = MockPort::default();
        assert_eq!(port.id(), "mock");

        port.set_output(22, true).await.unwrap();
        port.set_pwm_duty(13, 30.0).await.unwrap();
        assert_eq!(port.levels.get(&22), Some(&true));
        assert_eq!(port.duties.get(&13), Some(&30.0));

        assert!(port.set_pwm_duty(13, 120.0).await.is_err());

        port.release().await.unwrap();
        assert!(port.levels.is_empty());
    }
}
