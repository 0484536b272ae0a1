//! [`ActuatorController`] – owns the drive motors and the launch servo.
//!
//! The controller holds the [`GpioPort`] exclusively and is the only place
//! [`MotorState`] and [`ServoState`] change.  It turns a [`Decision`] into
//! timed hardware writes.
//!
//! # Launch sequence
//!
//! The sequence is an explicit deadline-driven state machine.  [`drive`]
//! performs the spin-up immediately and records when the next step is due;
//! the caller then calls [`poll`] whenever [`next_deadline`] has passed.  No
//! thread ever sleeps inside the controller, so sensing continues while the
//! payloads are launched.
//!
//! ```text
//! t=0   SpinningUp    direction pattern + motor duty
//! t=1   Launching(1)  servo deployed
//! t=2                 servo neutral
//! t=4   Launching(2)  servo deployed
//! t=5                 servo neutral
//! t=7   Launching(3)  servo deployed
//! t=8                 servo neutral
//! t=10  SpinningDown  direction outputs low, duty 0 → Idle
//! ```
//!
//! Time is in units of [`LaunchProfile::step_interval`].  Each hold is
//! measured from the instant its step actually ran, so a late poll delays
//! the rest of the sequence rather than shortening a hold.
//!
//! # Failure handling
//!
//! Any failed or timed-out write aborts the sequence and runs
//! [`stop_all`] before the error is returned.  Writes are never retried
//! within a call.
//!
//! [`MotorState::Stopped`] and [`ServoPosition::Neutral`] are only recorded
//! once every write of the stop succeeded, and energising steps record their
//! target state before writing.  A stop that failed part-way therefore leaves
//! the controller "not stopped", and the next `Idle` decision writes the full
//! stop again.
//!
//! [`drive`]: ActuatorController::drive
//! [`poll`]: ActuatorController::poll
//! [`next_deadline`]: ActuatorController::next_deadline
//! [`stop_all`]: ActuatorController::stop_all

use std::time::Instant;

use heatseek_types::{Decision, HeatError, MotorState, ServoPosition, ServoState};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::gpio::{GpioPort, PinId, PwmChannelId};
use crate::pins::{LaunchProfile, PinMap};

/// Servo deploy/retract cycles per launch sequence.
pub const LAUNCH_CYCLES: u8 = 3;

/// Where the launch sequence currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPhase {
    Idle,
    SpinningUp,
    /// Running deploy cycle `n` (1-based).
    Launching(u8),
    SpinningDown,
}

/// What [`ActuatorController::drive`] did with a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// A launch sequence was started.
    Started,
    /// A launch sequence is already running; the request was folded into it.
    Coalesced,
    /// Directional decision; no actuation is defined for it.
    NotifyOnly,
    /// Motors were running and have been stopped.
    Stopped,
    /// Motors were already stopped; nothing was written.
    AlreadyStopped,
    /// A launch sequence owns the hardware; the stop request was not applied.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Deploy(u8),
    Retract(u8),
    SpinDown,
}

#[derive(Debug, Clone, Copy)]
struct PendingStep {
    step: Step,
    due: Instant,
}

/// Exclusive owner of the motor and servo hardware.
pub struct ActuatorController {
    gpio: Box<dyn GpioPort>,
    pins: PinMap,
    profile: LaunchProfile,
    motor: MotorState,
    servo: ServoState,
    phase: LaunchPhase,
    pending: Option<PendingStep>,
    completed_launches: u64,
    released: bool,
}

impl ActuatorController {
    /// Validate the wiring and timing, take ownership of `gpio`, and force
    /// every output into the safe resting state.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Config`] for an invalid [`PinMap`] or
    /// [`LaunchProfile`], or [`HeatError::Actuation`] if the initial safe
    /// stop cannot be written.
    pub async fn acquire(
        gpio: Box<dyn GpioPort>,
        pins: PinMap,
        profile: LaunchProfile,
    ) -> Result<Self, HeatError> {
        pins.validate()?;
        profile.validate()?;

        let mut controller = Self {
            gpio,
            pins,
            profile,
            motor: MotorState::Stopped,
            servo: ServoState::default(),
            phase: LaunchPhase::Idle,
            pending: None,
            completed_launches: 0,
            released: false,
        };
        controller.stop_all().await?;
        info!(port = controller.gpio.id(), "actuators acquired in safe state");
        Ok(controller)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn motor_state(&self) -> MotorState {
        self.motor
    }

    pub fn servo_state(&self) -> ServoState {
        self.servo
    }

    pub fn phase(&self) -> LaunchPhase {
        self.phase
    }

    pub fn is_sequence_active(&self) -> bool {
        self.pending.is_some()
    }

    /// When the next launch-sequence step is due, if a sequence is running.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.due)
    }

    /// Number of launch sequences that ran through to spin-down.
    pub fn completed_launches(&self) -> u64 {
        self.completed_launches
    }

    // -------------------------------------------------------------------------
    // Decision dispatch
    // -------------------------------------------------------------------------

    /// Translate `decision` into actuation.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Actuation`] if a write fails; the hardware has
    /// already been forced to the safe state when this happens.
    #[instrument(skip(self, now))]
    pub async fn drive(
        &mut self,
        decision: Decision,
        now: Instant,
    ) -> Result<DriveOutcome, HeatError> {
        match decision {
            Decision::Launch => {
                if self.pending.is_some() {
                    debug!(phase = ?self.phase, "launch already in progress; coalescing");
                    return Ok(DriveOutcome::Coalesced);
                }
                let result = self.spin_up(now).await;
                self.or_abort(result).await?;
                Ok(DriveOutcome::Started)
            }
            Decision::MoveForward | Decision::TurnRight | Decision::TurnLeft => {
                Ok(DriveOutcome::NotifyOnly)
            }
            Decision::Idle => {
                if self.pending.is_some() {
                    return Ok(DriveOutcome::Deferred);
                }
                if self.is_safe() {
                    return Ok(DriveOutcome::AlreadyStopped);
                }
                // A previous stop did not fully land; write all of it again.
                self.stop_all().await?;
                Ok(DriveOutcome::Stopped)
            }
        }
    }

    /// Run the launch-sequence step that is due at `now`, if any.
    ///
    /// Returns the phase entered when a step ran, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Actuation`] if a write fails; the sequence is
    /// abandoned and the hardware forced to the safe state.
    pub async fn poll(&mut self, now: Instant) -> Result<Option<LaunchPhase>, HeatError> {
        let Some(pending) = self.pending else {
            return Ok(None);
        };
        if pending.due > now {
            return Ok(None);
        }
        let result = self.run_step(pending.step, now).await;
        self.or_abort(result).await?;
        Ok(Some(self.phase))
    }

    /// Cancel any running sequence and force motors stopped and the servo
    /// neutral.  Idempotent.
    ///
    /// Every write is attempted even if an earlier one fails; the first
    /// failure is returned and the state that failed to reach safety keeps
    /// its previous value.
    pub async fn stop_all(&mut self) -> Result<(), HeatError> {
        if self.pending.take().is_some() {
            info!(phase = ?self.phase, "launch sequence cancelled");
        }
        self.phase = LaunchPhase::Idle;

        let motors = self.stop_motors().await;
        let servo = self
            .write_pwm("servo", self.pins.servo, self.profile.servo_neutral_duty)
            .await;
        if servo.is_ok() {
            self.servo.position = ServoPosition::Neutral;
        }

        motors.and(servo)
    }

    /// Motors recorded stopped and servo recorded neutral.
    pub fn is_safe(&self) -> bool {
        self.motor == MotorState::Stopped && self.servo.position == ServoPosition::Neutral
    }

    /// Safe stop followed by releasing the port.  Further writes fail.
    pub async fn shutdown(&mut self) -> Result<(), HeatError> {
        if self.released {
            return Ok(());
        }
        let stopped = self.stop_all().await;
        let limit = self.profile.write_timeout();
        let released = match timeout(limit, self.gpio.release()).await {
            Ok(result) => result,
            Err(_) => Err(HeatError::Actuation {
                component: self.gpio.id().to_string(),
                details: format!("release timed out after {limit:?}"),
            }),
        };
        self.released = true;
        info!(port = self.gpio.id(), "actuators released");
        stopped.and(released)
    }

    // -------------------------------------------------------------------------
    // Sequence steps
    // -------------------------------------------------------------------------

    async fn spin_up(&mut self, now: Instant) -> Result<(), HeatError> {
        self.servo.cycles = 0;
        self.phase = LaunchPhase::SpinningUp;
        info!(duty = self.profile.motor_duty, "launch sequence: spinning up");

        let duty = self.profile.motor_duty;
        self.motor = MotorState::Spinning { duty };

        let pins = self.pins;
        self.write_output("motor_a_dir1", pins.motor_a_dir1, true).await?;
        self.write_output("motor_a_dir2", pins.motor_a_dir2, false).await?;
        self.write_output("motor_b_dir1", pins.motor_b_dir1, true).await?;
        self.write_output("motor_b_dir2", pins.motor_b_dir2, false).await?;

        for (role, channel) in pins.motor_channels() {
            self.write_pwm(role, channel, f32::from(duty)).await?;
        }

        self.pending = Some(PendingStep {
            step: Step::Deploy(1),
            due: now + self.profile.step_interval(),
        });
        Ok(())
    }

    async fn run_step(&mut self, step: Step, now: Instant) -> Result<(), HeatError> {
        let unit = self.profile.step_interval();
        match step {
            Step::Deploy(cycle) => {
                self.phase = LaunchPhase::Launching(cycle);
                self.servo = ServoState {
                    position: ServoPosition::Deployed,
                    cycles: cycle,
                };
                self.write_pwm("servo", self.pins.servo, self.profile.servo_deployed_duty)
                    .await?;
                info!(cycle, "launch sequence: servo deployed");
                self.pending = Some(PendingStep {
                    step: Step::Retract(cycle),
                    due: now + unit,
                });
            }
            Step::Retract(cycle) => {
                self.write_pwm("servo", self.pins.servo, self.profile.servo_neutral_duty)
                    .await?;
                self.servo.position = ServoPosition::Neutral;
                debug!(cycle, "launch sequence: servo neutral");
                let next = if cycle < LAUNCH_CYCLES {
                    Step::Deploy(cycle + 1)
                } else {
                    Step::SpinDown
                };
                // Hold neutral for one unit, then pause one more.
                self.pending = Some(PendingStep {
                    step: next,
                    due: now + unit * 2,
                });
            }
            Step::SpinDown => {
                self.phase = LaunchPhase::SpinningDown;
                self.stop_motors().await?;
                self.pending = None;
                self.phase = LaunchPhase::Idle;
                self.completed_launches += 1;
                info!(
                    cycles = self.servo.cycles,
                    total = self.completed_launches,
                    "launch sequence complete"
                );
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Hardware helpers
    // -------------------------------------------------------------------------

    // Direction outputs low, then both enable channels to 0.
    async fn stop_motors(&mut self) -> Result<(), HeatError> {
        let mut first_error = None;
        for (role, pin) in self.pins.direction_pins() {
            if let Err(e) = self.write_output(role, pin, false).await {
                first_error.get_or_insert(e);
            }
        }
        for (role, channel) in self.pins.motor_channels() {
            if let Err(e) = self.write_pwm(role, channel, 0.0).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            None => {
                self.motor = MotorState::Stopped;
                Ok(())
            }
            Some(e) => Err(e),
        }
    }

    async fn or_abort<T>(&mut self, result: Result<T, HeatError>) -> Result<T, HeatError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(error = %err, phase = ?self.phase, "actuation failed; forcing safe stop");
                if let Err(stop_err) = self.stop_all().await {
                    error!(error = %stop_err, "safe stop after actuation failure also failed");
                }
                Err(err)
            }
        }
    }

    async fn write_output(&mut self, role: &str, pin: PinId, level: bool) -> Result<(), HeatError> {
        self.ensure_held(role)?;
        let limit = self.profile.write_timeout();
        match timeout(limit, self.gpio.set_output(pin, level)).await {
            Ok(result) => result,
            Err(_) => Err(HeatError::Actuation {
                component: role.to_string(),
                details: format!("write to pin {pin} timed out after {limit:?}"),
            }),
        }
    }

    async fn write_pwm(
        &mut self,
        role: &str,
        channel: PwmChannelId,
        duty: f32,
    ) -> Result<(), HeatError> {
        self.ensure_held(role)?;
        let limit = self.profile.write_timeout();
        match timeout(limit, self.gpio.set_pwm_duty(channel, duty)).await {
            Ok(result) => result,
            Err(_) => Err(HeatError::Actuation {
                component: role.to_string(),
                details: format!("duty write to channel {channel} timed out after {limit:?}"),
            }),
        }
    }

    fn ensure_held(&self, role: &str) -> Result<(), HeatError> {
        if self.released {
            return Err(HeatError::Actuation {
                component: role.to_string(),
                details: "actuators already released".to_string(),
            });
        }
        Ok(())
    }
}
