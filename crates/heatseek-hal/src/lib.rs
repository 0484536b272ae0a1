//! `heatseek-hal` – hardware abstraction for the thermal array, drive motors
//! and launch servo.
//!
//! # Modules
//!
//! - [`gpio`] – [`GpioPort`] trait: digital outputs and PWM duty channels.
//! - [`sensor`] – [`ThermalSensor`] trait: one 8×8 frame per read.
//! - [`pins`] – [`PinMap`] (role → pin, validated once) and
//!   [`LaunchProfile`] (duties and step timing).
//! - [`controller`] – [`ActuatorController`]: exclusive owner of motor and
//!   servo state, runs the deadline-driven launch sequence.
//! - [`sim`] – in-process [`SimGpio`] and [`ReplaySensor`] for tests and the
//!   CLI.

pub mod controller;
pub mod gpio;
pub mod pins;
pub mod sensor;
pub mod sim;

pub use controller::{ActuatorController, DriveOutcome, LAUNCH_CYCLES, LaunchPhase};
pub use gpio::{GpioPort, PinId, PwmChannelId};
pub use pins::{LaunchProfile, PinMap};
pub use sensor::ThermalSensor;
pub use sim::{GpioWrite, ReplaySensor, SimGpio, SimGpioProbe};
