//! Shared vocabulary for the HeatSeek workspace: thermal frames, decisions,
//! actuator state, bus events and the workspace-wide error type.

pub mod grid;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use grid::{GRID_CELLS, GRID_SIZE, ThermalGrid};

/// Directional or launch verdict produced once per tick.
///
/// The serialised form is the wire tag consumed downstream and must not
/// change: `"ok"`, `"forward"`, `"right"`, `"left"`, `"null"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Heat source close in front: run the launch sequence.
    #[serde(rename = "ok")]
    Launch,
    /// Heat source in front but not close enough.
    #[serde(rename = "forward")]
    MoveForward,
    /// Heat source on the right-hand columns.
    #[serde(rename = "right")]
    TurnRight,
    /// Heat source on the left-hand columns.
    #[serde(rename = "left")]
    TurnLeft,
    /// Nothing warm enough anywhere.
    #[serde(rename = "null")]
    Idle,
}

impl Decision {
    /// Every decision, in classification priority order.
    pub const ALL: [Decision; 5] = [
        Decision::Launch,
        Decision::MoveForward,
        Decision::TurnRight,
        Decision::TurnLeft,
        Decision::Idle,
    ];

    /// The wire tag published for this decision.
    pub fn tag(self) -> &'static str {
        match self {
            Decision::Launch => "ok",
            Decision::MoveForward => "forward",
            Decision::TurnRight => "right",
            Decision::TurnLeft => "left",
            Decision::Idle => "null",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Decision {
    type Err = HeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decision::ALL
            .into_iter()
            .find(|d| d.tag() == s)
            .ok_or_else(|| HeatError::Serialization(format!("unknown decision tag '{s}'")))
    }
}

/// Comparison points partitioning the decision space (°C).
///
/// All comparisons are strict `>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Front-zone temperature above which the launch sequence fires.
    #[serde(default = "default_front_launch")]
    pub front_launch: f32,
    /// Front-zone temperature above which the platform should move closer.
    #[serde(default = "default_front_forward")]
    pub front_forward: f32,
    /// Side-zone temperature above which the platform should turn.
    #[serde(default = "default_side_threshold")]
    pub side_threshold: f32,
}

fn default_front_launch() -> f32 {
    33.0
}
fn default_front_forward() -> f32 {
    29.0
}
fn default_side_threshold() -> f32 {
    26.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            front_launch: default_front_launch(),
            front_forward: default_front_forward(),
            side_threshold: default_side_threshold(),
        }
    }
}

impl Thresholds {
    /// Check that every threshold is finite and that `front_launch` lies
    /// strictly above `front_forward`.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<(), HeatError> {
        for (name, value) in [
            ("front_launch", self.front_launch),
            ("front_forward", self.front_forward),
            ("side_threshold", self.side_threshold),
        ] {
            if !value.is_finite() {
                return Err(HeatError::Config(format!("{name} must be finite, got {value}")));
            }
        }
        if self.front_launch <= self.front_forward {
            return Err(HeatError::Config(format!(
                "front_launch ({}) must be greater than front_forward ({})",
                self.front_launch, self.front_forward
            )));
        }
        Ok(())
    }
}

/// Logical state of the two-motor drive system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotorState {
    #[default]
    Stopped,
    /// Both motors running at `duty` percent (0–100).
    Spinning { duty: u8 },
}

/// Physical position of the launch servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServoPosition {
    #[default]
    Neutral,
    Deployed,
}

/// Servo position plus the number of deploy cycles run in the current
/// launch sequence (0–3, reset when a new sequence starts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServoState {
    pub position: ServoPosition,
    pub cycles: u8,
}

/// Unified event wrapper for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"heatseek-runtime::control_loop"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap `payload` in a fresh event stamped with the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data routed over the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// Where the heat is; serialises as the decision's wire tag.
    HeatLocation(Decision),
    /// One full frame, 64 values row-major.
    TemperatureMap(Vec<f32>),
    /// A hardware write failed and the actuators were forced to a safe stop.
    ActuatorFault { component: String, message: String },
}

/// Workspace-wide error type.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeatError {
    #[error("Sensor Error: {0}")]
    Sensor(String),

    #[error("Actuation Fault on {component}: {details}")]
    Actuation { component: String, details: String },

    #[error("Config Error: {0}")]
    Config(String),

    #[error("Publish Error: {0}")]
    Publish(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),
}
