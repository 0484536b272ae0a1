//! [`ControlLoop`] – the periodic sense → classify → publish → actuate cycle.
//!
//! Each tick:
//!
//! 1. **Sense** – read one frame from the [`ThermalSensor`].  A failed read
//!    skips the tick: nothing is published and nothing is actuated.
//! 2. **Classify** – [`HeatClassifier::classify`] turns the frame into a
//!    [`Decision`] and the zone maxima it was derived from.
//! 3. **Publish** – the decision goes out through the [`DecisionPublisher`].
//!    Publishing is best-effort; a failure is logged and the tick continues.
//! 4. **Actuate** – [`ActuatorController::drive`].  An actuation failure has
//!    already forced the hardware to a safe stop; it is reported on
//!    [`Topic::SystemAlerts`] and returned to the caller.
//!
//! Launch-sequence steps are not part of a tick.  [`ControlLoop::advance`]
//! runs whichever step is due, and [`ControlLoop::run`] interleaves ticks and
//! steps on a single task, so sensing carries on while a launch is in flight.

use std::time::{Duration, Instant};

use heatseek_hal::{ActuatorController, DriveOutcome, LaunchPhase, ThermalSensor};
use heatseek_middleware::{DecisionPublisher, EventBus, Topic};
use heatseek_perception::{HeatClassifier, ZoneMaxima};
use heatseek_types::{Decision, Event, EventPayload, HeatError};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, trace, warn};

/// Event source stamped on everything the loop publishes itself.
pub const SOURCE: &str = "heatseek-runtime::control_loop";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`ControlLoop`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Sensing period in milliseconds.
    pub tick_interval_ms: u64,
    /// Also publish every frame on [`Topic::TemperatureMap`].
    pub publish_temperature_map: bool,
    /// Stop ticking after this many ticks (a running launch sequence is
    /// still allowed to finish).  `None` runs until shutdown.
    #[serde(skip)]
    pub max_ticks: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            publish_temperature_map: false,
            max_ticks: None,
        }
    }
}

impl LoopConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// # Errors
    ///
    /// Returns [`HeatError::Config`] if the tick interval is zero.
    pub fn validate(&self) -> Result<(), HeatError> {
        if self.tick_interval_ms == 0 {
            return Err(HeatError::Config("tick_interval_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a single [`ControlLoop::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The sensor read failed; nothing was published or actuated.
    Skipped(HeatError),
    Decided {
        decision: Decision,
        zones: ZoneMaxima,
        /// Whether the publisher accepted the decision.
        published: bool,
        drive: DriveOutcome,
    },
}

impl TickOutcome {
    pub fn decision(&self) -> Option<Decision> {
        match self {
            TickOutcome::Decided { decision, .. } => Some(*decision),
            TickOutcome::Skipped(_) => None,
        }
    }
}

/// Running counters, reported when [`ControlLoop::run`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub skipped: u64,
    pub publish_failures: u64,
    pub actuation_faults: u64,
    pub launches_started: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the sensor, classifier, publisher and actuator controller.
pub struct ControlLoop {
    config: LoopConfig,
    sensor: Box<dyn ThermalSensor>,
    classifier: HeatClassifier,
    publisher: Box<dyn DecisionPublisher>,
    controller: ActuatorController,
    bus: Option<EventBus>,
    stats: LoopStats,
}

impl ControlLoop {
    /// # Errors
    ///
    /// Returns [`HeatError::Config`] if `config` is invalid.
    pub fn new(
        config: LoopConfig,
        sensor: Box<dyn ThermalSensor>,
        classifier: HeatClassifier,
        publisher: Box<dyn DecisionPublisher>,
        controller: ActuatorController,
    ) -> Result<Self, HeatError> {
        config.validate()?;
        Ok(Self {
            config,
            sensor,
            classifier,
            publisher,
            controller,
            bus: None,
            stats: LoopStats::default(),
        })
    }

    /// Attach a bus for actuator-fault alerts and, when enabled, frame
    /// publication.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn controller(&self) -> &ActuatorController {
        &self.controller
    }

    /// Run one sense → classify → publish → actuate cycle.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Actuation`] if driving the actuators failed.  The
    /// controller has already stopped the hardware by then.
    #[instrument(skip(self, now), fields(tick = self.stats.ticks + 1))]
    pub async fn tick(&mut self, now: Instant) -> Result<TickOutcome, HeatError> {
        self.stats.ticks += 1;

        let grid = match self.sensor.read_frame().await {
            Ok(grid) => grid,
            Err(err) => {
                self.stats.skipped += 1;
                warn!(sensor = self.sensor.id(), error = %err, "sensor read failed; tick skipped");
                return Ok(TickOutcome::Skipped(err));
            }
        };
        for (r, row) in grid.rows().iter().enumerate() {
            trace!(row = r, values = ?row, "frame");
        }
        debug!(column_max = ?grid.column_max(), "column maxima");

        let (decision, zones) = self.classifier.classify(&grid);

        if self.config.publish_temperature_map
            && let Some(bus) = &self.bus
        {
            let event = Event::new(SOURCE, EventPayload::TemperatureMap(grid.flatten()));
            if let Err(err) = bus.publish_to(Topic::TemperatureMap, event) {
                warn!(error = %err, "temperature map publish failed");
            }
        }

        let published = match self.publisher.publish(decision) {
            Ok(_) => true,
            Err(err) => {
                self.stats.publish_failures += 1;
                warn!(error = %err, tag = decision.tag(), "decision publish failed");
                false
            }
        };

        let drive = match self.controller.drive(decision, now).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.raise_fault(&err);
                return Err(err);
            }
        };
        if drive == DriveOutcome::Started {
            self.stats.launches_started += 1;
        }
        info!(tag = decision.tag(), drive = ?drive, "tick");

        Ok(TickOutcome::Decided {
            decision,
            zones,
            published,
            drive,
        })
    }

    /// Run the launch-sequence step due at `now`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Actuation`] if the step failed; the sequence has
    /// been abandoned and the hardware stopped.
    pub async fn advance(&mut self, now: Instant) -> Result<Option<LaunchPhase>, HeatError> {
        match self.controller.poll(now).await {
            Ok(phase) => Ok(phase),
            Err(err) => {
                self.raise_fault(&err);
                Err(err)
            }
        }
    }

    /// Drive ticks and launch steps until `shutdown` reads `true` (or its
    /// sender is dropped), or until `max_ticks` ticks have run and no launch
    /// sequence is active.
    ///
    /// The actuators are shut down and released on every exit path.
    ///
    /// # Errors
    ///
    /// Returns the error from the final [`ActuatorController::shutdown`];
    /// per-tick failures are logged and counted, not returned.
    pub async fn run(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<LoopStats, HeatError> {
        info!(
            sensor = self.sensor.id(),
            interval_ms = self.config.tick_interval_ms,
            max_ticks = ?self.config.max_ticks,
            "control loop started"
        );
        self.drive_until_done(&mut shutdown).await;
        let released = self.controller.shutdown().await;
        info!(stats = ?self.stats, "control loop stopped");
        released.map(|()| self.stats)
    }

    async fn drive_until_done(&mut self, shutdown: &mut watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow_and_update() {
                info!("shutdown requested");
                return;
            }
            let ticking = self
                .config
                .max_ticks
                .is_none_or(|max| self.stats.ticks < max);
            if !ticking && !self.controller.is_sequence_active() {
                return;
            }
            let deadline = self.controller.next_deadline();

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("shutdown channel closed");
                        return;
                    }
                }
                _ = interval.tick(), if ticking => {
                    if let Err(err) = self.tick(clock_now()).await {
                        warn!(error = %err, "tick actuation failed; actuators stopped");
                    }
                }
                _ = sleep_until(deadline) => {
                    if let Err(err) = self.advance(clock_now()).await {
                        warn!(error = %err, "launch step failed; actuators stopped");
                    }
                }
            }
        }
    }

    fn raise_fault(&mut self, err: &HeatError) {
        self.stats.actuation_faults += 1;
        let Some(bus) = &self.bus else {
            return;
        };
        let component = match err {
            HeatError::Actuation { component, .. } => component.clone(),
            _ => "actuators".to_string(),
        };
        let event = Event::new(
            SOURCE,
            EventPayload::ActuatorFault {
                component,
                message: err.to_string(),
            },
        );
        if let Err(publish_err) = bus.publish_to(Topic::SystemAlerts, event) {
            warn!(error = %publish_err, "actuator fault alert not published");
        }
    }
}

// Tokio's clock, so paused-time tests and the controller agree on "now".
fn clock_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
