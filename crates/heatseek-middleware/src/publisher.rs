//! [`DecisionPublisher`] – the single outbound notification channel.
//!
//! The control loop only knows this trait.  [`EventBus`] implements it by
//! publishing [`EventPayload::HeatLocation`] on [`Topic::HeatLocation`], where
//! the decision serialises as its wire tag (`"ok"`, `"forward"`, ...).

use heatseek_types::{Decision, Event, EventPayload, HeatError};
use tracing::debug;

use crate::bus::{EventBus, Topic};

/// Event source stamped on every heat-location notification.
pub const SOURCE: &str = "heatseek-middleware::publisher";

/// Best-effort, fire-and-forget decision notifications.
pub trait DecisionPublisher: Send {
    /// Publish one decision.
    ///
    /// Returns the number of consumers that received it.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Publish`] if the channel cannot accept it.
    fn publish(&self, decision: Decision) -> Result<usize, HeatError>;
}

impl DecisionPublisher for EventBus {
    fn publish(&self, decision: Decision) -> Result<usize, HeatError> {
        let delivered = self.publish_to(
            Topic::HeatLocation,
            Event::new(SOURCE, EventPayload::HeatLocation(decision)),
        )?;
        debug!(tag = decision.tag(), delivered, "heat location published");
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bus_publishes_wire_tag_on_heat_location() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe_to(Topic::HeatLocation);

        assert_eq!(DecisionPublisher::publish(&bus, Decision::TurnRight).unwrap(), 1);

        let event = sub.recv().await.unwrap();
        assert_eq!(event.source, SOURCE);
        let json = serde_json::to_value(&event.payload).unwrap();
        assert_eq!(json, serde_json::json!({ "HeatLocation": "right" }));
    }

    #[test]
    fn publish_with_no_listener_succeeds() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(Decision::Idle).unwrap(), 0);
    }
}
