//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! | Topic | Channel name | Typical traffic |
//! |---|---|---|
//! | [`Topic::HeatLocation`] | `/heat_location` | One decision tag per tick |
//! | [`Topic::TemperatureMap`] | `/temperature_map` | Full 64-value frames (optional) |
//! | [`Topic::SystemAlerts`] | `/system_alerts` | Actuator faults and forced stops |

use heatseek_types::{Event, HeatError};
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Per-tick [`Decision`][heatseek_types::Decision] notifications.
    HeatLocation,
    /// Raw frames for visualisation.
    TemperatureMap,
    /// Faults that forced the actuators into a safe stop.
    SystemAlerts,
}

impl Topic {
    /// Channel name as seen by external consumers.
    pub fn name(self) -> &'static str {
        match self {
            Topic::HeatLocation => "/heat_location",
            Topic::TemperatureMap => "/temperature_map",
            Topic::SystemAlerts => "/system_alerts",
        }
    }
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    heat_location: broadcast::Sender<Event>,
    temperature_map: broadcast::Sender<Event>,
    system_alerts: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Config`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, HeatError> {
        if capacity == 0 {
            return Err(HeatError::Config("event bus capacity must be > 0".to_string()));
        }
        let (heat_location, _) = broadcast::channel(capacity);
        let (temperature_map, _) = broadcast::channel(capacity);
        let (system_alerts, _) = broadcast::channel(capacity);
        Ok(Self {
            heat_location,
            temperature_map,
            system_alerts,
        })
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event.
    /// Returns `Ok(0)` when no subscribers are currently listening on the
    /// topic; the event is dropped.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, HeatError> {
        match self.topic_sender(topic).send(event) {
            Ok(n) => Ok(n),
            Err(broadcast::error::SendError(_)) => {
                trace!(topic = topic.name(), "no subscribers; event dropped");
                Ok(0)
            }
        }
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::HeatLocation => &self.heat_location,
            Topic::TemperatureMap => &self.temperature_map,
            Topic::SystemAlerts => &self.system_alerts,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        let (heat_location, _) = broadcast::channel(DEFAULT_CAPACITY);
        let (temperature_map, _) = broadcast::channel(DEFAULT_CAPACITY);
        let (system_alerts, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self {
            heat_location,
            temperature_map,
            system_alerts,
        }
    }
}

// ---------------------------------------------------------------------------
// Topic-based receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Like [`recv`](Self::recv) but skips over lag, logging how many events
    /// were lost.  Returns `None` once the bus is closed.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = self.topic.name(), lagged_by = n, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive; `None` if nothing is queued.
    pub fn try_next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = self.topic.name(), lagged_by = n, "subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatseek_types::{Decision, EventPayload};

    fn make_event(decision: Decision) -> Event {
        Event::new("heatseek-middleware::test", EventPayload::HeatLocation(decision))
    }

    #[tokio::test]
    async fn topic_multiple_subscribers_receive_same_event()
    -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut sub1 = bus.subscribe_to(Topic::HeatLocation);
        let mut sub2 = bus.subscribe_to(Topic::HeatLocation);

        let event = make_event(Decision::Launch);
        assert_eq!(bus.publish_to(Topic::HeatLocation, event.clone())?, 2);

        assert_eq!(sub1.recv().await?.id, event.id);
        assert_eq!(sub2.recv().await?.id, event.id);
        Ok(())
    }

    /// A subscriber on `SystemAlerts` must not receive events published to
    /// `HeatLocation`.
    #[tokio::test]
    async fn topic_subscriber_does_not_receive_other_topic_events()
    -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut alerts = bus.subscribe_to(Topic::SystemAlerts);
        let _heat = bus.subscribe_to(Topic::HeatLocation);

        bus.publish_to(Topic::HeatLocation, make_event(Decision::TurnLeft))?;

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), alerts.recv()).await;
        assert!(result.is_err(), "SystemAlerts subscriber must not see HeatLocation");
        assert_eq!(alerts.topic(), Topic::SystemAlerts);
        Ok(())
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(Topic::HeatLocation), 0);
        let delivered = bus
            .publish_to(Topic::HeatLocation, make_event(Decision::Idle))
            .unwrap();
        assert_eq!(delivered, 0);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(EventBus::new(0), Err(HeatError::Config(_))));
    }

    #[tokio::test]
    async fn slow_subscriber_lags_then_recovers() {
        let bus = EventBus::new(4).unwrap();
        let mut slow = bus.subscribe_to(Topic::HeatLocation);

        for _ in 0..20 {
            bus.publish_to(Topic::HeatLocation, make_event(Decision::MoveForward))
                .unwrap();
        }

        let result = slow.recv().await;
        assert!(
            matches!(result, Err(broadcast::error::RecvError::Lagged(_))),
            "expected Lagged error, got: {result:?}"
        );
        // The buffered tail is still readable.
        assert!(slow.next().await.is_some());
    }

    #[test]
    fn try_next_on_empty_topic_is_none() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe_to(Topic::TemperatureMap);
        assert!(sub.try_next().is_none());
        let map = Event::new("t", EventPayload::TemperatureMap(vec![20.0; 64]));
        bus.publish_to(Topic::TemperatureMap, map).unwrap();
        assert!(sub.try_next().is_some());
    }

    #[test]
    fn topic_names_are_stable() {
        assert_eq!(Topic::HeatLocation.name(), "/heat_location");
    }
}
