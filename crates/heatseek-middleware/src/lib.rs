//! `heatseek-middleware` – outbound notifications.
//!
//! # Modules
//!
//! - [`bus`] – Headless, typed, topic-based publish/subscribe event bus built
//!   on Tokio broadcast channels.
//! - [`publisher`] – [`DecisionPublisher`], the seam the control loop
//!   publishes decisions through; implemented by [`EventBus`].

pub mod bus;
pub mod publisher;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use publisher::DecisionPublisher;
