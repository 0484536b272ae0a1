//! `heatseek-perception` – heat localisation.
//!
//! Turns a raw 8×8 thermal frame into a discrete [`Decision`][heatseek_types::Decision].
//!
//! # Modules
//!
//! - [`classifier`] – [`HeatClassifier`][classifier::HeatClassifier] and the
//!   pure [`classify`][classifier::classify] function: column-zone maxima
//!   compared against fixed thresholds in strict priority order.

pub mod classifier;

pub use classifier::{HeatClassifier, ZoneMaxima, classify, zone_maxima};
