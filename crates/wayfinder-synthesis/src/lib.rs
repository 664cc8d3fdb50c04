//! # Wayfinder Synthesis
//!
//! Deterministic itinerary assembly from the executor's validated
//! results.
//!
//! This crate contains:
//!
//! - The [`Synthesizer`], turning a trip spec plus result map into a
//!   day-by-day [`ItineraryPlan`]
//! - The EN/IT message catalog every user-facing string comes from
//! - Plain-text renderers for the itinerary and for executor
//!   escalations
//!
//! Synthesis never calls tools and never fails: missing specialist
//! data degrades to catalog fallbacks plus a warning.

pub mod catalog;
pub mod itinerary;
pub mod render;
pub mod synthesizer;

pub use catalog::Language;
pub use itinerary::{DayPlan, ItineraryActivity, ItineraryPlan, Period, RainRisk};
pub use render::{render_clarification, render_day_by_day};
pub use synthesizer::Synthesizer;
