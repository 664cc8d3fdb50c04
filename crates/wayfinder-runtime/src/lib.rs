//! # Wayfinder Runtime
//!
//! Binds the engine crates into a runnable pipeline.
//!
//! This crate contains:
//! - [`Pipeline`]: query in, report out, with stores shared across runs
//! - [`TracingObserver`]: executor progress as tracing events
//! - [`init_tracing`]: process-level subscriber setup

pub mod bootstrap;
pub mod observer;
pub mod pipeline;

pub use bootstrap::init_tracing;
pub use observer::TracingObserver;
pub use pipeline::{Pipeline, PipelineError, PipelineReport, RunOptions};
