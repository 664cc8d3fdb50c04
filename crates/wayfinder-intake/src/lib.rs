//! # Wayfinder Intake
//!
//! Front door of the pipeline: turns a free-text trip query into either a
//! validated `TripSpec` or a clarifying question.
//!
//! This crate contains:
//! - Date guardrails: deterministic expression parsing and range checks
//! - `TripSpecDraft` and the `DraftExtractor` boundary
//! - `Intake`: the decision step that either asks or proceeds
//!
//! Extraction quality is pluggable; date correctness is not.

pub mod draft;
pub mod guardrails;
pub mod intake;

pub use draft::{DraftExtractor, QueryDraftExtractor, TripSpecDraft};
pub use guardrails::{
    parse_date_expression, parse_date_range, resolve_weekend_range, validate_date_range,
    validate_non_overlapping_legs, GuardrailError,
};
pub use intake::{ClarificationReason, ClarifyingQuestion, Intake, IntakeResult};
