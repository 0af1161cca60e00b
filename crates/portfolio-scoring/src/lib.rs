//! Rubric-based achievement-level evaluation for teacher portfolios.
//!
//! Submitted portfolio evidence is checked condition by condition against the
//! four-tier rubric of each indicator, the achieved level is always recomputed
//! from the verified conditions, and indicator scores are aggregated into
//! module and portfolio scores.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod import;
pub mod oracle;
pub mod portfolio;
pub mod rubric;
pub mod telemetry;
