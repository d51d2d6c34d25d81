//! Observability
//!
//! Structured audit events for each run.

pub mod audit;
