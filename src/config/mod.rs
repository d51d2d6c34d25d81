//! Configuration
//!
//! Error type, result alias and run configuration.

pub mod types;
