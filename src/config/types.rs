/// Core types shared across the amoeba crate
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// How the loop count is reported on stdout
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputFormat {
    /// A single integer followed by a newline
    #[default]
    #[serde(rename = "count")]
    Count,
    /// The full trace report as one JSON document
    #[serde(rename = "json")]
    Json,
}

/// Run configuration for one `count` invocation
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Grid source; stdin when absent
    pub input: Option<PathBuf>,
    /// Arm the syscall filter after the grid is loaded
    pub sandbox: bool,
    /// Stdout format
    #[serde(default)]
    pub output: OutputFormat,
}

impl RunConfig {
    /// Where the grid is read from, for logs and audit events
    pub fn input_label(&self) -> String {
        match &self.input {
            Some(path) => path.display().to_string(),
            None => "<stdin>".to_string(),
        }
    }
}

/// Custom error types for amoeba
#[derive(Error, Debug)]
pub enum AmoebaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Grid shape mismatch: expected {expected} cells, got {actual}")]
    GridShape { expected: usize, actual: usize },

    #[error("Seccomp error: {0}")]
    Seccomp(String),

    #[error("Unsupported platform: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AmoebaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_config() {
        let config = RunConfig::default();
        assert!(config.input.is_none());
        assert!(!config.sandbox);
        assert_eq!(config.output, OutputFormat::Count);
        assert_eq!(config.input_label(), "<stdin>");
    }

    #[test]
    fn test_run_config_deserializes_with_defaults() {
        let config: RunConfig =
            serde_json::from_str(r#"{"input": "grid.txt", "sandbox": true}"#).unwrap();
        assert_eq!(config.input_label(), "grid.txt");
        assert!(config.sandbox);
        assert_eq!(config.output, OutputFormat::Count);
    }

    #[test]
    fn test_error_display() {
        let err = AmoebaError::GridShape {
            expected: 6,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "Grid shape mismatch: expected 6 cells, got 5"
        );
        assert_eq!(
            AmoebaError::Input("missing header".to_string()).to_string(),
            "Input error: missing header"
        );
    }
}
