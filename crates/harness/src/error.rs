// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for harness operations
//!
//! Only run-level failures live here. Per-trial provider failures never leave
//! the trial executor; they become `ERROR` trial records instead.

use thiserror::Error;

/// Result type alias for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Run-level error types
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Missing or invalid dataset, prompt set, model set or run options
    #[error("Setup error: {message}")]
    Setup { message: String },

    /// Writing the result file failed
    #[error("Failed to persist results to {path}: {message}")]
    Persistence { path: String, message: String },

    /// Invalid data in an input file
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// I/O error (file operations)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {message}")]
    Json { message: String },

    /// YAML parsing error
    #[error("YAML error: {message}")]
    Yaml { message: String },

    /// CSV reading/writing error
    #[error("CSV error: {message}")]
    Csv { message: String },
}

impl HarnessError {
    /// Create a setup error
    pub fn setup<T: ToString>(message: T) -> Self {
        Self::Setup {
            message: message.to_string(),
        }
    }

    /// Create a persistence error
    pub fn persistence<P: ToString, T: ToString>(path: P, message: T) -> Self {
        Self::Persistence {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a validation error
    pub fn validation<T: ToString>(message: T) -> Self {
        Self::Validation {
            message: message.to_string(),
        }
    }

    /// Create an I/O error
    pub fn io<T: ToString>(message: T) -> Self {
        Self::Io {
            message: message.to_string(),
        }
    }

    /// Create a JSON error
    pub fn json<T: ToString>(message: T) -> Self {
        Self::Json {
            message: message.to_string(),
        }
    }

    /// Create a YAML error
    pub fn yaml<T: ToString>(message: T) -> Self {
        Self::Yaml {
            message: message.to_string(),
        }
    }

    /// Create a CSV error
    pub fn csv<T: ToString>(message: T) -> Self {
        Self::Csv {
            message: message.to_string(),
        }
    }

    /// Check if this error must abort a run before any trial starts
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            HarnessError::Setup { .. }
                | HarnessError::Validation { .. }
                | HarnessError::Json { .. }
                | HarnessError::Yaml { .. }
        )
    }

    /// Check if this error came from writing the result file
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, HarnessError::Persistence { .. })
    }
}

/// Convert from JSON errors
impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

/// Convert from YAML errors
impl From<serde_yaml::Error> for HarnessError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

/// Convert from I/O errors
impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Convert from CSV errors, keeping the line number when known
impl From<csv::Error> for HarnessError {
    fn from(err: csv::Error) -> Self {
        let message = match err.position() {
            Some(position) => format!("line {}: {}", position.line(), err),
            None => err.to_string(),
        };
        Self::Csv { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_constructors() {
        let setup = HarnessError::setup("dataset is empty");
        assert!(matches!(setup, HarnessError::Setup { .. }));
        assert!(setup.is_setup_error());
        assert!(!setup.is_persistence_error());

        let persistence = HarnessError::persistence("/tmp/out.csv", "disk full");
        assert!(persistence.is_persistence_error());
        assert!(!persistence.is_setup_error());
    }

    #[test]
    fn error_display() {
        let error = HarnessError::persistence("results.csv", "permission denied");
        let display = error.to_string();
        assert!(display.contains("results.csv"));
        assert!(display.contains("permission denied"));

        let error = HarnessError::setup("no models configured");
        assert_eq!(error.to_string(), "Setup error: no models configured");
    }

    #[test]
    fn json_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: HarnessError = json_error.into();
        assert!(matches!(error, HarnessError::Json { .. }));
        assert!(error.is_setup_error());
    }
}
