//! Error types and handling for the `AgroPlan` application

use thiserror::Error;

/// Main error type for the `AgroPlan` application
#[derive(Error, Debug)]
pub enum AgroPlanError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AgroPlanError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AgroPlanError::Config { message } => {
                format!("Configuration error: {message}. Check your config file and the GEMINI_API_KEY variable.")
            }
            AgroPlanError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            AgroPlanError::Io { source } => {
                format!("File operation failed ({source}). Please check the path and its permissions.")
            }
        }
    }
}
