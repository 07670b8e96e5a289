//! Plan generation error types

use thiserror::Error;

/// Returned instead of an empty string when the model produces no text
pub const EMPTY_RESPONSE_MESSAGE: &str =
    "⚠️ The model returned an empty response. Please try again in a moment.";

/// Errors that can occur while asking the model for a plan
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Network fault, rate limit or server-side outage
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model returned an empty response")]
    EmptyCompletion,

    /// Rejected request, blocked prompt or unreadable answer
    #[error("Generation failed: {0}")]
    GenerationFailure(String),
}

impl PlanError {
    /// Short inline failure notice for the user
    #[must_use]
    pub fn user_text(&self) -> String {
        match self {
            PlanError::ModelUnavailable(message) => {
                format!("❌ The planning model is unavailable right now: {message}")
            }
            PlanError::EmptyCompletion => EMPTY_RESPONSE_MESSAGE.to_string(),
            PlanError::GenerationFailure(message) => {
                format!("❌ Failed to generate the plan: {message}")
            }
        }
    }
}
