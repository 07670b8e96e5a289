use crate::fetcher::FetchError;
use thiserror::Error;

/// Failures of location resolution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("Location not recognized: '{0}'")]
    LocationNotFound(String),

    #[error("Invalid location: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl GeocodeError {
    /// Short inline failure notice for the user
    #[must_use]
    pub fn user_text(&self) -> String {
        match self {
            GeocodeError::LocationNotFound(_) => {
                "❌ Location not recognized. Try \"City, State\", a postal code, or \"lat, lon\" coordinates."
                    .to_string()
            }
            GeocodeError::InvalidInput(message) => format!("❌ Invalid location: {message}"),
            GeocodeError::Fetch(e) => format!("❌ Could not reach the geocoding service: {e}"),
        }
    }
}
