//! Coordinate and place diagnosis models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic coordinate in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude, -90 to 90
    pub latitude: f64,
    /// Longitude, -180 to 180
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting values outside the valid ranges
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Format as a short coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Administrative names attached to a coordinate by a geocoding provider
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PlaceName {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub display_name: Option<String>,
}

impl PlaceName {
    /// Field-wise merge preferring `self`, filling gaps from `other`
    #[must_use]
    pub fn or(self, other: PlaceName) -> PlaceName {
        PlaceName {
            city: self.city.or(other.city),
            state: self.state.or(other.state),
            country: self.country.or(other.country),
            display_name: self.display_name.or(other.display_name),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.state.is_none() && self.country.is_none()
    }
}

/// Derived description of a resolved location; built once, never mutated
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlaceDiagnosis {
    pub place: PlaceName,
    pub biome: String,
    pub soil: String,
    pub coordinate: Coordinate,
    /// Human-readable provenance of the coordinate and names
    pub source: String,
}

impl PlaceDiagnosis {
    /// "City, State, Country" from whatever parts are known
    #[must_use]
    pub fn place_line(&self) -> String {
        let parts: Vec<&str> = [&self.place.city, &self.place.state, &self.place.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.trim().is_empty())
            .collect();
        if parts.is_empty() {
            "unidentified place (coordinates only)".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl fmt::Display for PlaceDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🌍 Recognized location: {}", self.place_line())?;
        writeln!(f, "🗺️ Estimated biome: {}", self.biome)?;
        writeln!(f, "🧱 Probable soil type: {}", self.soil)?;
        writeln!(
            f,
            "🌐 Coordinates: {}, {}",
            self.coordinate.latitude, self.coordinate.longitude
        )?;
        write!(f, "📌 Source: {}", self.source)
    }
}
