//! Location input parsing

use super::GeocodeError;
use crate::models::Coordinate;
use regex::Regex;
use std::sync::LazyLock;

static COORDINATE_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d{1,3}\.\d+,\s*-?\d{1,3}\.\d+$").unwrap());

/// What the user typed into the location field
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// Literal "lat,lon" pair; resolved without any network call
    Coordinates(Coordinate),
    /// Free text for the geocoding search (city, state, postal code, ...)
    Text(String),
}

impl LocationQuery {
    /// Classify raw input. Blank input and out-of-range pairs are rejected.
    pub fn parse(input: &str) -> Result<Self, GeocodeError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(GeocodeError::InvalidInput("location is empty".to_string()));
        }

        if !COORDINATE_PAIR.is_match(input) {
            return Ok(LocationQuery::Text(input.to_string()));
        }

        let (lat, lon) = input
            .split_once(',')
            .ok_or_else(|| GeocodeError::InvalidInput(format!("malformed coordinates '{input}'")))?;
        let latitude = parse_degrees(lat)?;
        let longitude = parse_degrees(lon)?;

        Coordinate::new(latitude, longitude)
            .map(LocationQuery::Coordinates)
            .ok_or_else(|| {
                GeocodeError::InvalidInput(format!(
                    "coordinates out of range (latitude -90..90, longitude -180..180): {input}"
                ))
            })
    }
}

fn parse_degrees(text: &str) -> Result<f64, GeocodeError> {
    text.trim()
        .parse::<f64>()
        .map_err(|e| GeocodeError::InvalidInput(format!("invalid coordinate '{}': {e}", text.trim())))
}
