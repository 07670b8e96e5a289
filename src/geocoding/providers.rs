//! Response shapes of the supported geocoding APIs and their normalization

use super::GeocodeError;
use crate::fetcher::{FetchError, MALFORMED_SNIPPET_LIMIT};
use crate::models::{Coordinate, PlaceName};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// First search hit, normalized across providers
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub coordinate: Coordinate,
    pub place: PlaceName,
}

/// `OpenMeteo` geocoding structures
pub mod openmeteo {
    use super::Deserialize;

    /// Absent `results` means nothing matched
    #[derive(Debug, Deserialize)]
    pub struct GeocodingResponse {
        pub results: Option<Vec<GeocodingResult>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResult {
        pub name: String,
        pub latitude: f64,
        pub longitude: f64,
        pub country: Option<String>,
        pub admin1: Option<String>,
        pub admin2: Option<String>,
    }
}

/// `Nominatim` (OpenStreetMap) structures
pub mod nominatim {
    use super::Deserialize;

    /// Coordinates arrive as strings
    #[derive(Debug, Deserialize)]
    pub struct SearchResult {
        pub lat: String,
        pub lon: String,
        #[serde(default)]
        pub display_name: Option<String>,
        #[serde(default)]
        pub address: Option<Address>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ReverseResult {
        #[serde(default)]
        pub display_name: Option<String>,
        #[serde(default)]
        pub address: Option<Address>,
        /// Set instead of an address when nothing is found
        #[serde(default)]
        pub error: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Address {
        pub city: Option<String>,
        pub town: Option<String>,
        pub village: Option<String>,
        pub municipality: Option<String>,
        pub state: Option<String>,
        pub country: Option<String>,
    }
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, GeocodeError> {
    serde_json::from_value(value.clone()).map_err(|e| {
        tracing::error!("Unexpected geocoding payload: {}", e);
        GeocodeError::Fetch(FetchError::MalformedResponse {
            snippet: value.to_string().chars().take(MALFORMED_SNIPPET_LIMIT).collect(),
        })
    })
}

fn malformed(detail: String) -> GeocodeError {
    GeocodeError::Fetch(FetchError::MalformedResponse { snippet: detail })
}

/// First Open-Meteo search result, `None` when the result set is empty
pub fn parse_open_meteo_search(value: &Value) -> Result<Option<GeocodeMatch>, GeocodeError> {
    let response: openmeteo::GeocodingResponse = decode(value)?;
    let Some(first) = response.results.unwrap_or_default().into_iter().next() else {
        return Ok(None);
    };

    let coordinate = Coordinate::new(first.latitude, first.longitude).ok_or_else(|| {
        malformed(format!(
            "coordinates out of range: {}, {}",
            first.latitude, first.longitude
        ))
    })?;
    let display_name = [Some(first.name.clone()), first.admin2, first.admin1.clone(), first.country.clone()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Some(GeocodeMatch {
        coordinate,
        place: PlaceName {
            city: Some(first.name),
            state: first.admin1,
            country: first.country,
            display_name: Some(display_name),
        },
    }))
}

/// First Nominatim search result, `None` when the result array is empty
pub fn parse_nominatim_search(value: &Value) -> Result<Option<GeocodeMatch>, GeocodeError> {
    let results: Vec<nominatim::SearchResult> = decode(value)?;
    let Some(first) = results.into_iter().next() else {
        return Ok(None);
    };

    let latitude: f64 = first
        .lat
        .trim()
        .parse()
        .map_err(|_| malformed(format!("invalid latitude '{}'", first.lat)))?;
    let longitude: f64 = first
        .lon
        .trim()
        .parse()
        .map_err(|_| malformed(format!("invalid longitude '{}'", first.lon)))?;
    let coordinate = Coordinate::new(latitude, longitude)
        .ok_or_else(|| malformed(format!("coordinates out of range: {latitude}, {longitude}")))?;

    Ok(Some(GeocodeMatch {
        coordinate,
        place: place_from_address(first.address.unwrap_or_default(), first.display_name),
    }))
}

/// Address details of a Nominatim reverse lookup, `None` if nothing was found
pub fn parse_nominatim_reverse(value: &Value) -> Result<Option<PlaceName>, GeocodeError> {
    let result: nominatim::ReverseResult = decode(value)?;
    if let Some(error) = result.error {
        tracing::debug!("Reverse lookup found nothing: {}", error);
        return Ok(None);
    }
    let place = place_from_address(result.address.unwrap_or_default(), result.display_name);
    Ok((!place.is_empty()).then_some(place))
}

fn place_from_address(address: nominatim::Address, display_name: Option<String>) -> PlaceName {
    PlaceName {
        city: address
            .city
            .or(address.town)
            .or(address.village)
            .or(address.municipality),
        state: address.state,
        country: address.country,
        display_name,
    }
}
