//! Location resolution
//!
//! Turns free text or a literal "lat,lon" pair into a [`PlaceDiagnosis`]:
//! coordinates, administrative names and a coarse biome/soil estimate.
//! Outcomes are cached per raw input for the configured TTL.

pub mod biome;
pub mod error;
pub mod providers;
pub mod query;

pub use biome::{BiomeEstimate, BiomeRule, BiomeTable};
pub use error::GeocodeError;
pub use providers::GeocodeMatch;
pub use query::LocationQuery;

use crate::cache::TtlCache;
use crate::config::{AgroPlanConfig, GeocodingConfig, GeocodingProvider};
use crate::fetcher::Fetcher;
use crate::models::{Coordinate, PlaceDiagnosis, PlaceName};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Outcome of [`Geocoder::resolve`]: text for the user plus optional coordinates.
/// Both coordinates are present exactly when resolution succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub text: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Resolution {
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.coordinate().is_some()
    }
}

impl From<&Result<PlaceDiagnosis, GeocodeError>> for Resolution {
    fn from(outcome: &Result<PlaceDiagnosis, GeocodeError>) -> Self {
        match outcome {
            Ok(diagnosis) => Resolution {
                text: diagnosis.to_string(),
                latitude: Some(diagnosis.coordinate.latitude),
                longitude: Some(diagnosis.coordinate.longitude),
            },
            Err(e) => Resolution {
                text: e.user_text(),
                latitude: None,
                longitude: None,
            },
        }
    }
}

/// Geocoding client with a per-input cache
pub struct Geocoder {
    fetcher: Fetcher,
    settings: GeocodingConfig,
    biomes: BiomeTable,
    cache: TtlCache<String, Result<PlaceDiagnosis, GeocodeError>>,
}

impl Geocoder {
    #[must_use]
    pub fn new(fetcher: Fetcher, settings: GeocodingConfig, biomes: BiomeTable) -> Self {
        let ttl = Duration::from_secs(u64::from(settings.cache_ttl_hours) * 3600);
        Self {
            fetcher,
            settings,
            biomes,
            cache: TtlCache::new(ttl),
        }
    }

    /// Build a geocoder with a `reqwest` fetcher from application config
    pub fn from_config(config: &AgroPlanConfig) -> Result<Self> {
        let fetcher = Fetcher::new(&config.http)?;
        let biomes = config.biome.clone().unwrap_or_default();
        Ok(Self::new(fetcher, config.geocoding.clone(), biomes))
    }

    /// Resolve a location; failures come back as error text with no coordinates.
    pub fn resolve(&mut self, query: &str) -> Resolution {
        Resolution::from(&self.diagnose(query))
    }

    /// Resolve a location into a typed diagnosis
    #[instrument(skip(self), fields(provider = %self.settings.provider))]
    pub fn diagnose(&mut self, query: &str) -> Result<PlaceDiagnosis, GeocodeError> {
        let parsed = LocationQuery::parse(query)?;
        let key = query.trim().to_string();

        if let Some(cached) = self.cache.get(&key) {
            debug!("Serving cached resolution for '{}'", key);
            return cached;
        }

        let start_time = Instant::now();
        let outcome = self.lookup(&parsed);

        match &outcome {
            Ok(diagnosis) => info!(
                "Resolved '{}' to {} ({}) in {:.3}s",
                key,
                diagnosis.place_line(),
                diagnosis.coordinate.format_coordinates(),
                start_time.elapsed().as_secs_f64()
            ),
            Err(e) => warn!("Could not resolve '{}': {}", key, e),
        }

        // Transport failures are transient; everything else is a stable answer.
        if !matches!(outcome, Err(GeocodeError::Fetch(_))) {
            self.cache.put(key, outcome.clone());
        }
        outcome
    }

    /// Number of cached resolutions
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    fn lookup(&self, query: &LocationQuery) -> Result<PlaceDiagnosis, GeocodeError> {
        match query {
            LocationQuery::Coordinates(coordinate) => {
                debug!("Using literal coordinates {}", coordinate.format_coordinates());
                let place = self.reverse(*coordinate).unwrap_or_default();
                let source = if place.is_empty() {
                    "Coordinates as entered".to_string()
                } else {
                    format!("Coordinates as entered, named by {}", self.settings.provider)
                };
                Ok(self.build(*coordinate, place, source))
            }
            LocationQuery::Text(text) => {
                let found = self.search(text)?;
                let place = match self.reverse(found.coordinate) {
                    Some(reverse) => reverse.or(found.place),
                    None => found.place,
                };
                Ok(self.build(found.coordinate, place, self.settings.provider.to_string()))
            }
        }
    }

    fn build(&self, coordinate: Coordinate, place: PlaceName, source: String) -> PlaceDiagnosis {
        let estimate = self
            .biomes
            .classify(place.country.as_deref(), place.state.as_deref());
        PlaceDiagnosis {
            place,
            biome: estimate.biome,
            soil: estimate.soil,
            coordinate,
            source,
        }
    }

    fn search(&self, text: &str) -> Result<GeocodeMatch, GeocodeError> {
        info!("Geocoding location: '{}'", text);
        let language = self.settings.language.as_str();
        let url = self.settings.search_url.as_str();

        let found = match self.settings.provider {
            GeocodingProvider::OpenMeteo => {
                let params = [
                    ("name", text),
                    ("count", "1"),
                    ("language", language),
                    ("format", "json"),
                ];
                providers::parse_open_meteo_search(&self.fetcher.get_json(url, &params)?)?
            }
            GeocodingProvider::Nominatim => {
                let params = [
                    ("q", text),
                    ("format", "json"),
                    ("limit", "1"),
                    ("addressdetails", "1"),
                    ("accept-language", language),
                ];
                providers::parse_nominatim_search(&self.fetcher.get_json(url, &params)?)?
            }
        };

        found.ok_or_else(|| {
            warn!("No results found for location '{}'", text);
            GeocodeError::LocationNotFound(text.to_string())
        })
    }

    /// Address details for a coordinate; any failure degrades to `None`.
    fn reverse(&self, coordinate: Coordinate) -> Option<PlaceName> {
        if !self.settings.reverse_lookup || self.settings.reverse_url.is_empty() {
            return None;
        }
        if self.settings.provider != GeocodingProvider::Nominatim {
            debug!("Reverse lookup not supported by {}", self.settings.provider);
            return None;
        }

        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();
        let params = [
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("format", "json"),
            ("zoom", "10"),
            ("accept-language", self.settings.language.as_str()),
        ];

        let outcome = self
            .fetcher
            .get_json(&self.settings.reverse_url, &params)
            .map_err(GeocodeError::from)
            .and_then(|value| providers::parse_nominatim_reverse(&value));

        match outcome {
            Ok(place) => place,
            Err(e) => {
                debug!("Reverse geocoding failed: {}, keeping search result names", e);
                None
            }
        }
    }
}
