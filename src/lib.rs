//! `AgroPlan` - Syntropic agroforestry planning assistant
//!
//! Resolves where a farm is, estimates its biome and soil, and asks a
//! generative model for a beginner-friendly planting plan.

pub mod advisor;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod geocoding;
pub mod models;
pub mod planner;
pub mod questionnaire;
pub mod summary;
pub mod web;

// Re-export core types for public API
pub use advisor::{Advisor, PlanOutcome};
pub use cache::TtlCache;
pub use config::AgroPlanConfig;
pub use error::AgroPlanError;
pub use fetcher::{FetchError, Fetcher, HttpTransport, RetryPolicy};
pub use geocoding::{BiomeTable, GeocodeError, Geocoder, Resolution};
pub use models::{Coordinate, PlaceDiagnosis, PlaceName};
pub use planner::{PlanError, PlanGenerator, TextModel};
pub use questionnaire::FarmProfile;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
