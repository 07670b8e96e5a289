//! Data models for the AgroPlan application
//!
//! - Location: coordinates, provider place names and the derived diagnosis

pub mod location;

pub use location::{Coordinate, PlaceDiagnosis, PlaceName};
