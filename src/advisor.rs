//! Questionnaire to plan pipeline: resolve the location, then ask the model.

use crate::AgroPlanError;
use crate::config::AgroPlanConfig;
use crate::geocoding::{Geocoder, Resolution};
use crate::planner::PlanGenerator;
use crate::questionnaire::FarmProfile;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// What one planning run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    /// Location diagnosis or geocoding error text
    pub diagnosis: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Absent when the location could not be resolved
    pub plan: Option<String>,
}

impl PlanOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.plan.is_some()
    }
}

pub struct Advisor {
    geocoder: Geocoder,
    planner: PlanGenerator,
}

impl Advisor {
    pub fn new(geocoder: Geocoder, planner: PlanGenerator) -> Self {
        Self { geocoder, planner }
    }

    /// Wire up the real geocoder and model; fails fast without an API key.
    pub fn from_config(config: &AgroPlanConfig) -> Result<Self> {
        let planner = PlanGenerator::from_config(config)?;
        let geocoder = Geocoder::from_config(config)?;
        Ok(Self::new(geocoder, planner))
    }

    /// Location diagnosis only
    pub fn locate(&mut self, location: &str) -> Resolution {
        self.geocoder.resolve(location)
    }

    /// Full run. The model is only consulted once the location resolved.
    #[instrument(skip(self, profile), fields(location = %profile.location.trim()))]
    pub fn run(&mut self, profile: &FarmProfile) -> std::result::Result<PlanOutcome, AgroPlanError> {
        profile.validate()?;

        let resolution = self.geocoder.resolve(&profile.location);
        if !resolution.is_resolved() {
            warn!("Location not resolved; skipping plan generation");
            return Ok(PlanOutcome {
                diagnosis: resolution.text,
                latitude: None,
                longitude: None,
                plan: None,
            });
        }

        let plan = self.planner.generate(
            &profile.question(),
            resolution.latitude,
            resolution.longitude,
        );
        info!("Planning run finished");

        Ok(PlanOutcome {
            diagnosis: resolution.text,
            latitude: resolution.latitude,
            longitude: resolution.longitude,
            plan: Some(plan),
        })
    }
}
