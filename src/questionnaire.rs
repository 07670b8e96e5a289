//! Farm questionnaire filled in by the user before planning

use crate::AgroPlanError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed planning question every plan starts from
pub const BASE_QUESTION: &str = "How do I start a syntropic agroforestry system following \
     Ernst Götsch in my region, considering climate, soil and available area?";

pub const MIN_WEEKLY_HOURS: u8 = 1;
pub const MAX_WEEKLY_HOURS: u8 = 40;
pub const DEFAULT_WEEKLY_HOURS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Terrain {
    #[default]
    Flat,
    Sloped,
    Irregular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Light {
    #[default]
    FullSun,
    Shade,
    Mixed,
}

/// Main purpose of the agroforest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Goal {
    #[default]
    Food,
    Commercial,
    Restoration,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SpeciesType {
    Fruit,
    Legume,
    Timber,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SpeciesOrigin {
    #[default]
    Native,
    Exotic,
    Mixed,
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Terrain::Flat => "Flat",
            Terrain::Sloped => "Sloped",
            Terrain::Irregular => "Irregular",
        })
    }
}

impl fmt::Display for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Light::FullSun => "Full sun",
            Light::Shade => "Shade",
            Light::Mixed => "Mixed",
        })
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Goal::Food => "Food",
            Goal::Commercial => "Commercial",
            Goal::Restoration => "Restoration",
            Goal::Other => "Other",
        })
    }
}

impl fmt::Display for SpeciesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpeciesType::Fruit => "Fruit trees",
            SpeciesType::Legume => "Legumes",
            SpeciesType::Timber => "Timber",
            SpeciesType::All => "All",
        })
    }
}

impl fmt::Display for SpeciesOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpeciesOrigin::Native => "Native",
            SpeciesOrigin::Exotic => "Exotic",
            SpeciesOrigin::Mixed => "Mixed",
        })
    }
}

fn default_weekly_hours() -> u8 {
    DEFAULT_WEEKLY_HOURS
}

/// Answers describing the site and the grower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmProfile {
    /// "City, State", postal code or "lat, lon"
    pub location: String,
    /// Free text such as "2 ha" or "500 m²"
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub terrain: Terrain,
    #[serde(default)]
    pub light: Light,
    #[serde(default)]
    pub goal: Goal,
    #[serde(default = "default_weekly_hours")]
    pub weekly_hours: u8,
    #[serde(default)]
    pub species_types: Vec<SpeciesType>,
    #[serde(default)]
    pub species_origin: SpeciesOrigin,
    /// What already grows on the site, if anything
    #[serde(default)]
    pub existing_planting: String,
}

impl FarmProfile {
    /// Profile with default answers for everything but the location
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            area: String::new(),
            terrain: Terrain::default(),
            light: Light::default(),
            goal: Goal::default(),
            weekly_hours: DEFAULT_WEEKLY_HOURS,
            species_types: Vec::new(),
            species_origin: SpeciesOrigin::default(),
            existing_planting: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), AgroPlanError> {
        if self.location.trim().is_empty() {
            return Err(AgroPlanError::validation("location is required"));
        }
        if !(MIN_WEEKLY_HOURS..=MAX_WEEKLY_HOURS).contains(&self.weekly_hours) {
            return Err(AgroPlanError::validation(format!(
                "weekly hours must be between {MIN_WEEKLY_HOURS} and {MAX_WEEKLY_HOURS}, got {}",
                self.weekly_hours
            )));
        }
        Ok(())
    }

    /// Labelled answers in form order, with readable placeholders for blanks
    #[must_use]
    pub fn details(&self) -> Vec<(&'static str, String)> {
        let species = if self.species_types.is_empty() {
            "No preference".to_string()
        } else {
            self.species_types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        vec![
            ("Location", self.location.trim().to_string()),
            ("Area", or_placeholder(&self.area, "not informed")),
            ("Terrain", self.terrain.to_string()),
            ("Light", self.light.to_string()),
            ("Goal", self.goal.to_string()),
            ("Weekly hours available", self.weekly_hours.to_string()),
            ("Desired species", species),
            ("Species origin", self.species_origin.to_string()),
            (
                "Existing planting",
                or_placeholder(&self.existing_planting, "nothing planted yet"),
            ),
        ]
    }

    /// Planning question: the fixed question followed by the site answers.
    /// The location is left out; the prompt carries resolved coordinates instead.
    #[must_use]
    pub fn question(&self) -> String {
        let mut question = String::from(BASE_QUESTION);
        question.push_str("\nSite details:");
        for (label, value) in self.details().into_iter().skip(1) {
            question.push_str(&format!("\n- {label}: {value}"));
        }
        question
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> FarmProfile {
        FarmProfile {
            area: "2 ha".into(),
            terrain: Terrain::Sloped,
            light: Light::Mixed,
            goal: Goal::Restoration,
            weekly_hours: 12,
            species_types: vec![SpeciesType::Fruit, SpeciesType::Legume],
            species_origin: SpeciesOrigin::Native,
            existing_planting: "old pasture".into(),
            ..FarmProfile::new("Chapecó, SC")
        }
    }

    #[rstest]
    #[case(1, true)]
    #[case(40, true)]
    #[case(0, false)]
    #[case(41, false)]
    fn test_weekly_hours_range(#[case] hours: u8, #[case] ok: bool) {
        let profile = FarmProfile {
            weekly_hours: hours,
            ..sample()
        };
        assert_eq!(profile.validate().is_ok(), ok);
    }

    #[test]
    fn test_location_required() {
        let profile = FarmProfile::new("   ");
        assert!(matches!(
            profile.validate(),
            Err(AgroPlanError::Validation { .. })
        ));
    }

    #[test]
    fn test_question_contains_details() {
        let question = sample().question();
        assert!(question.starts_with(BASE_QUESTION));
        assert!(question.contains("- Terrain: Sloped"));
        assert!(question.contains("- Desired species: Fruit trees, Legumes"));
        assert!(question.contains("- Existing planting: old pasture"));
        assert!(!question.contains("Chapecó"));
    }

    #[test]
    fn test_blank_answers_get_placeholders() {
        let details = FarmProfile::new("Lisbon").details();
        assert!(details.contains(&("Area", "not informed".to_string())));
        assert!(details.contains(&("Desired species", "No preference".to_string())));
        assert!(details.contains(&("Existing planting", "nothing planted yet".to_string())));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let profile: FarmProfile = serde_json::from_str(
            r#"{"location": "-27.5954, -48.5480", "light": "full-sun", "species_types": ["timber"]}"#,
        )
        .unwrap();
        assert_eq!(profile.weekly_hours, DEFAULT_WEEKLY_HOURS);
        assert_eq!(profile.light, Light::FullSun);
        assert_eq!(profile.species_types, vec![SpeciesType::Timber]);
        assert!(profile.validate().is_ok());
    }
}
