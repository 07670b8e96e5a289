//! Coarse biome and soil estimates from administrative region names.
//!
//! This is a lookup table, not measured data. The first rule whose country
//! and region lists match wins; a rule without regions covers the whole
//! country. Tables can be replaced from configuration.

use crate::AgroPlanError;
use serde::{Deserialize, Serialize};

/// One row of the lookup table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiomeRule {
    /// Country names or aliases this rule applies to
    pub countries: Vec<String>,
    /// Region (state/province) names or abbreviations; empty matches any region
    #[serde(default)]
    pub regions: Vec<String>,
    pub biome: String,
    pub soil: String,
}

/// Ordered rule set with a catch-all estimate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiomeTable {
    pub rules: Vec<BiomeRule>,
    pub fallback_biome: String,
    pub fallback_soil: String,
}

/// Result of a classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiomeEstimate {
    pub biome: String,
    pub soil: String,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

impl Default for BiomeTable {
    fn default() -> Self {
        let brazil = ["brazil", "brasil"];
        Self {
            rules: vec![
                BiomeRule {
                    countries: strings(&brazil),
                    regions: strings(&[
                        "santa catarina",
                        "parana",
                        "rio grande do sul",
                        "sc",
                        "pr",
                        "rs",
                    ]),
                    biome: "Atlantic Forest (estimated)".to_string(),
                    soil: "Subtropical soil of medium texture (estimated)".to_string(),
                },
                BiomeRule {
                    countries: strings(&brazil),
                    regions: Vec::new(),
                    biome: "Brazilian biome (estimated)".to_string(),
                    soil: "Tropical or subtropical soil of medium texture (estimated)".to_string(),
                },
            ],
            fallback_biome: "Vegetation estimated by latitude".to_string(),
            fallback_soil: "Generic soil profile (estimated)".to_string(),
        }
    }
}

impl BiomeTable {
    /// Estimate biome and soil for a country/region pair
    #[must_use]
    pub fn classify(&self, country: Option<&str>, region: Option<&str>) -> BiomeEstimate {
        let country = country.map(normalize).unwrap_or_default();
        let region = region.map(normalize).unwrap_or_default();

        let matched = self.rules.iter().find(|rule| {
            let country_matches = rule.countries.iter().any(|c| normalize(c) == country);
            let region_matches =
                rule.regions.is_empty() || rule.regions.iter().any(|r| normalize(r) == region);
            country_matches && region_matches
        });

        match matched {
            Some(rule) => BiomeEstimate {
                biome: rule.biome.clone(),
                soil: rule.soil.clone(),
            },
            None => BiomeEstimate {
                biome: self.fallback_biome.clone(),
                soil: self.fallback_soil.clone(),
            },
        }
    }

    /// Reject tables with unusable rows
    pub fn validate(&self) -> Result<(), AgroPlanError> {
        if self.fallback_biome.trim().is_empty() || self.fallback_soil.trim().is_empty() {
            return Err(AgroPlanError::config("Biome table fallback labels cannot be empty"));
        }
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.countries.is_empty() {
                return Err(AgroPlanError::config(format!(
                    "Biome rule #{} must name at least one country",
                    index + 1
                )));
            }
            if rule.biome.trim().is_empty() || rule.soil.trim().is_empty() {
                return Err(AgroPlanError::config(format!(
                    "Biome rule #{} needs both a biome and a soil label",
                    index + 1
                )));
            }
        }
        Ok(())
    }
}

/// Lowercase, strip common Portuguese/Spanish diacritics, collapse spaces
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
