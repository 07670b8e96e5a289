//! Plain-text summary offered for download after a planning run

use crate::AgroPlanError;
use crate::advisor::PlanOutcome;
use crate::questionnaire::FarmProfile;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

/// Suggested file name for a summary generated at `generated_at`
#[must_use]
pub fn file_name(generated_at: DateTime<Utc>) -> String {
    format!("agroforestry-plan-{}.txt", generated_at.format("%Y%m%d-%H%M%S"))
}

/// Form answers, location diagnosis and plan as one text document
#[must_use]
pub fn render(profile: &FarmProfile, outcome: &PlanOutcome, generated_at: DateTime<Utc>) -> String {
    let mut lines = vec![
        "AGROFORESTRY PLAN SUMMARY".to_string(),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
        String::new(),
        "== Site information ==".to_string(),
    ];
    lines.extend(
        profile
            .details()
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}")),
    );

    lines.push(String::new());
    lines.push("== Location diagnosis ==".to_string());
    lines.push(outcome.diagnosis.trim().to_string());

    lines.push(String::new());
    lines.push("== Agroforestry plan ==".to_string());
    lines.push(match &outcome.plan {
        Some(plan) => plan.trim().to_string(),
        None => "No plan was generated because the location could not be resolved.".to_string(),
    });

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Write a rendered summary to `path`, replacing any existing file
pub fn save(path: &Path, text: &str) -> Result<(), AgroPlanError> {
    fs::write(path, text)?;
    tracing::info!("Saved summary to {}", path.display());
    Ok(())
}
