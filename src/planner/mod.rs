//! Agroforestry plan generation
//!
//! Builds the five-section planning prompt and sends it to a [`TextModel`].
//! The hosted implementation is [`GeminiClient`]; tests substitute their own.

pub mod error;
pub mod gemini;

pub use error::{EMPTY_RESPONSE_MESSAGE, PlanError};
pub use gemini::GeminiClient;

use crate::AgroPlanError;
use crate::config::AgroPlanConfig;
use tracing::{info, instrument, warn};

/// Placeholder used in the prompt when the location could not be resolved
pub const COORDINATES_UNAVAILABLE: &str = "coordinates unavailable";

/// Section headings the model is asked to produce, in order
pub const PLAN_SECTIONS: [&str; 5] = [
    "Site diagnosis",
    "Recommended species",
    "Planting strategy",
    "Schedule (including pruning and management)",
    "Initial care",
];

/// A text-generation backend
pub trait TextModel: Send {
    /// Model identifier for logs
    fn name(&self) -> &str;

    /// Raw completion for a single prompt
    fn complete(&self, prompt: &str) -> Result<String, PlanError>;
}

/// Turns a planning question and a location into a written plan
pub struct PlanGenerator {
    model: Box<dyn TextModel>,
}

impl PlanGenerator {
    pub fn new(model: Box<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Hosted model from configuration; fails without an API key.
    pub fn from_config(config: &AgroPlanConfig) -> Result<Self, AgroPlanError> {
        let client = GeminiClient::from_config(&config.model)?;
        Ok(Self::new(Box::new(client)))
    }

    /// Plan text, or a user-facing failure notice in its place
    pub fn generate(&self, question: &str, latitude: Option<f64>, longitude: Option<f64>) -> String {
        match self.try_generate(question, latitude, longitude) {
            Ok(plan) => plan,
            Err(e) => e.user_text(),
        }
    }

    /// Trimmed plan text; whitespace-only output is [`PlanError::EmptyCompletion`]
    #[instrument(skip(self, question), fields(model = %self.model.name()))]
    pub fn try_generate(
        &self,
        question: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<String, PlanError> {
        let prompt = build_prompt(question, latitude, longitude);
        let completion = self.model.complete(&prompt).inspect_err(|e| {
            warn!("Plan generation failed: {}", e);
        })?;

        let plan = completion.trim();
        if plan.is_empty() {
            warn!("Model returned an empty completion");
            return Err(PlanError::EmptyCompletion);
        }

        info!("Generated plan with {} characters", plan.len());
        Ok(plan.to_string())
    }
}

/// Planning prompt; both coordinates must be present to be included.
#[must_use]
pub fn build_prompt(question: &str, latitude: Option<f64>, longitude: Option<f64>) -> String {
    let location = match (latitude, longitude) {
        (Some(lat), Some(lon)) => format!("lat {lat}, lon {lon}"),
        _ => COORDINATES_UNAVAILABLE.to_string(),
    };

    let sections = PLAN_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. {title}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "I am developing a syntropic agroforestry plan following Ernst Götsch's principles.\n\
         Approximate location: {location}\n\
         Question: {question}\n\n\
         Write a didactic plan divided into:\n\
         {sections}\n\n\
         Use clear, plain language suitable for beginners."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::API_KEY_ENV_VAR;
    use std::sync::{Arc, Mutex};

    /// Replays a fixed answer and keeps every prompt it receives
    struct MockModel {
        answer: Result<String, PlanError>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl MockModel {
        fn answering(answer: Result<&str, PlanError>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let prompts = Arc::new(Mutex::new(Vec::new()));
            let model = Self {
                answer: answer.map(str::to_string),
                prompts: Arc::clone(&prompts),
            };
            (model, prompts)
        }
    }

    impl TextModel for MockModel {
        fn name(&self) -> &str {
            "mock"
        }

        fn complete(&self, prompt: &str) -> Result<String, PlanError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer.clone()
        }
    }

    #[test]
    fn test_prompt_with_coordinates() {
        let prompt = build_prompt("How do I start?", Some(-27.5954), Some(-48.548));
        assert!(prompt.contains("Approximate location: lat -27.5954, lon -48.548"));
        assert!(prompt.contains("Question: How do I start?"));
        assert!(prompt.contains("Ernst Götsch"));
        for (i, title) in PLAN_SECTIONS.iter().enumerate() {
            assert!(prompt.contains(&format!("{}. {title}", i + 1)));
        }
        assert!(prompt.contains("beginners"));
    }

    #[test]
    fn test_prompt_without_coordinates() {
        let prompt = build_prompt("How do I start?", None, None);
        assert!(prompt.contains("Approximate location: coordinates unavailable"));

        let partial = build_prompt("How do I start?", Some(10.0), None);
        assert!(partial.contains(COORDINATES_UNAVAILABLE));
        assert!(!partial.contains("lat 10"));
    }

    #[test]
    fn test_sections_are_in_order() {
        let prompt = build_prompt("q", None, None);
        let positions: Vec<usize> = PLAN_SECTIONS
            .iter()
            .map(|title| prompt.find(title).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_generate_trims_output() {
        let (model, prompts) = MockModel::answering(Ok("\n\n  1. Site diagnosis ...  \n"));
        let generator = PlanGenerator::new(Box::new(model));
        let plan = generator.generate("How do I start?", Some(1.5), Some(2.5));
        assert_eq!(plan, "1. Site diagnosis ...");

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("lat 1.5, lon 2.5"));
    }

    #[test]
    fn test_blank_completion_yields_notice() {
        let (model, _) = MockModel::answering(Ok("   \n\t"));
        let generator = PlanGenerator::new(Box::new(model));
        assert_eq!(
            generator.try_generate("q", None, None),
            Err(PlanError::EmptyCompletion)
        );
        assert_eq!(generator.generate("q", None, None), EMPTY_RESPONSE_MESSAGE);
    }

    #[test]
    fn test_model_failure_yields_inline_notice() {
        let (model, _) =
            MockModel::answering(Err(PlanError::GenerationFailure("HTTP 400: bad key".into())));
        let generator = PlanGenerator::new(Box::new(model));
        let text = generator.generate("q", None, None);
        assert!(text.starts_with("❌"));
        assert!(text.contains("HTTP 400: bad key"));
    }

    #[test]
    fn test_from_config_with_configured_key() {
        let mut config = AgroPlanConfig::default();
        config.model.api_key = Some("test-key".to_string());
        assert!(PlanGenerator::from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_without_key_fails_fast() {
        let outcome = PlanGenerator::from_config(&AgroPlanConfig::default());
        match std::env::var(API_KEY_ENV_VAR) {
            Ok(key) if !key.trim().is_empty() => assert!(outcome.is_ok()),
            _ => assert!(matches!(outcome, Err(AgroPlanError::Config { .. }))),
        }
    }
}
