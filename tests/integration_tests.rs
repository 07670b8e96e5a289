//! End-to-end tests for the AgroPlan library with scripted HTTP and model fakes

use agroplan::config::{GeocodingConfig, GeocodingProvider};
use agroplan::fetcher::{RawResponse, Sleeper, TransportError};
use agroplan::planner::EMPTY_RESPONSE_MESSAGE;
use agroplan::questionnaire::{Goal, SpeciesType, Terrain};
use agroplan::{
    Advisor, AgroPlanConfig, BiomeTable, FarmProfile, FetchError, Fetcher, Geocoder, HttpTransport,
    PlanError, PlanGenerator, RetryPolicy, TextModel, summary,
};
use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Call = (String, Vec<(String, String)>);

/// Replays canned responses and records each request
#[derive(Clone, Default)]
struct ScriptedHttp {
    replies: Arc<Mutex<VecDeque<Result<RawResponse, TransportError>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedHttp {
    fn reply(self, status: u16, body: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(RawResponse::new(status, body)));
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedHttp {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<RawResponse, TransportError> {
        let params = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.calls.lock().unwrap().push((url.to_string(), params));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("connection refused".into())))
    }
}

#[derive(Clone, Default)]
struct RecordingSleeper(Arc<Mutex<Vec<Duration>>>);

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.0.lock().unwrap().push(duration);
    }
}

#[derive(Clone)]
struct RecordingModel {
    answer: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl RecordingModel {
    fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Arc::default(),
        }
    }
}

impl TextModel for RecordingModel {
    fn name(&self) -> &str {
        "recording"
    }

    fn complete(&self, prompt: &str) -> Result<String, PlanError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer.clone())
    }
}

const CHAPECO: &str = r#"{"results": [{"name": "Chapecó", "latitude": -27.1004, "longitude": -52.6152,
    "country": "Brazil", "admin1": "Santa Catarina", "admin2": "Chapecó"}]}"#;

fn geocoder(http: &ScriptedHttp, sleeper: &RecordingSleeper, settings: GeocodingConfig) -> Geocoder {
    let fetcher = Fetcher::with_transport(
        Box::new(http.clone()),
        Box::new(sleeper.clone()),
        RetryPolicy::default(),
    );
    Geocoder::new(fetcher, settings, BiomeTable::default())
}

#[test]
fn test_full_planning_run() {
    let http = ScriptedHttp::default().reply(200, CHAPECO);
    let model = RecordingModel::answering("\n1. Site diagnosis\nRolling hills.\n5. Initial care\nMulch.\n");
    let mut advisor = Advisor::new(
        geocoder(&http, &RecordingSleeper::default(), GeocodingConfig::default()),
        PlanGenerator::new(Box::new(model.clone())),
    );

    let profile = FarmProfile {
        area: "3 ha".into(),
        terrain: Terrain::Sloped,
        goal: Goal::Restoration,
        species_types: vec![SpeciesType::Timber],
        ..FarmProfile::new("Chapecó, SC")
    };
    let outcome = advisor.run(&profile).unwrap();

    assert!(outcome.diagnosis.contains("🌍 Recognized location: Chapecó, Santa Catarina, Brazil"));
    assert!(outcome.diagnosis.contains("Atlantic Forest (estimated)"));
    assert_eq!(outcome.latitude, Some(-27.1004));
    assert_eq!(
        outcome.plan.as_deref(),
        Some("1. Site diagnosis\nRolling hills.\n5. Initial care\nMulch.")
    );

    let calls = http.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].1.contains(&("name".to_string(), "Chapecó, SC".to_string())));
    assert!(calls[0].1.contains(&("count".to_string(), "1".to_string())));

    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains("Approximate location: lat -27.1004, lon -52.6152"));
    assert!(prompts[0].contains("- Terrain: Sloped"));

    let generated_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let text = summary::render(&profile, &outcome, generated_at);
    assert!(text.contains("Desired species: Timber"));
    assert!(text.contains("Rolling hills."));
}

#[test]
fn test_rate_limited_lookup_is_retried_then_reported() {
    let http = ScriptedHttp::default()
        .reply(429, "")
        .reply(429, "")
        .reply(429, "");
    let sleeper = RecordingSleeper::default();
    let mut geocoder = geocoder(&http, &sleeper, GeocodingConfig::default());

    let outcome = geocoder.diagnose("Curitiba");
    assert_eq!(
        outcome,
        Err(FetchError::RateLimited { attempts: 3 }.into())
    );
    assert_eq!(http.calls().len(), 3);
    assert_eq!(
        *sleeper.0.lock().unwrap(),
        vec![Duration::from_millis(1200), Duration::from_millis(2400)]
    );

    // Not cached: the next attempt goes back to the network
    let retry = geocoder.resolve("Curitiba");
    assert!(!retry.is_resolved());
    assert_eq!(http.calls().len(), 6);
}

#[test]
fn test_unrecognized_location_skips_model() {
    let http = ScriptedHttp::default().reply(200, r#"{"generationtime_ms": 0.2}"#);
    let model = RecordingModel::answering("never used");
    let mut advisor = Advisor::new(
        geocoder(&http, &RecordingSleeper::default(), GeocodingConfig::default()),
        PlanGenerator::new(Box::new(model.clone())),
    );

    let outcome = advisor.run(&FarmProfile::new("Xyzzy Plains")).unwrap();
    assert!(outcome.diagnosis.contains("not recognized"));
    assert_eq!(outcome.plan, None);
    assert!(model.prompts.lock().unwrap().is_empty());
}

#[test]
fn test_blank_completion_never_yields_empty_plan() {
    let mut advisor = Advisor::new(
        geocoder(
            &ScriptedHttp::default(),
            &RecordingSleeper::default(),
            GeocodingConfig::default(),
        ),
        PlanGenerator::new(Box::new(RecordingModel::answering("  \n "))),
    );
    let outcome = advisor.run(&FarmProfile::new("-23.5505, -46.6333")).unwrap();
    assert_eq!(outcome.plan.as_deref(), Some(EMPTY_RESPONSE_MESSAGE));
}

#[test]
fn test_nominatim_reverse_lookup_names_coordinates() {
    let http = ScriptedHttp::default().reply(
        200,
        r#"{"display_name": "Porto Alegre, Rio Grande do Sul, Brasil",
            "address": {"city": "Porto Alegre", "state": "Rio Grande do Sul", "country": "Brasil"}}"#,
    );
    let settings = GeocodingConfig {
        provider: GeocodingProvider::Nominatim,
        search_url: GeocodingProvider::Nominatim.default_search_url().to_string(),
        reverse_url: GeocodingProvider::Nominatim.default_reverse_url().to_string(),
        reverse_lookup: true,
        ..GeocodingConfig::default()
    };
    let mut geocoder = geocoder(&http, &RecordingSleeper::default(), settings);

    let resolution = geocoder.resolve("-30.0346, -51.2177");
    assert!(resolution.text.contains("Porto Alegre, Rio Grande do Sul, Brasil"));
    assert!(resolution.text.contains("Atlantic Forest (estimated)"));
    assert_eq!(resolution.latitude, Some(-30.0346));

    let calls = http.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "https://nominatim.openstreetmap.org/reverse");
    assert!(calls[0].1.contains(&("zoom".to_string(), "10".to_string())));
}

#[test]
fn test_config_file_drives_geocoder() {
    let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
    writeln!(
        file,
        r#"
[geocoding]
language = "pt"

[biome]
fallback_biome = "Mediterranean scrub (estimated)"
fallback_soil = "Calcareous soil (estimated)"

[[biome.rules]]
countries = ["Kenya"]
biome = "Savanna (estimated)"
soil = "Red laterite (estimated)"
"#
    )
    .unwrap();

    let config = AgroPlanConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
    assert_eq!(config.geocoding.provider, GeocodingProvider::OpenMeteo);
    assert_eq!(config.geocoding.language, "pt");

    // Coordinates resolve offline, so the real HTTP client is never used
    let mut geocoder = Geocoder::from_config(&config).unwrap();
    let resolution = geocoder.resolve("38.7223, -9.1393");
    assert!(resolution.text.contains("Mediterranean scrub (estimated)"));
    assert!(resolution.text.contains("Calcareous soil (estimated)"));
    assert_eq!(geocoder.cached_entries(), 1);
}
