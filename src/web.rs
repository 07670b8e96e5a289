//! Web form and JSON API around the [`Advisor`] pipeline

use crate::AgroPlanError;
use crate::advisor::{Advisor, PlanOutcome};
use crate::geocoding::Resolution;
use crate::questionnaire::FarmProfile;
use crate::summary;
use anyhow::Context;
use axum::{
    Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

const INDEX_HTML: &str = include_str!("../static/index.html");
const MAX_BODY_BYTES: usize = 64 * 1024;

/// One advisor shared by all requests; its geocoding cache spans sessions.
pub type SharedAdvisor = Arc<Mutex<Advisor>>;

#[derive(Debug, Deserialize)]
pub struct DiagnosisQuery {
    pub location: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanResponse {
    #[serde(flatten)]
    pub outcome: PlanOutcome,
    /// Downloadable plain-text summary
    pub summary: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

/// Malformed or mistyped JSON keeps axum's status but gets the `{message}` body
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: format!("Invalid input: {}", rejection.body_text()),
        }
    }
}

impl From<AgroPlanError> for ApiError {
    fn from(error: AgroPlanError) -> Self {
        let status = match error {
            AgroPlanError::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { message: self.message })).into_response()
    }
}

pub fn router(advisor: SharedAdvisor) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/diagnosis", get(get_diagnosis))
        .route("/plan", post(post_plan));

    Router::new()
        .route("/", get(index))
        .nest("/api", api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(advisor)
}

pub async fn run(advisor: SharedAdvisor, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://localhost:{}", port);
    axum::serve(listener, router(advisor))
        .await
        .context("Web server stopped unexpectedly")
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn get_diagnosis(
    State(advisor): State<SharedAdvisor>,
    Query(query): Query<DiagnosisQuery>,
) -> Result<Json<Resolution>, ApiError> {
    let resolution = blocking(advisor, move |advisor| Ok(advisor.locate(&query.location))).await?;
    Ok(Json(resolution))
}

async fn post_plan(
    State(advisor): State<SharedAdvisor>,
    payload: Result<Json<FarmProfile>, JsonRejection>,
) -> Result<Json<PlanResponse>, ApiError> {
    let Json(profile) = payload?;
    tracing::info!("Plan requested for '{}'", profile.location.trim());
    blocking(advisor, move |advisor| {
        let outcome = advisor.run(&profile)?;
        let generated_at = Utc::now();
        Ok(Json(PlanResponse {
            summary: summary::render(&profile, &outcome, generated_at),
            file_name: summary::file_name(generated_at),
            outcome,
        }))
    })
    .await
}

/// Run blocking pipeline work off the async executor
async fn blocking<T, F>(advisor: SharedAdvisor, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Advisor) -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        // A panic mid-request leaves the cache at worst stale, never unusable
        let mut guard = advisor.lock().unwrap_or_else(PoisonError::into_inner);
        work(&mut guard)
    })
    .await
    .map_err(|e| {
        tracing::error!("Blocking task failed: {}", e);
        ApiError::internal("request processing failed")
    })?
}
