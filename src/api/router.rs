//! Routes and handlers for the form UI. Each user action runs to
//! completion before the page re-renders; pipeline work happens on the
//! blocking pool, session state behind one mutex.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tokio::sync::Mutex as TokioMutex;
use tower_http::services::ServeDir;

use crate::api::error::ApiError;
use crate::api::page::{render_page, PageView, ResultView};
use crate::config::AppConfig;
use crate::diagnosis::{default_prompt, diagnose, VisionClient};
use crate::feedback::{FeedbackLog, FeedbackRecord};
use crate::pipeline::{normalize_in_place, store_upload, UrlFetcher};
use crate::session::{AnalysisOutcome, AnalysisSession, LeafContext, Rating, SEASONS};

/// Generous for phone photos plus multipart overhead.
const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

/// Shared handler state. One session per process (single-user tool).
#[derive(Clone)]
pub struct AppState {
    pub content_dir: PathBuf,
    pub session: Arc<TokioMutex<AnalysisSession>>,
    pub vision: Arc<dyn VisionClient>,
    pub fetcher: Arc<UrlFetcher>,
    pub feedback: Arc<FeedbackLog>,
}

impl AppState {
    pub fn new(config: &AppConfig, vision: Arc<dyn VisionClient>) -> Self {
        Self {
            content_dir: config.content_dir(),
            session: Arc::new(TokioMutex::new(AnalysisSession::default())),
            vision,
            fetcher: Arc::new(UrlFetcher::new(config.content_dir())),
            feedback: Arc::new(FeedbackLog::new(config.feedback_path())),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(show_page))
        .route("/upload", post(handle_upload))
        .route("/fetch", post(handle_fetch_url))
        .route("/analyze", post(handle_analyze))
        .route("/feedback", post(handle_feedback))
        .route("/health", get(|| async { "ok" }))
        .nest_service("/images", ServeDir::new(state.content_dir.clone()))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn show_page(State(state): State<AppState>) -> Html<String> {
    let mut session = state.session.lock().await;
    let prompt = session
        .prompt
        .clone()
        .unwrap_or_else(|| default_prompt(&session.context));
    let view = PageView {
        image_name: session.image_name(),
        context: session.context.clone(),
        prompt,
        result: session.outcome.as_ref().map(|outcome| ResultView {
            text: outcome.display_text(),
            is_failure: outcome.is_failure(),
        }),
        warnings: session.take_warnings(),
        notice: session.take_notice(),
    };
    Html(render_page(&view))
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("leaf").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read file data: {e}")))?;
            file = Some((filename, bytes.to_vec()));
        }
    }

    let mut session = state.session.lock().await;
    match file {
        Some((filename, bytes)) if !bytes.is_empty() => {
            let content_dir = state.content_dir.clone();
            let stored =
                tokio::task::spawn_blocking(move || store_upload(&content_dir, &filename, &bytes))
                    .await
                    .map_err(|e| ApiError::Internal(format!("Upload task failed: {e}")))?;
            match stored {
                Ok(path) => session.image = Some(path),
                Err(e) => return Err(ApiError::Internal(format!("Failed to store upload: {e}"))),
            }
        }
        _ => session.warn("No file provided."),
    }
    Ok(Redirect::to("/"))
}

#[derive(Deserialize)]
struct FetchForm {
    #[serde(default)]
    url: String,
}

async fn handle_fetch_url(
    State(state): State<AppState>,
    Form(form): Form<FetchForm>,
) -> Result<Redirect, ApiError> {
    let url = form.url.trim().to_string();
    let mut session = state.session.lock().await;

    if url.is_empty() {
        session.warn("Enter an image URL first.");
        return Ok(Redirect::to("/"));
    }

    let fetcher = state.fetcher.clone();
    let fetched = tokio::task::spawn_blocking(move || fetcher.fetch(&url))
        .await
        .map_err(|e| ApiError::Internal(format!("Download task failed: {e}")))?;

    match fetched {
        Ok(path) => session.image = Some(path),
        Err(e) => session.warn(format!("Error downloading image: {e}")),
    }
    Ok(Redirect::to("/"))
}

#[derive(Deserialize)]
struct AnalyzeForm {
    #[serde(default)]
    species: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    season: String,
    #[serde(default)]
    prompt: String,
}

async fn handle_analyze(
    State(state): State<AppState>,
    Form(form): Form<AnalyzeForm>,
) -> Result<Redirect, ApiError> {
    if !SEASONS.contains(&form.season.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "Unknown season: {}",
            form.season
        )));
    }

    let mut session = state.session.lock().await;
    session.context = LeafContext {
        species: form.species,
        region: form.region,
        season: form.season,
    };
    // Whatever text was in the prompt box at submission time goes to the
    // model verbatim; the context above is NOT re-embedded here.
    session.prompt = Some(form.prompt.clone());

    let Some(image) = session.image.clone() else {
        session.warn("Please upload an image or provide a valid image URL first.");
        return Ok(Redirect::to("/"));
    };

    let vision = state.vision.clone();
    let prompt = form.prompt;
    let (normalized, outcome) = tokio::task::spawn_blocking(move || {
        let normalized = normalize_in_place(&image);
        // Normalization failure is non-fatal: the un-normalized image is
        // still sent to the model.
        let outcome = diagnose(vision.as_ref(), &image, &prompt);
        (normalized, outcome)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Analysis task failed: {e}")))?;

    if let Err(e) = normalized {
        session.warn(format!("Preprocessing error: {e}"));
    }
    session.outcome = Some(match outcome {
        Ok(text) => AnalysisOutcome::Diagnosis(text),
        Err(e) => AnalysisOutcome::Failed(e),
    });
    Ok(Redirect::to("/"))
}

#[derive(Deserialize)]
struct FeedbackForm {
    rating: String,
    #[serde(default)]
    notes: String,
}

async fn handle_feedback(
    State(state): State<AppState>,
    Form(form): Form<FeedbackForm>,
) -> Result<Redirect, ApiError> {
    let rating = Rating::parse(&form.rating)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown rating value: {}", form.rating)))?;

    let mut session = state.session.lock().await;
    let (model_output, image_name) = match (&session.outcome, session.image_name()) {
        (Some(outcome), Some(name)) => (outcome.display_text(), name),
        _ => {
            session.warn("Analyze an image before submitting feedback.");
            return Ok(Redirect::to("/"));
        }
    };

    let record = FeedbackRecord {
        image_name,
        prompt: session.prompt.clone().unwrap_or_default(),
        model_output,
        rating,
        user_notes: form.notes,
        species: session.context.species.clone(),
        region: session.context.region.clone(),
        season: session.context.season.clone(),
    };

    let log = state.feedback.clone();
    tokio::task::spawn_blocking(move || log.record(&record))
        .await
        .map_err(|e| ApiError::Internal(format!("Feedback task failed: {e}")))??;

    session.notify("Feedback saved successfully!");
    Ok(Redirect::to("/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
