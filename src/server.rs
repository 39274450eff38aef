use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRequest, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::error::{ErrorBody, PipelineError};
use crate::language::Language;
use crate::pipeline::ArticleSource;
use crate::providers::{ArticleLink, Providers};
use crate::session::{DEFAULT_SESSION_ID, Session, SessionSnapshot};

/// Header selecting the session a request works on.
pub const SESSION_HEADER: &str = "x-session-id";

const BODY_LIMIT_BYTES: usize = 1024 * 1024;
const DEFAULT_SITE_LINKS: usize = 20;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let providers = Providers::from_config(&config)?;
    let state = AppState::new(Arc::clone(&config), providers);

    spawn_session_cleanup(&state);

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Drop idle sessions on a fixed interval.
fn spawn_session_cleanup(state: &AppState) {
    let sessions = state.sessions.clone();
    let idle = Duration::from_secs(state.config.session.idle_timeout_secs);
    let every = Duration::from_secs(state.config.session.cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = sessions.cleanup_expired_with_timeout(idle);
            if removed > 0 {
                info!(
                    name: "session.cleanup",
                    removed,
                    remaining = sessions.len(),
                    "Expired sessions removed"
                );
            }
        }
    });
}

/// Build the application router with all middleware attached.
pub fn build_router(state: AppState) -> Router {
    let request_timeout = state.config.resilience.request_timeout();

    Router::new()
        .route("/article", post(post_article))
        .route("/question", post(post_question))
        .route("/summarize", post(post_summarize))
        .route("/article_audio", post(post_article_audio))
        .route("/summary_audio", post(post_summary_audio))
        .route("/site_articles", post(post_site_articles))
        .route("/session", get(get_session).delete(delete_session))
        .route("/languages", get(get_languages))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(request_timeout, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => {
                        tracing::warn!(
                            timeout_secs = request_timeout.as_secs(),
                            "Request timed out"
                        );
                        (
                            StatusCode::REQUEST_TIMEOUT,
                            Json(ErrorBody {
                                detail: "Request timed out".to_string(),
                            }),
                        )
                            .into_response()
                    }
                }
            },
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::rate_limit::rate_limit_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Request helpers
// ─────────────────────────────────────────────────────────────────────────────

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}

/// Session a write goes to, created on first use.
fn session(state: &AppState, headers: &HeaderMap) -> Session {
    state.sessions.get_or_create(&session_id(headers))
}

/// Session a read works on. Unknown ids get an empty session that is not stored.
fn existing_session(state: &AppState, headers: &HeaderMap) -> Session {
    state.sessions.get_or_transient(&session_id(headers))
}

/// JSON body extractor that reports malformed or mistyped bodies as a
/// validation error with the usual `{"detail"}` body.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = PipelineError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| PipelineError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, PipelineError> {
    value.ok_or_else(|| PipelineError::Validation(format!("{field} must be provided")))
}

/// Parse a target language, honouring `pipeline.strict_languages`.
fn target_language(state: &AppState, raw: Option<&str>) -> Result<Language, PipelineError> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(Language::En);
    };
    if state.config.pipeline.strict_languages {
        raw.parse()
            .map_err(|e| PipelineError::Validation(format!("Invalid language: {e}")))
    } else {
        Ok(Language::parse_or_english(raw))
    }
}

fn source_language(state: &AppState, raw: Option<&str>) -> Result<Language, PipelineError> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(Language::Auto);
    };
    match raw.parse() {
        Ok(lang) => Ok(lang),
        Err(e) if state.config.pipeline.strict_languages => Err(PipelineError::Validation(
            format!("Invalid source language: {e}"),
        )),
        Err(_) => {
            tracing::warn!(language = %raw, "Unrecognized source language, using auto");
            Ok(Language::Auto)
        }
    }
}

fn audio_response(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "audio/mpeg")], bytes).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Target language; English when absent.
    #[serde(default)]
    pub language: Option<String>,
    /// Language the article is written in, if known.
    #[serde(default)]
    pub source_language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleResponse {
    pub article_text: String,
    pub authors: Vec<String>,
    pub source_url: Option<String>,
    pub site_name: Option<String>,
}

/// POST /article - Fetch an article by URL or title.
async fn post_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<ArticleRequest>,
) -> Result<Json<ArticleResponse>, PipelineError> {
    let source = ArticleSource::from_parts(req.url, req.title)?;
    let target = target_language(&state, req.language.as_deref())?;
    let hint = source_language(&state, req.source_language.as_deref())?;
    let session = session(&state, &headers);

    let article = state.pipeline.fetch(&session, source, target, hint).await?;

    Ok(Json(ArticleResponse {
        article_text: article.text,
        authors: article.authors,
        source_url: article.source_url,
        site_name: article.site_name,
    }))
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub answer: String,
}

/// POST /question - Answer a question about the current article.
async fn post_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<QuestionRequest>,
) -> Result<Json<QuestionResponse>, PipelineError> {
    let question = required("question", req.question)?;
    let target = target_language(&state, req.language.as_deref())?;
    let session = existing_session(&state, &headers);
    let answer = state.pipeline.answer(&session, &question, target).await?;
    Ok(Json(QuestionResponse {
        answer: answer.text,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub max_words: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

/// POST /summarize - Summarize the current article.
async fn post_summarize(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, PipelineError> {
    let target = target_language(&state, req.language.as_deref())?;
    let max_words = req
        .max_words
        .unwrap_or(state.config.pipeline.default_max_words);
    let session = existing_session(&state, &headers);
    let summary = state.pipeline.summarize(&session, max_words, target).await?;
    Ok(Json(SummarizeResponse {
        summary: summary.text,
    }))
}

/// POST /article_audio - Speak the current article.
async fn post_article_audio(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, PipelineError> {
    let session = existing_session(&state, &headers);
    let audio = state.pipeline.article_audio(&session).await?;
    Ok(audio_response(audio))
}

/// POST /summary_audio - Speak the current summary.
async fn post_summary_audio(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, PipelineError> {
    let session = existing_session(&state, &headers);
    let audio = state.pipeline.summary_audio(&session).await?;
    Ok(audio_response(audio))
}

#[derive(Debug, Deserialize)]
pub struct SiteArticlesRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// POST /site_articles - List article links on a site's front page.
async fn post_site_articles(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SiteArticlesRequest>,
) -> Result<Json<Vec<ArticleLink>>, PipelineError> {
    let url = required("url", req.url)?;
    let limit = req.limit.unwrap_or(DEFAULT_SITE_LINKS);
    let links = state.pipeline.list_site_articles(&url, limit).await?;
    Ok(Json(links))
}

/// GET /session - Current article, summary and answers.
async fn get_session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionSnapshot> {
    Json(existing_session(&state, &headers).snapshot())
}

/// DELETE /session - Forget the session.
async fn delete_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let id = session_id(&headers);
    match state.sessions.remove(&id) {
        Some(_) => {
            info!(session_id = %id, "Session deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                detail: format!("Session {id:?} not found"),
            }),
        )
            .into_response(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguageDto {
    pub code: String,
    pub name: String,
    /// Whether the language can be a translation target.
    pub target: bool,
}

/// GET /languages - Supported language codes.
async fn get_languages() -> Json<Vec<LanguageDto>> {
    Json(
        Language::ALL
            .iter()
            .map(|lang| LanguageDto {
                code: lang.code().to_string(),
                name: lang.name().to_string(),
                target: lang.is_valid_target(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_defaults() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id(&headers), DEFAULT_SESSION_ID);

        headers.insert(SESSION_HEADER, "  ".parse().unwrap());
        assert_eq!(session_id(&headers), DEFAULT_SESSION_ID);

        headers.insert(SESSION_HEADER, "abc".parse().unwrap());
        assert_eq!(session_id(&headers), "abc");
    }

    #[test]
    fn test_required_field() {
        assert_eq!(required("url", Some("https://a.example")).unwrap(), "https://a.example");
        let err = required::<String>("question", None).unwrap_err();
        assert_eq!(err.to_string(), "question must be provided");
    }
}
