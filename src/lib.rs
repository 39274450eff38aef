//! Newsdesk
//!
//! An HTTP service that fetches a news article by URL or title, then
//! translates, summarizes, answers questions about, and reads out the text.
//! All the heavy lifting is delegated to external providers.
//!
//! # Architecture
//!
//! - **Server**: Axum router with trace, CORS, timeout and rate-limit layers
//! - **Pipeline**: provider calls and the session updates they lead to
//! - **Providers**: one trait per external capability, with HTTP adapters
//! - **Sessions**: in-memory article, summary and answer log per session id
//!
//! # Modules
//!
//! - [`config`]: CLI and layered configuration
//! - [`error`]: provider and pipeline error types
//! - [`language`]: supported language codes
//! - [`llm`]: streaming chat-completions client
//! - [`pipeline`]: the article pipeline
//! - [`providers`]: provider traits and adapters
//! - [`session`]: session store

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod error;
pub mod language;
pub mod llm;
pub mod pipeline;
pub mod providers;
pub mod rate_limit;
pub mod server;
pub mod session;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::pipeline::{ArticlePipeline, PipelineOptions};
use crate::providers::Providers;
use crate::rate_limit::SimpleRateLimiter;
use crate::session::SessionStore;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<ArticlePipeline>,
    /// Per-session article, summary and answers.
    pub sessions: SessionStore,
    /// Global Rate Limiter
    pub rate_limiter: Arc<SimpleRateLimiter>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire a pipeline over `providers` with options taken from `config`.
    #[must_use]
    pub fn new(config: Arc<AppConfig>, providers: Providers) -> Self {
        let pipeline = ArticlePipeline::new(providers, PipelineOptions::from_config(&config));
        let rate_limiter = SimpleRateLimiter::new(
            config.resilience.requests_per_second,
            config.resilience.burst_size,
        );
        Self {
            pipeline: Arc::new(pipeline),
            sessions: SessionStore::new(),
            rate_limiter: Arc::new(rate_limiter),
            config,
        }
    }
}
