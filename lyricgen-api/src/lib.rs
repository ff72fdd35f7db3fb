//! lyricgen-api library interface for testing
//!
//! Exposes public APIs for integration testing

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use lyricgen_common::config::StreamingConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::{
    GenerationContext, GenerationStore, PacingPolicy, SegmenterConfig, SqliteGenerationStore,
    TokenSource,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Store handed to generation sessions
    pub store: Arc<dyn GenerationStore>,
    /// Upstream model
    pub token_source: Arc<dyn TokenSource>,
    pub segmenter: SegmenterConfig,
    pub pacing: PacingPolicy,
    /// Live feed buffer per session
    pub channel_capacity: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        token_source: Arc<dyn TokenSource>,
        segmenter: SegmenterConfig,
        pacing: PacingPolicy,
        channel_capacity: usize,
    ) -> Self {
        Self {
            store: Arc::new(SqliteGenerationStore::new(db.clone())),
            db,
            token_source,
            segmenter,
            pacing,
            channel_capacity: channel_capacity.max(1),
            startup_time: Utc::now(),
        }
    }

    /// State with streaming tunables taken from the bootstrap config
    pub fn from_config(
        db: SqlitePool,
        token_source: Arc<dyn TokenSource>,
        streaming: &StreamingConfig,
    ) -> Self {
        Self::new(
            db,
            token_source,
            SegmenterConfig::with_heuristics(
                streaming.json_lookahead_chars,
                streaming.min_tail_reserve_chars,
            ),
            PacingPolicy::fixed(Duration::from_millis(streaming.pacing_interval_ms)),
            streaming.channel_capacity,
        )
    }

    /// Replace the store used by generation sessions
    pub fn with_store(mut self, store: Arc<dyn GenerationStore>) -> Self {
        self.store = store;
        self
    }

    pub fn generation_context(&self) -> GenerationContext {
        GenerationContext {
            store: self.store.clone(),
            token_source: self.token_source.clone(),
            segmenter: self.segmenter.clone(),
            pacing: self.pacing.clone(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::lyrics_routes())
        .merge(api::rule_routes())
        .merge(api::persona_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
