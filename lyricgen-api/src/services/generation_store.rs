//! Persistence contract used by generation sessions
//!
//! Sessions only read configuration text and store finished results, so
//! they depend on this narrow trait instead of the pool. Tests substitute
//! failing or recording implementations.

use async_trait::async_trait;
use lyricgen_common::models::{LyricsRecord, NewLyrics, Persona};
use lyricgen_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;

#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Stored base rule text, if one has been saved
    async fn base_rule(&self) -> Result<Option<String>>;

    async fn persona(&self, id: Uuid) -> Result<Option<Persona>>;

    /// Durably store a finished result
    async fn insert_lyrics(&self, new: NewLyrics) -> Result<LyricsRecord>;
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteGenerationStore {
    pool: SqlitePool,
}

impl SqliteGenerationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenerationStore for SqliteGenerationStore {
    async fn base_rule(&self) -> Result<Option<String>> {
        Ok(db::rules::get_rule(&self.pool).await?.map(|rule| rule.prompt))
    }

    async fn persona(&self, id: Uuid) -> Result<Option<Persona>> {
        db::personas::get_persona(&self.pool, id).await
    }

    async fn insert_lyrics(&self, new: NewLyrics) -> Result<LyricsRecord> {
        db::lyrics::insert_lyrics(&self.pool, new).await
    }
}
