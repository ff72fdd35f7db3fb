//! Lyrics record persistence

use chrono::Utc;
use lyricgen_common::models::{EmotionParams, LyricsRecord, LyricsStatus, LyricsSummary, NewLyrics};
use lyricgen_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};

/// Store a finished generation, returning the stored record
pub async fn insert_lyrics(pool: &SqlitePool, new: NewLyrics) -> Result<LyricsRecord> {
    let record = LyricsRecord {
        id: Uuid::new_v4(),
        theme: new.theme,
        emotion_params: new.emotion_params,
        generated_lyrics: new.generated_lyrics,
        generated_titles: new.generated_titles,
        status: LyricsStatus::default(),
        persona_id: new.persona_id,
        created_at: Utc::now(),
    };

    let emotion_params = serde_json::to_string(&record.emotion_params)?;
    let titles = serde_json::to_string(&record.generated_titles)?;

    sqlx::query(
        r#"
        INSERT INTO lyrics (
            id, theme, emotion_params, generated_lyrics, generated_titles,
            status, persona_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.theme)
    .bind(&emotion_params)
    .bind(&record.generated_lyrics)
    .bind(&titles)
    .bind(record.status.as_str())
    .bind(record.persona_id.map(|id| id.to_string()))
    .bind(format_timestamp(&record.created_at))
    .execute(pool)
    .await?;

    Ok(record)
}

/// History summaries, newest first
pub async fn list_lyrics(pool: &SqlitePool) -> Result<Vec<LyricsSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT id, theme, status, created_at, generated_titles
        FROM lyrics
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let id: String = row.get("id");
            let status: String = row.get("status");
            let created_at: String = row.get("created_at");
            let titles: String = row.get("generated_titles");

            Ok(LyricsSummary {
                id: parse_uuid(&id)?,
                theme: row.get("theme"),
                status: LyricsStatus::parse(&status)?,
                created_at: parse_timestamp(&created_at)?,
                generated_titles: serde_json::from_str(&titles)?,
            })
        })
        .collect()
}

pub async fn get_lyrics(pool: &SqlitePool, id: Uuid) -> Result<Option<LyricsRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, theme, emotion_params, generated_lyrics, generated_titles,
               status, persona_id, created_at
        FROM lyrics
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Set the usage status; `None` when no such record exists
pub async fn update_status(
    pool: &SqlitePool,
    id: Uuid,
    status: LyricsStatus,
) -> Result<Option<LyricsRecord>> {
    let result = sqlx::query("UPDATE lyrics SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_lyrics(pool, id).await
}

/// Whether any stored record was written with this persona
pub async fn has_lyrics_for_persona(pool: &SqlitePool, persona_id: Uuid) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lyrics WHERE persona_id = ?")
        .bind(persona_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

fn record_from_row(row: &SqliteRow) -> Result<LyricsRecord> {
    let id: String = row.get("id");
    let emotion_params: String = row.get("emotion_params");
    let titles: String = row.get("generated_titles");
    let status: String = row.get("status");
    let persona_id: Option<String> = row.get("persona_id");
    let created_at: String = row.get("created_at");

    Ok(LyricsRecord {
        id: parse_uuid(&id)?,
        theme: row.get("theme"),
        emotion_params: serde_json::from_str::<EmotionParams>(&emotion_params)?,
        generated_lyrics: row.get("generated_lyrics"),
        generated_titles: serde_json::from_str(&titles)?,
        status: LyricsStatus::parse(&status)?,
        persona_id: persona_id.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_timestamp(&created_at)?,
    })
}
