//! Base writing rule persistence (single row, id 1)

use chrono::Utc;
use lyricgen_common::models::Rule;
use lyricgen_common::Result;
use sqlx::{Row, SqlitePool};

use super::{format_timestamp, parse_timestamp};

const RULE_ID: i64 = 1;

pub async fn get_rule(pool: &SqlitePool) -> Result<Option<Rule>> {
    let row = sqlx::query("SELECT id, prompt, updated_at FROM rules WHERE id = ?")
        .bind(RULE_ID)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let updated_at: String = row.get("updated_at");
            Ok(Some(Rule {
                id: row.get("id"),
                prompt: row.get("prompt"),
                updated_at: parse_timestamp(&updated_at)?,
            }))
        }
        None => Ok(None),
    }
}

/// Insert or replace the rule text
pub async fn upsert_rule(pool: &SqlitePool, prompt: &str) -> Result<Rule> {
    let updated_at = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO rules (id, prompt, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            prompt = excluded.prompt,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(RULE_ID)
    .bind(prompt)
    .bind(format_timestamp(&updated_at))
    .execute(pool)
    .await?;

    Ok(Rule {
        id: RULE_ID,
        prompt: prompt.to_string(),
        updated_at,
    })
}
