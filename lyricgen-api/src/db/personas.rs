//! Persona persistence

use chrono::Utc;
use lyricgen_common::models::{Persona, PersonaInput};
use lyricgen_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};

/// All personas, newest first
pub async fn list_personas(pool: &SqlitePool) -> Result<Vec<Persona>> {
    let rows = sqlx::query(
        "SELECT id, name, prompt, created_at FROM personas ORDER BY created_at DESC, rowid DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(persona_from_row).collect()
}

pub async fn get_persona(pool: &SqlitePool, id: Uuid) -> Result<Option<Persona>> {
    let row = sqlx::query("SELECT id, name, prompt, created_at FROM personas WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(persona_from_row).transpose()
}

/// Whether `name` is used by a persona other than `exclude`
pub async fn name_taken(pool: &SqlitePool, name: &str, exclude: Option<Uuid>) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM personas WHERE name = ? AND (? IS NULL OR id != ?)",
    )
    .bind(name)
    .bind(exclude.map(|id| id.to_string()))
    .bind(exclude.map(|id| id.to_string()))
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

pub async fn insert_persona(pool: &SqlitePool, input: &PersonaInput) -> Result<Persona> {
    let persona = Persona {
        id: Uuid::new_v4(),
        name: input.name.clone(),
        prompt: input.prompt.clone(),
        created_at: Utc::now(),
    };

    sqlx::query("INSERT INTO personas (id, name, prompt, created_at) VALUES (?, ?, ?, ?)")
        .bind(persona.id.to_string())
        .bind(&persona.name)
        .bind(&persona.prompt)
        .bind(format_timestamp(&persona.created_at))
        .execute(pool)
        .await?;

    Ok(persona)
}

/// Replace name and prompt; `None` when no such persona exists
pub async fn update_persona(
    pool: &SqlitePool,
    id: Uuid,
    input: &PersonaInput,
) -> Result<Option<Persona>> {
    let result = sqlx::query("UPDATE personas SET name = ?, prompt = ? WHERE id = ?")
        .bind(&input.name)
        .bind(&input.prompt)
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_persona(pool, id).await
}

/// Returns false when no such persona exists
pub async fn delete_persona(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM personas WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn persona_from_row(row: &SqliteRow) -> Result<Persona> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");

    Ok(Persona {
        id: parse_uuid(&id)?,
        name: row.get("name"),
        prompt: row.get("prompt"),
        created_at: parse_timestamp(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn input(name: &str) -> PersonaInput {
        PersonaInput {
            name: name.to_string(),
            prompt: "Write like a late-night radio host".to_string(),
        }
    }

    #[tokio::test]
    async fn test_crud_cycle() {
        let pool = test_pool().await;

        let created = insert_persona(&pool, &input("DJ")).await.unwrap();
        assert_eq!(get_persona(&pool, created.id).await.unwrap().unwrap().name, "DJ");

        let updated = update_persona(&pool, created.id, &input("Night DJ"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Night DJ");
        assert_eq!(updated.created_at.timestamp_micros(), created.created_at.timestamp_micros());

        assert!(delete_persona(&pool, created.id).await.unwrap());
        assert!(!delete_persona(&pool, created.id).await.unwrap());
        assert!(list_personas(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_name_taken_excludes_self() {
        let pool = test_pool().await;
        let persona = insert_persona(&pool, &input("Poet")).await.unwrap();

        assert!(name_taken(&pool, "Poet", None).await.unwrap());
        assert!(!name_taken(&pool, "Poet", Some(persona.id)).await.unwrap());
        assert!(!name_taken(&pool, "Bard", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_is_none() {
        let pool = test_pool().await;
        assert!(update_persona(&pool, Uuid::new_v4(), &input("x")).await.unwrap().is_none());
    }
}
