use crate::db::connection::DbPool;
use serde::Serialize;
use sqlx::Error;
use sqlx::types::chrono::{DateTime, Utc};

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SuggestionWithUser {
    pub id: i32,
    pub user_id: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub suggestion_type: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

pub async fn create_suggestion(
    pool: &DbPool,
    user_id: i32,
    suggestion_type: &str,
    title: &str,
    description: &str,
) -> Result<i32, Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO suggestions (user_id, type, title, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(suggestion_type)
    .bind(title)
    .bind(description)
    .fetch_one(pool)
    .await
}

pub async fn list_suggestions(pool: &DbPool) -> Result<Vec<SuggestionWithUser>, Error> {
    sqlx::query_as::<_, SuggestionWithUser>(
        r#"
        SELECT s.id, s.user_id, s.type, s.title, s.description, s.status,
               u.username, s.created_at
        FROM suggestions s
        JOIN users u ON u.id = s.user_id
        ORDER BY s.created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn mark_suggestion_processed(pool: &DbPool, suggestion_id: i32) -> Result<u64, Error> {
    let result = sqlx::query(
        "UPDATE suggestions SET status = 'processed', updated_at = NOW() WHERE id = $1",
    )
    .bind(suggestion_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Suggestions are the one entity admins delete for real.
pub async fn delete_suggestion(pool: &DbPool, suggestion_id: i32) -> Result<u64, Error> {
    let result = sqlx::query("DELETE FROM suggestions WHERE id = $1")
        .bind(suggestion_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
