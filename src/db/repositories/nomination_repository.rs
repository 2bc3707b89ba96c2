use crate::db::connection::DbPool;
use serde::Serialize;
use sqlx::Error;
use sqlx::types::chrono::{DateTime, Utc};

/// Active nomination joined with its category name and end time.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct NominationOverview {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub image_url: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DeletedNomination {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub deleted_at: DateTime<Utc>,
}

pub async fn create_nomination(
    pool: &DbPool,
    name: &str,
    description: &str,
    category_id: i32,
    created_by: Option<i32>,
) -> Result<i32, Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO nominations (name, description, category_id, created_by)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(category_id)
    .bind(created_by)
    .fetch_one(pool)
    .await
}

/// Both the nomination's own `deleted_at` and its category's must be null
/// for it to show up anywhere public.
pub async fn list_active_nominations(pool: &DbPool) -> Result<Vec<NominationOverview>, Error> {
    sqlx::query_as::<_, NominationOverview>(
        r#"
        SELECT n.id, n.name, n.description, c.name AS category, n.image_url,
               c.end_time, n.created_at
        FROM nominations n
        JOIN categories c ON c.id = n.category_id
        WHERE n.deleted_at IS NULL AND c.deleted_at IS NULL
        ORDER BY c.name, n.name
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn list_admin_nominations(pool: &DbPool) -> Result<Vec<NominationOverview>, Error> {
    sqlx::query_as::<_, NominationOverview>(
        r#"
        SELECT n.id, n.name, n.description, c.name AS category, n.image_url,
               c.end_time, n.created_at
        FROM nominations n
        JOIN categories c ON c.id = n.category_id
        WHERE n.deleted_at IS NULL
        ORDER BY n.created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn list_deleted_nominations(pool: &DbPool) -> Result<Vec<DeletedNomination>, Error> {
    sqlx::query_as::<_, DeletedNomination>(
        r#"
        SELECT n.id, n.name, n.description, c.name AS category, n.deleted_at
        FROM nominations n
        JOIN categories c ON c.id = n.category_id
        WHERE n.deleted_at IS NOT NULL
        ORDER BY n.deleted_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn soft_delete_nomination(pool: &DbPool, nomination_id: i32) -> Result<u64, Error> {
    let result = sqlx::query("UPDATE nominations SET deleted_at = NOW() WHERE id = $1")
        .bind(nomination_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn restore_nomination(pool: &DbPool, nomination_id: i32) -> Result<u64, Error> {
    let result = sqlx::query("UPDATE nominations SET deleted_at = NULL WHERE id = $1")
        .bind(nomination_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// One statement, one timestamp; ids with no matching row are skipped.
pub async fn bulk_soft_delete_nominations(pool: &DbPool, ids: &[i32]) -> Result<u64, Error> {
    let result = sqlx::query("UPDATE nominations SET deleted_at = NOW() WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
