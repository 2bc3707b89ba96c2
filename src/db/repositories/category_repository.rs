use crate::db::connection::DbPool;
use crate::db::models::Category;
use serde::Serialize;
use sqlx::Error;
use sqlx::types::chrono::{DateTime, Utc};

/// Active category with its live nomination count.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CategoryOverview {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
    pub max_nominations: i32,
    pub nomination_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DeletedCategory {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
    pub nomination_count: i64,
    pub deleted_at: DateTime<Utc>,
}

pub async fn create_category(
    pool: &DbPool,
    name: &str,
    end_time: Option<DateTime<Utc>>,
) -> Result<i32, Error> {
    sqlx::query_scalar("INSERT INTO categories (name, end_time) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(end_time)
        .fetch_one(pool)
        .await
}

pub async fn update_category_end_time(
    pool: &DbPool,
    category_id: i32,
    end_time: Option<DateTime<Utc>>,
) -> Result<u64, Error> {
    let result = sqlx::query("UPDATE categories SET end_time = $1, updated_at = NOW() WHERE id = $2")
        .bind(end_time)
        .bind(category_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn find_active_category_by_name(
    pool: &DbPool,
    name: &str,
) -> Result<Option<Category>, Error> {
    sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, description, end_time, max_nominations,
               deleted_at, created_at, updated_at
        FROM categories
        WHERE name = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn list_active_categories(pool: &DbPool) -> Result<Vec<CategoryOverview>, Error> {
    sqlx::query_as::<_, CategoryOverview>(
        r#"
        SELECT c.id, c.name, c.description, c.end_time, c.max_nominations,
               COUNT(n.id) AS nomination_count, c.created_at
        FROM categories c
        LEFT JOIN nominations n ON n.category_id = c.id AND n.deleted_at IS NULL
        WHERE c.deleted_at IS NULL
        GROUP BY c.id
        ORDER BY c.name
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Counts only the nominations still marked active; they go stale silently
/// when their category sits in the trash.
pub async fn list_deleted_categories(pool: &DbPool) -> Result<Vec<DeletedCategory>, Error> {
    sqlx::query_as::<_, DeletedCategory>(
        r#"
        SELECT c.id, c.name, c.description, c.end_time,
               COUNT(n.id) AS nomination_count, c.deleted_at
        FROM categories c
        LEFT JOIN nominations n ON n.category_id = c.id AND n.deleted_at IS NULL
        WHERE c.deleted_at IS NOT NULL
        GROUP BY c.id
        ORDER BY c.deleted_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn soft_delete_category(pool: &DbPool, category_id: i32) -> Result<u64, Error> {
    let result = sqlx::query("UPDATE categories SET deleted_at = NOW() WHERE id = $1")
        .bind(category_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn restore_category(pool: &DbPool, category_id: i32) -> Result<u64, Error> {
    let result = sqlx::query("UPDATE categories SET deleted_at = NULL WHERE id = $1")
        .bind(category_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
