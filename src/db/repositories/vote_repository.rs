use crate::db::connection::DbPool;
use serde::Serialize;
use sqlx::Error;
use sqlx::types::chrono::{DateTime, Utc};

/// Everything the vote path needs to decide whether a ballot counts: the
/// category's end time, its name for the error message, and the store's
/// clock read in the same statement.
#[derive(Debug, sqlx::FromRow)]
pub struct VoteTarget {
    pub end_time: Option<DateTime<Utc>>,
    pub category_name: String,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct NominationResult {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub image_url: Option<String>,
    pub vote_count: i64,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct VoterRow {
    pub nomination_id: i32,
    pub username: String,
}

/// Soft-deleted nominations (and nominations of trashed categories) are not
/// votable; they resolve to `None` here.
pub async fn resolve_vote_target(
    pool: &DbPool,
    nomination_id: i32,
) -> Result<Option<VoteTarget>, Error> {
    sqlx::query_as::<_, VoteTarget>(
        r#"
        SELECT c.end_time, c.name AS category_name, NOW() AS now
        FROM nominations n
        JOIN categories c ON c.id = n.category_id
        WHERE n.id = $1 AND n.deleted_at IS NULL AND c.deleted_at IS NULL
        "#,
    )
    .bind(nomination_id)
    .fetch_optional(pool)
    .await
}

/// Upsert on `(user_id, nomination_id)`: voting again replaces the earlier
/// ballot in a single atomic statement, last vote counts.
pub async fn cast_vote(pool: &DbPool, user_id: i32, nomination_id: i32) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO votes (user_id, nomination_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, nomination_id) DO UPDATE SET created_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(nomination_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_results(pool: &DbPool) -> Result<Vec<NominationResult>, Error> {
    sqlx::query_as::<_, NominationResult>(
        r#"
        SELECT n.id, n.name, n.description, c.name AS category, n.image_url,
               COUNT(v.id) AS vote_count, c.end_time
        FROM nominations n
        JOIN categories c ON c.id = n.category_id
        LEFT JOIN votes v ON v.nomination_id = n.id
        WHERE n.deleted_at IS NULL AND c.deleted_at IS NULL
        GROUP BY n.id, c.name, c.end_time
        ORDER BY c.name, vote_count DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn list_voters(pool: &DbPool) -> Result<Vec<VoterRow>, Error> {
    sqlx::query_as::<_, VoterRow>(
        r#"
        SELECT v.nomination_id, u.username
        FROM votes v
        JOIN users u ON u.id = v.user_id
        ORDER BY v.created_at
        "#,
    )
    .fetch_all(pool)
    .await
}
