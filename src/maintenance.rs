use crate::auth::require_admin;
use crate::db::connection::DbPool;
use crate::db::repositories as db;
use crate::error::AdminError;
use crate::startup::AppState;
use axum::{Json, extract::Extension};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::types::chrono::DateTime;
use std::path::Path;
use tower_sessions::Session;
use tracing::{info, warn};

const BACKUP_DIR: &str = "backups";

const BACKUP_TABLES: [&str; 7] = [
    "users",
    "categories",
    "nominations",
    "votes",
    "suggestions",
    "activity_logs",
    "system_settings",
];

#[derive(Debug, Serialize)]
pub struct DatabaseStats {
    pub active_users: i64,
    pub active_categories: i64,
    pub active_nominations: i64,
    pub total_votes: i64,
    pub pending_suggestions: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NominationRecord {
    pub id: i32,
    pub name: String,
    pub category_id: i32,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, PartialEq)]
struct ReconcilePlan {
    soft_delete: Vec<i32>,
    purge: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileOutcome {
    pub soft_deleted: u64,
    pub purged: u64,
}

async fn count(pool: &DbPool, sql: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(sql).fetch_one(pool).await
}

pub async fn get_stats(pool: &DbPool) -> Result<DatabaseStats, sqlx::Error> {
    let (active_users, active_categories, active_nominations, total_votes, pending_suggestions) =
        futures::try_join!(
            count(pool, "SELECT COUNT(*) FROM users WHERE is_active = TRUE"),
            count(pool, "SELECT COUNT(*) FROM categories WHERE deleted_at IS NULL"),
            count(pool, "SELECT COUNT(*) FROM nominations WHERE deleted_at IS NULL"),
            count(pool, "SELECT COUNT(*) FROM votes"),
            count(pool, "SELECT COUNT(*) FROM suggestions WHERE status = 'pending'"),
        )?;

    Ok(DatabaseStats {
        active_users,
        active_categories,
        active_nominations,
        total_votes,
        pending_suggestions,
    })
}

async fn export_table(pool: &DbPool, table: &str) -> Result<Value, sqlx::Error> {
    // Table names come from the fixed list above, never from input.
    let sql = format!(
        "SELECT COALESCE(json_agg(row_to_json(t)), '[]'::json) FROM {} t",
        table
    );
    sqlx::query_scalar(&sql).fetch_one(pool).await
}

/// Point-in-time JSON export of every table, written to a timestamped file.
pub async fn backup_database(pool: &DbPool) -> Result<String, AdminError> {
    let mut dump = serde_json::Map::new();
    for table in BACKUP_TABLES {
        dump.insert(table.to_string(), export_table(pool, table).await?);
    }

    tokio::fs::create_dir_all(BACKUP_DIR)
        .await
        .map_err(|e| AdminError::Database(format!("backup directory: {}", e)))?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
    let file = Path::new(BACKUP_DIR)
        .join(format!("voting_backup_{}.json", timestamp))
        .to_string_lossy()
        .into_owned();

    let contents = serde_json::to_string_pretty(&Value::Object(dump))
        .map_err(|e| AdminError::Database(format!("backup serialization: {}", e)))?;

    tokio::fs::write(&file, contents)
        .await
        .map_err(|e| AdminError::Database(format!("backup write: {}", e)))?;

    info!("database backed up to {}", file);
    Ok(file)
}

/// Duplicate groups share `(name, category_id)`. A group with more than one
/// active row keeps its lowest id and soft-deletes the rest; a group where
/// every row is already deleted keeps one and purges the others. Rows must
/// arrive ordered by name, category and id.
fn plan_duplicates(rows: &[NominationRecord]) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    let mut start = 0;
    while start < rows.len() {
        let mut end = start + 1;
        while end < rows.len()
            && rows[end].name == rows[start].name
            && rows[end].category_id == rows[start].category_id
        {
            end += 1;
        }

        let group = &rows[start..end];
        if group.len() > 1 {
            let active: Vec<i32> = group
                .iter()
                .filter(|r| r.deleted_at.is_none())
                .map(|r| r.id)
                .collect();

            if active.len() > 1 {
                plan.soft_delete.extend(&active[1..]);
            } else if active.is_empty() {
                plan.purge.extend(group[1..].iter().map(|r| r.id));
            }
        }

        start = end;
    }

    plan
}

/// Idempotent: a second run over a reconciled table plans nothing.
pub async fn clean_duplicate_nominations(pool: &DbPool) -> Result<ReconcileOutcome, sqlx::Error> {
    let rows = sqlx::query_as::<_, NominationRecord>(
        r#"
        SELECT id, name, category_id, deleted_at
        FROM nominations
        ORDER BY name, category_id, id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let plan = plan_duplicates(&rows);

    let mut soft_deleted = 0;
    if !plan.soft_delete.is_empty() {
        soft_deleted = sqlx::query("UPDATE nominations SET deleted_at = NOW() WHERE id = ANY($1)")
            .bind(&plan.soft_delete)
            .execute(pool)
            .await?
            .rows_affected();
    }

    let mut purged = 0;
    if !plan.purge.is_empty() {
        purged = sqlx::query("DELETE FROM nominations WHERE id = ANY($1)")
            .bind(&plan.purge)
            .execute(pool)
            .await?
            .rows_affected();
    }

    if soft_deleted > 0 || purged > 0 {
        info!(
            "duplicate cleanup: {} soft-deleted, {} purged",
            soft_deleted, purged
        );
    }

    Ok(ReconcileOutcome {
        soft_deleted,
        purged,
    })
}

/// GET /admin/stats
pub async fn stats(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Json<Value>, AdminError> {
    require_admin(&session).await?;

    let stats = get_stats(&app_state.db).await?;
    Ok(Json(json!({ "stats": stats })))
}

/// POST /admin/backup
pub async fn backup(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    let file = backup_database(&app_state.db).await?;
    let stats = get_stats(&app_state.db).await?;

    if let Err(e) = db::log_activity(
        &app_state.db,
        Some(user.id),
        "backup",
        "database",
        None,
        None,
        Some(&file),
    )
    .await
    {
        warn!("failed to log backup: {}", e);
    }

    Ok(Json(json!({
        "success": true,
        "file": file,
        "stats": stats,
    })))
}

/// POST /admin/maintenance/clean-duplicates
pub async fn clean_duplicates(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<Json<Value>, AdminError> {
    let user = require_admin(&session).await?;

    let outcome = clean_duplicate_nominations(&app_state.db).await?;

    if let Err(e) = db::log_activity(
        &app_state.db,
        Some(user.id),
        "clean_duplicates",
        "nominations",
        None,
        None,
        Some(&format!(
            "{} soft-deleted, {} purged",
            outcome.soft_deleted, outcome.purged
        )),
    )
    .await
    {
        warn!("failed to log duplicate cleanup: {}", e);
    }

    Ok(Json(json!({
        "success": true,
        "softDeleted": outcome.soft_deleted,
        "purged": outcome.purged,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: i32, name: &str, category_id: i32, deleted: bool) -> NominationRecord {
        NominationRecord {
            id,
            name: name.to_string(),
            category_id,
            deleted_at: deleted.then(|| Utc.timestamp_opt(1000, 0).unwrap()),
        }
    }

    #[test]
    fn keeps_one_active_row_per_group() {
        // Two active copies and one deleted copy of the same nomination.
        let rows = vec![
            record(1, "Ada", 1, false),
            record(2, "Ada", 1, false),
            record(3, "Ada", 1, true),
        ];

        let plan = plan_duplicates(&rows);
        assert_eq!(plan.soft_delete, vec![2]);
        assert!(plan.purge.is_empty());
    }

    #[test]
    fn purges_all_but_one_when_every_copy_is_deleted() {
        let rows = vec![
            record(4, "Grace", 1, true),
            record(5, "Grace", 1, true),
            record(6, "Grace", 1, true),
        ];

        let plan = plan_duplicates(&rows);
        assert!(plan.soft_delete.is_empty());
        assert_eq!(plan.purge, vec![5, 6]);
    }

    #[test]
    fn same_name_in_different_categories_is_not_a_duplicate() {
        let rows = vec![record(1, "Ada", 1, false), record(2, "Ada", 2, false)];

        assert_eq!(plan_duplicates(&rows), ReconcilePlan::default());
    }

    #[test]
    fn one_active_one_deleted_needs_nothing() {
        let rows = vec![record(1, "Ada", 1, false), record(2, "Ada", 1, true)];

        assert_eq!(plan_duplicates(&rows), ReconcilePlan::default());
    }

    #[test]
    fn planning_is_idempotent() {
        let mut rows = vec![
            record(1, "Ada", 1, false),
            record(2, "Ada", 1, false),
            record(3, "Ada", 1, true),
        ];

        let plan = plan_duplicates(&rows);
        for row in &mut rows {
            if plan.soft_delete.contains(&row.id) {
                row.deleted_at = Some(Utc.timestamp_opt(2000, 0).unwrap());
            }
        }
        rows.retain(|r| !plan.purge.contains(&r.id));

        assert_eq!(plan_duplicates(&rows), ReconcilePlan::default());
    }

    #[test]
    fn empty_table_plans_nothing() {
        assert_eq!(plan_duplicates(&[]), ReconcilePlan::default());
    }
}
