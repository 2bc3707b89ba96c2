use crate::db::connection::DbPool;
use sqlx::Error;

pub async fn log_activity(
    pool: &DbPool,
    user_id: Option<i32>,
    action: &str,
    table_name: &str,
    record_id: Option<i32>,
    old_values: Option<&str>,
    new_values: Option<&str>,
) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO activity_logs (user_id, action, table_name, record_id, old_values, new_values)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(user_id)
    .bind(action)
    .bind(table_name)
    .bind(record_id)
    .bind(old_values)
    .bind(new_values)
    .execute(pool)
    .await?;

    Ok(())
}
