use crate::db::connection::DbPool;
use crate::db::models::SystemSetting;
use sqlx::Error;

pub async fn get_setting(pool: &DbPool, key: &str) -> Result<Option<String>, Error> {
    sqlx::query_scalar("SELECT setting_value FROM system_settings WHERE setting_key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map(Option::flatten)
}

pub async fn set_setting(pool: &DbPool, key: &str, value: &str) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO system_settings (setting_key, setting_value, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (setting_key)
        DO UPDATE SET setting_value = EXCLUDED.setting_value, updated_at = NOW()
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_settings(pool: &DbPool) -> Result<Vec<SystemSetting>, Error> {
    sqlx::query_as::<_, SystemSetting>(
        r#"
        SELECT id, setting_key, setting_value, description, updated_at
        FROM system_settings
        ORDER BY setting_key
        "#,
    )
    .fetch_all(pool)
    .await
}
