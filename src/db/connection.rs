use sqlx::postgres::PgPoolOptions;
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::warn;

pub type DbPool = Pool<Postgres>;

pub async fn init_db(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .max_lifetime(Duration::from_secs(30 * 60))
        .idle_timeout(Duration::from_secs(10 * 60))
        .connect(database_url)
        .await?;

    create_tables(&pool).await?;
    seed_defaults(&pool).await?;

    Ok(pool)
}

async fn create_tables(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            username VARCHAR(255) NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            email VARCHAR(255) NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'user',
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            last_login TIMESTAMPTZ,
            login_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // No stored status column: voting status is always derived from end_time.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            description TEXT,
            end_time TIMESTAMPTZ,
            max_nominations INTEGER NOT NULL DEFAULT 10,
            deleted_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nominations (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            description TEXT,
            category_id INTEGER NOT NULL REFERENCES categories(id),
            image_url TEXT,
            created_by INTEGER REFERENCES users(id),
            deleted_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS votes (
            id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            nomination_id INTEGER NOT NULL REFERENCES nominations(id) ON DELETE CASCADE,
            ip_address TEXT,
            user_agent TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE(user_id, nomination_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS suggestions (
            id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            type TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activity_logs (
            id SERIAL PRIMARY KEY,
            user_id INTEGER REFERENCES users(id),
            action TEXT NOT NULL,
            table_name TEXT,
            record_id INTEGER,
            old_values TEXT,
            new_values TEXT,
            ip_address TEXT,
            user_agent TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS system_settings (
            id SERIAL PRIMARY KEY,
            setting_key TEXT NOT NULL UNIQUE,
            setting_value TEXT,
            description TEXT,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_nominations_category_id ON nominations(category_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_votes_nomination_id ON votes(nomination_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_votes_user_id ON votes(user_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_suggestions_user_id ON suggestions(user_id)
        "#,
    )
    .execute(pool)
    .await?;

    // One active nomination per (name, category). Fails on a database that
    // still holds duplicates; clean-duplicates brings it back in line.
    if let Err(e) = sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_nominations_active_name
        ON nominations(name, category_id) WHERE deleted_at IS NULL
        "#,
    )
    .execute(pool)
    .await
    {
        warn!(
            "could not create unique nomination index, run clean-duplicates: {}",
            e
        );
    }

    Ok(())
}

async fn seed_defaults(pool: &DbPool) -> Result<(), sqlx::Error> {
    let admin_password = bcrypt::hash("admin123", bcrypt::DEFAULT_COST)
        .map_err(|e| sqlx::Error::Protocol(format!("bcrypt failure: {e}")))?;
    sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, email, role)
        VALUES ($1, $2, $3, 'admin')
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind("admin")
    .bind(&admin_password)
    .bind("admin@example.com")
    .execute(pool)
    .await?;

    let user_password = bcrypt::hash("user123", bcrypt::DEFAULT_COST)
        .map_err(|e| sqlx::Error::Protocol(format!("bcrypt failure: {e}")))?;
    sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, email, role)
        VALUES ($1, $2, $3, 'user')
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind("user")
    .bind(&user_password)
    .bind("user@example.com")
    .execute(pool)
    .await?;

    let default_categories = [
        "Information Technology",
        "Electronics and Materials",
        "Chemistry",
        "Biology",
        "Geography and Geology",
        "Political Theory",
        "Journalism and Communication",
        "Environment",
        "Architecture",
    ];

    for category in default_categories {
        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(category)
            .execute(pool)
            .await?;
    }

    let default_settings = [
        ("max_votes_per_user", "1", "Maximum votes per user per nomination"),
        ("voting_enabled", "true", "Enable or disable voting"),
        ("registration_enabled", "true", "Enable or disable registration"),
        ("maintenance_mode", "false", "Maintenance mode"),
        ("session_timeout", "3600", "Session timeout in seconds"),
        ("max_login_attempts", "5", "Maximum login attempts"),
        ("backup_interval", "86400", "Automatic backup interval in seconds"),
    ];

    for (key, value, description) in default_settings {
        sqlx::query(
            r#"
            INSERT INTO system_settings (setting_key, setting_value, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (setting_key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(description)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Store-side clock, used so expiry checks agree with query-level `NOW()`.
pub async fn store_now(pool: &DbPool) -> Result<DateTime<Utc>, sqlx::Error> {
    sqlx::query_scalar("SELECT NOW()").fetch_one(pool).await
}

pub async fn get_pool_stats(pool: &DbPool) -> Result<String, sqlx::Error> {
    let size = pool.size() as usize;
    let num_idle = pool.num_idle();
    Ok(format!(
        "Pool stats: size={}, idle={}, available={}",
        size,
        num_idle,
        size - num_idle
    ))
}
