use crate::db::connection::DbPool;
use crate::db::models::User;
use sqlx::Error;

pub async fn find_user_by_username(pool: &DbPool, username: &str) -> Result<Option<User>, Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, email, role, is_active,
               last_login, login_count, created_at, updated_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn create_user(
    pool: &DbPool,
    username: &str,
    password_hash: &str,
    email: &str,
) -> Result<i32, Error> {
    sqlx::query_scalar(
        "INSERT INTO users (username, password_hash, email) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(username)
    .bind(password_hash)
    .bind(email)
    .fetch_one(pool)
    .await
}

pub async fn record_login(pool: &DbPool, user_id: i32) -> Result<(), Error> {
    sqlx::query(
        r#"
        UPDATE users
        SET last_login = NOW(), login_count = login_count + 1, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}
