// src/repositories/users.rs

use sqlx::PgExecutor;

use crate::models::user::{AdminStats, User};

const USER_COLUMNS: &str =
    "id, email, password_hash, role, is_verified, avatar, created_at, updated_at";

pub async fn find_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_email<'e, E: PgExecutor<'e>>(
    executor: E,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(executor)
    .await
}

pub async fn create<'e, E: PgExecutor<'e>>(
    executor: E,
    email: &str,
    password_hash: &str,
    role: &str,
    is_verified: bool,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (email, password_hash, role, is_verified)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(is_verified)
    .fetch_one(executor)
    .await
}

/// Hard delete. Tokens, attempts and progress rows cascade.
pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn mark_verified<'e, E: PgExecutor<'e>>(executor: E, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET is_verified = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn update_password<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(password_hash)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn update_avatar<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    avatar: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET avatar = $1, updated_at = NOW() WHERE id = $2")
        .bind(avatar)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn list_all<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY id DESC"
    ))
    .fetch_all(executor)
    .await
}

pub async fn admin_stats<'e, E: PgExecutor<'e>>(executor: E) -> Result<AdminStats, sqlx::Error> {
    sqlx::query_as::<_, AdminStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM users WHERE is_verified) AS verified_users,
            (SELECT COUNT(*) FROM users WHERE role = 'admin') AS admin_users,
            (SELECT COUNT(*) FROM test_attempts) AS total_attempts,
            (SELECT COUNT(*) FROM test_attempts WHERE status = 'in_progress') AS in_progress_attempts,
            (SELECT COUNT(*) FROM test_attempts WHERE status = 'passed') AS passed_attempts,
            (SELECT COUNT(*) FROM test_attempts WHERE status = 'failed') AS failed_attempts,
            (SELECT COUNT(*) FROM test_attempts WHERE test_type = 'exam') AS exam_attempts,
            (SELECT COUNT(*) FROM test_attempts WHERE test_type = 'topic') AS topic_attempts
        "#,
    )
    .fetch_one(executor)
    .await
}
