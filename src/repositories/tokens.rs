// src/repositories/tokens.rs

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::models::token::{EmailVerificationToken, PasswordResetToken};

pub async fn create_verification<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO email_verification_tokens (user_id, token, expires_at) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(token)
    .bind(expires_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Locks the token row so two concurrent verifications cannot both consume it.
pub async fn find_verification_for_update<'e, E: PgExecutor<'e>>(
    executor: E,
    token: &str,
) -> Result<Option<EmailVerificationToken>, sqlx::Error> {
    sqlx::query_as::<_, EmailVerificationToken>(
        r#"
        SELECT id, user_id, token, expires_at, used_at, created_at
        FROM email_verification_tokens
        WHERE token = $1
        FOR UPDATE
        "#,
    )
    .bind(token)
    .fetch_optional(executor)
    .await
}

pub async fn has_active_verification<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM email_verification_tokens WHERE user_id = $1 AND used_at IS NULL AND expires_at > $2)",
    )
    .bind(user_id)
    .bind(now)
    .fetch_one(executor)
    .await
}

/// Marks the token consumed. The row stays so the link can be opened again.
pub async fn mark_verification_used<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    used_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE email_verification_tokens SET used_at = $1 WHERE id = $2 AND used_at IS NULL")
        .bind(used_at)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn delete_verification<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM email_verification_tokens WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn delete_verifications_for_user<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM email_verification_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn create_reset<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO password_reset_tokens (user_id, token, expires_at, is_used) VALUES ($1, $2, $3, FALSE)",
    )
    .bind(user_id)
    .bind(token)
    .bind(expires_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Used tokens are returned as well, so callers can tell "used" from "unknown".
pub async fn find_reset_for_update<'e, E: PgExecutor<'e>>(
    executor: E,
    token: &str,
) -> Result<Option<PasswordResetToken>, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        r#"
        SELECT id, user_id, token, expires_at, is_used, created_at
        FROM password_reset_tokens
        WHERE token = $1
        FOR UPDATE
        "#,
    )
    .bind(token)
    .fetch_optional(executor)
    .await
}

pub async fn mark_reset_used<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE password_reset_tokens SET is_used = TRUE WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn delete_resets_for_user<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}
