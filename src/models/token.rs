// src/models/token.rs

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// Represents the 'email_verification_tokens' table.
#[derive(Debug, Clone, FromRow)]
pub struct EmailVerificationToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Set once the link has verified its account.
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EmailVerificationToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Represents the 'password_reset_tokens' table.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    /// A spent token stays spent even after it expires, so `used` is checked first.
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.is_used {
            return Err(AppError::TokenAlreadyUsed);
        }
        if self.expires_at < now {
            return Err(AppError::TokenExpired);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Некорректный email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, max = 255, message = "Токен обязателен"))]
    pub token: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Пароль должен содержать от 6 до 128 символов"
    ))]
    pub new_password: String,
}

/// Verification token, from either the query string (GET) or the body (POST).
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}
