// src/services/auth.rs

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::{Config, RESET_TOKEN_TTL_MINUTES, VERIFICATION_TOKEN_TTL_HOURS},
    error::AppError,
    models::{
        token::{EmailRequest, ResetPasswordRequest},
        user::{ChangePasswordRequest, LoginRequest, ROLE_ADMIN, ROLE_USER, RegisterRequest, User},
    },
    repositories::{is_unique_violation, tokens, users},
    services::mailer::{Mailer, password_reset_email, verification_email},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
        token::generate_token,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration, email verification, login and password lifecycle.
#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    config: Config,
    mailer: Arc<dyn Mailer>,
}

impl AuthService {
    pub fn new(pool: PgPool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            pool,
            config,
            mailer,
        }
    }

    /// Creates an unverified account and mails the verification link.
    ///
    /// An unverified account with the same email is replaced. Nothing is
    /// committed unless the email was handed to the transport.
    pub async fn register(&self, req: RegisterRequest) -> Result<User, AppError> {
        req.validate()?;
        let email = normalize_email(&req.email);

        let mut tx = self.pool.begin().await?;

        if let Some(existing) = users::find_by_email(&mut *tx, &email).await? {
            if existing.is_verified {
                return Err(AppError::EmailExists);
            }
            tracing::info!("Replacing unverified account {}", existing.id);
            users::delete(&mut *tx, existing.id).await?;
        }

        let password_hash = hash_password(&req.password)?;
        let user = users::create(&mut *tx, &email, &password_hash, ROLE_USER, false)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::EmailExists
                } else {
                    AppError::from(e)
                }
            })?;

        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS);
        tokens::create_verification(&mut *tx, user.id, &token, expires_at).await?;

        self.mailer
            .send(verification_email(&self.config, &user.email, &token)?)
            .await?;

        tx.commit().await?;
        tracing::info!("User {} registered, verification email sent", user.id);
        Ok(user)
    }

    pub async fn verify_email(&self, token: &str) -> Result<VerifyOutcome, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::InvalidToken);
        }

        let mut tx = self.pool.begin().await?;

        let record = tokens::find_verification_for_update(&mut *tx, token)
            .await?
            .ok_or(AppError::InvalidToken)?;

        let user = users::find_by_id(&mut *tx, record.user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;

        let now = Utc::now();
        if record.is_expired(now) {
            tokens::delete_verification(&mut *tx, record.id).await?;
            tx.commit().await?;
            return Err(AppError::TokenExpired);
        }

        // A used link keeps answering until it expires.
        let outcome = if user.is_verified {
            tokens::mark_verification_used(&mut *tx, record.id, now).await?;
            VerifyOutcome::AlreadyVerified
        } else {
            users::mark_verified(&mut *tx, user.id).await?;
            tokens::mark_verification_used(&mut *tx, record.id, now).await?;
            VerifyOutcome::Verified
        };

        tx.commit().await?;
        tracing::info!("Email verification for user {}: {:?}", user.id, outcome);
        Ok(outcome)
    }

    /// Replaces any outstanding verification tokens with a fresh one.
    pub async fn resend_verification(&self, req: EmailRequest) -> Result<(), AppError> {
        req.validate()?;
        let email = normalize_email(&req.email);

        let mut tx = self.pool.begin().await?;

        let user = users::find_by_email(&mut *tx, &email)
            .await?
            .ok_or_else(|| AppError::NotFound("Пользователь не найден".to_string()))?;

        if user.is_verified {
            return Err(AppError::BadRequest("Email уже подтверждён".to_string()));
        }

        tokens::delete_verifications_for_user(&mut *tx, user.id).await?;

        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS);
        tokens::create_verification(&mut *tx, user.id, &token, expires_at).await?;

        self.mailer
            .send(verification_email(&self.config, &user.email, &token)?)
            .await?;

        tx.commit().await?;
        tracing::info!("Verification email re-sent to user {}", user.id);
        Ok(())
    }

    /// Returns a session token and the authenticated user.
    ///
    /// Verification is checked before the password so that an unverified
    /// user gets the specific "verify your email" answer.
    pub async fn login(&self, req: LoginRequest) -> Result<(String, User), AppError> {
        req.validate()?;
        let email = normalize_email(&req.email);

        let user = users::find_by_email(&self.pool, &email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !user.is_verified {
            let has_active_token =
                tokens::has_active_verification(&self.pool, user.id, Utc::now()).await?;
            return Err(AppError::EmailNotVerified { has_active_token });
        }

        if !verify_password(&req.password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let token = sign_jwt(&user, &self.config.jwt_secret, self.config.jwt_expiration)?;
        tracing::info!("User {} logged in", user.id);
        Ok((token, user))
    }

    /// Always succeeds for well-formed input so callers cannot probe which
    /// emails are registered.
    pub async fn forgot_password(&self, req: EmailRequest) -> Result<(), AppError> {
        req.validate()?;
        let email = normalize_email(&req.email);

        let mut tx = self.pool.begin().await?;

        let Some(user) = users::find_by_email(&mut *tx, &email).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(());
        };

        tokens::delete_resets_for_user(&mut *tx, user.id).await?;

        let token = generate_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        tokens::create_reset(&mut *tx, user.id, &token, expires_at).await?;

        self.mailer
            .send(password_reset_email(&self.config, &user.email, &token)?)
            .await?;

        tx.commit().await?;
        tracing::info!("Password reset token issued for user {}", user.id);
        Ok(())
    }

    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), AppError> {
        req.validate()?;

        let mut tx = self.pool.begin().await?;

        let record = tokens::find_reset_for_update(&mut *tx, req.token.trim())
            .await?
            .ok_or(AppError::InvalidToken)?;

        record.ensure_usable(Utc::now())?;

        let password_hash = hash_password(&req.new_password)?;
        users::update_password(&mut *tx, record.user_id, &password_hash).await?;
        tokens::mark_reset_used(&mut *tx, record.id).await?;

        tx.commit().await?;
        tracing::info!("Password reset for user {}", record.user_id);
        Ok(())
    }

    pub async fn change_password(
        &self,
        user: &User,
        req: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        req.validate()?;

        if !verify_password(&req.current_password, &user.password_hash)? {
            return Err(AppError::InvalidCurrentPassword);
        }

        let password_hash = hash_password(&req.new_password)?;
        users::update_password(&self.pool, user.id, &password_hash).await?;
        tracing::info!("Password changed for user {}", user.id);
        Ok(())
    }

    /// Creates a verified admin account unless the email is already taken.
    pub async fn seed_admin(&self, email: &str, password: &str) -> Result<(), AppError> {
        let email = normalize_email(email);
        if users::find_by_email(&self.pool, &email).await?.is_some() {
            return Ok(());
        }

        tracing::info!("Seeding admin user: {}", email);
        let password_hash = hash_password(password)?;
        users::create(&self.pool, &email, &password_hash, ROLE_ADMIN, true).await?;
        tracing::info!("Admin user created successfully.");
        Ok(())
    }
}
