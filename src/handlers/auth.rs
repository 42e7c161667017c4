// src/handlers/auth.rs
//
// Email verification and password reset endpoints under /api/auth.

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::{Value, json};

use crate::{
    error::AppError,
    models::{
        Envelope,
        token::{EmailRequest, ResetPasswordRequest, VerifyEmailRequest},
    },
    services::auth::VerifyOutcome,
    state::AppState,
};

/// Always answers with the same message, whether or not the email exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.forgot_password(payload).await?;

    Ok(Json(Envelope::ok(json!({
        "message": "Если email существует, письмо отправлено"
    }))))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.reset_password(payload).await?;

    Ok(Json(Envelope::ok(json!({ "message": "Пароль успешно обновлен" }))))
}

async fn verify(state: &AppState, token: &str) -> Result<Json<Envelope<Value>>, AppError> {
    let message = match state.auth.verify_email(token).await? {
        VerifyOutcome::Verified => "Email подтверждён!",
        VerifyOutcome::AlreadyVerified => "Email уже подтверждён",
    };

    Ok(Json(Envelope::ok(json!({ "message": message }))))
}

/// `GET /verify-email?token=...`, the form used by links in emails.
pub async fn verify_email_link(
    State(state): State<AppState>,
    Query(params): Query<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    verify(&state, &params.token).await
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    verify(&state, &payload.token).await
}

pub async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.resend_verification(payload).await?;

    Ok(Json(Envelope::ok(json!({ "message": "Письмо отправлено повторно" }))))
}
