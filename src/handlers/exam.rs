// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::{Envelope, attempt::SubmitAnswerRequest, user::User},
    state::AppState,
};

/// Starts a new 20-question exam for the current user.
pub async fn start(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let exam = state.exams.start_exam(user.id).await?;
    Ok(Json(Envelope::ok(exam)))
}

pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .exams
        .submit_answer(user.id, attempt_id, payload)
        .await?;
    Ok(Json(Envelope::ok(result)))
}

pub async fn finish(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.exams.complete_exam(user.id, attempt_id).await?;
    Ok(Json(Envelope::ok(outcome)))
}

pub async fn results(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let results = state.exams.get_results(user.id, attempt_id).await?;
    Ok(Json(Envelope::ok(results)))
}

/// Aggregated statistics over the user's completed attempts.
pub async fn stats(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.exams.get_user_stats(user.id).await?;
    Ok(Json(Envelope::ok(json!({ "stats": stats }))))
}
