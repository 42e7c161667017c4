// src/handlers/topics.rs

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

/// Every topic with the current user's progress.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let topics = state.topics.get_topics_with_progress(user.id).await?;
    Ok(Json(Envelope::ok(json!({ "topics": topics }))))
}

pub async fn start(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(topic_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = state.topics.start_topic_test(user.id, topic_id).await?;
    Ok(Json(Envelope::ok(attempt)))
}

pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((topic_id, attempt_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let view = state
        .topics
        .get_attempt(user.id, topic_id, attempt_id)
        .await?;
    Ok(Json(Envelope::ok(view)))
}

pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((topic_id, attempt_id)): Path<(i64, i64)>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .topics
        .submit_answer(user.id, topic_id, attempt_id, payload)
        .await?;
    Ok(Json(Envelope::ok(result)))
}

pub async fn finish(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((topic_id, attempt_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .topics
        .finish_attempt(user.id, topic_id, attempt_id)
        .await?;
    Ok(Json(Envelope::ok(outcome)))
}

pub async fn results(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((topic_id, attempt_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let results = state
        .topics
        .get_attempt_results(user.id, topic_id, attempt_id)
        .await?;
    Ok(Json(Envelope::ok(results)))
}
