// src/handlers/questions.rs
//
// Question management. Admin only.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{Envelope, question::CreateQuestionRequest},
    repositories::{questions, topics},
    services::{
        question_set::question_image_url,
        uploads::{ImageKind, read_image},
    },
    state::AppState,
};

/// Creates a question with its answers and bumps the topic counter,
/// all in one transaction.
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = state.pool.begin().await?;

    if topics::find_by_id(&mut *tx, payload.topic_id).await?.is_none() {
        return Err(AppError::NotFound("Тема не найдена".to_string()));
    }

    let question = questions::create_with_answers(&mut *tx, &payload)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question: {:?}", e);
            AppError::from(e)
        })?;
    let answers = questions::answers_for(&mut *tx, &[question.id]).await?;

    tx.commit().await?;
    tracing::info!("Question {} created in topic {}", question.id, question.topic_id);

    let answers: Vec<_> = answers
        .into_iter()
        .map(|a| json!({ "id": a.id, "text": a.text, "isCorrect": a.is_correct }))
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(json!({
            "question": {
                "id": question.id,
                "topicId": question.topic_id,
                "text": question.text,
                "isHard": question.is_hard,
                "imageUrl": null,
                "answers": answers,
            }
        }))),
    ))
}

/// Attaches an illustration to an existing question, replacing any previous one.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let question = questions::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Вопрос не найден".to_string()))?;

    let image = read_image(&mut multipart, ImageKind::Question).await?;
    let file_name = state.images.save(ImageKind::Question, &image).await?;

    if let Err(e) = questions::set_image(&state.pool, question.id, &file_name).await {
        state.images.remove(ImageKind::Question, &file_name).await;
        return Err(e.into());
    }

    if let Some(previous) = question.image_url.as_deref() {
        state.images.remove(ImageKind::Question, previous).await;
    }

    tracing::info!("Question {} image set to {}", question.id, file_name);

    Ok(Json(Envelope::ok(json!({
        "imageUrl": question_image_url(&state.config, Some(&file_name)),
    }))))
}
