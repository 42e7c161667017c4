// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub topic_id: i64,

    /// The text content of the question.
    pub text: String,

    /// File name under `uploads/questions`, if an illustration was uploaded.
    pub image_url: Option<String>,

    pub is_hard: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'answers' table. `is_correct` must never reach the client
/// before the question has been answered.
#[derive(Debug, Clone, FromRow)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// Answer option as sent to the client (no correctness flag).
#[derive(Debug, Clone, Serialize)]
pub struct PublicAnswer {
    pub id: i64,
    pub text: String,
}

/// DTO for sending a question to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub image_url: Option<String>,
    pub answers: Vec<PublicAnswer>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnswerRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for creating a new question together with its answer options.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub topic_id: i64,
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[serde(default)]
    pub is_hard: bool,
    #[validate(nested, custom(function = validate_answers))]
    pub answers: Vec<CreateAnswerRequest>,
}

/// Every question needs at least two options and exactly one correct one,
/// otherwise grading would be ambiguous.
fn validate_answers(answers: &[CreateAnswerRequest]) -> Result<(), validator::ValidationError> {
    if answers.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_answers"));
    }
    let correct = answers.iter().filter(|a| a.is_correct).count();
    if correct != 1 {
        return Err(validator::ValidationError::new("exactly_one_correct_answer"));
    }
    Ok(())
}
