// src/models/topic.rs

use serde::Serialize;
use sqlx::FromRow;

/// Represents the 'topics' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Denormalized number of questions, maintained on question creation.
    pub questions_count: i32,
}

/// A topic joined with the current user's progress row (if any).
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopicWithProgress {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub questions_count: i32,
    /// `not_started` when the user never opened the topic.
    pub status: String,
    pub correct_answers: i32,
    pub questions_answered: i32,
    pub questions_total: i32,
    pub last_attempt_date: Option<chrono::DateTime<chrono::Utc>>,
}
