// src/models/progress.rs

use serde::Serialize;
use sqlx::FromRow;

pub const PROGRESS_NOT_STARTED: &str = "not_started";
pub const PROGRESS_IN_PROGRESS: &str = "in_progress";

/// Represents the 'topic_progress' table: one row per (user, topic).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    pub id: i64,
    pub user_id: i64,
    pub topic_id: i64,
    pub status: String,
    pub last_attempt_id: Option<i64>,
    pub questions_total: i32,
    pub questions_answered: i32,
    pub correct_answers: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
