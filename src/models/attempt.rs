// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::question::PublicQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Exam,
    Topic,
    Hard,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Exam => "exam",
            TestType::Topic => "topic",
            TestType::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Passed,
    Failed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Passed => "passed",
            AttemptStatus::Failed => "failed",
        }
    }

    pub fn from_passed(passed: bool) -> Self {
        if passed {
            AttemptStatus::Passed
        } else {
            AttemptStatus::Failed
        }
    }
}

/// Represents the 'test_attempts' table in the database.
/// Mutable while `in_progress`, frozen once passed or failed.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAttempt {
    pub id: i64,
    pub user_id: i64,
    pub test_type: String,
    pub status: String,
    pub topic_id: Option<i64>,
    pub total_questions: i32,
    pub base_questions_count: i32,
    pub additional_questions_answered: i32,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub time_spent_seconds: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TestAttempt {
    pub fn is_in_progress(&self) -> bool {
        self.status == AttemptStatus::InProgress.as_str()
    }

    pub fn is_completed(&self) -> bool {
        !self.is_in_progress()
    }

    /// Whole seconds elapsed since the attempt started.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i32 {
        (now - self.started_at).num_seconds().clamp(0, i32::MAX as i64) as i32
    }
}

/// Running tally recounted from `user_answers`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct AnswerTally {
    pub answered: i64,
    pub correct: i64,
}

impl AnswerTally {
    pub fn incorrect(&self) -> i64 {
        self.answered - self.correct
    }
}

/// One row of a per-question breakdown.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnswerBreakdown {
    pub question_id: i64,
    pub question_text: String,
    #[serde(skip_serializing)]
    pub image_file: Option<String>,
    #[sqlx(skip)]
    pub image_url: Option<String>,
    pub user_answer_id: i64,
    pub user_answer_text: String,
    pub is_correct: bool,
    pub correct_answer_id: Option<i64>,
    pub correct_answer_text: Option<String>,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    pub answer_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExamResponse {
    pub attempt_id: i64,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTopicResponse {
    pub attempt_id: i64,
    pub topic_id: i64,
    pub topic_name: String,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Serialize)]
pub struct AttemptProgress {
    pub answered: i64,
    pub total: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicAttemptView {
    pub attempt_id: i64,
    pub topic_id: i64,
    pub topic_name: String,
    pub status: String,
    pub questions: Vec<PublicQuestion>,
    pub progress: AttemptProgress,
}

/// Result of a single answer submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub is_correct: bool,
    /// Only present when the submitted answer was wrong.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer_id: Option<i64>,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub answered: i64,
    pub total_questions: i32,
    /// Present when the answer triggered the exam extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_questions: Option<Vec<PublicQuestion>>,
}

/// Final outcome of a completed attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    pub attempt_id: i64,
    pub status: String,
    pub passed: bool,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub total_questions: i32,
    pub time_spent: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResults {
    pub attempt_id: i64,
    pub test_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,
    pub status: String,
    pub passed: bool,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub total_questions: i32,
    pub time_spent: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Vec<AnswerBreakdown>,
}

/// Summary of the most recent completed exam.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastAttemptSummary {
    pub attempt_id: i64,
    pub status: String,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub time_spent: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamStats {
    pub total_attempts: usize,
    pub passed_attempts: usize,
    pub average_score: i64,
    pub average_time: i64,
    pub last_attempt: Option<LastAttemptSummary>,
}

#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_attempts: usize,
    pub average_score: i64,
    pub average_time: i64,
    pub exam: ExamStats,
}
