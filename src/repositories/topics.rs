// src/repositories/topics.rs

use sqlx::PgExecutor;

use crate::models::{
    attempt::AttemptStatus,
    progress::{PROGRESS_IN_PROGRESS, PROGRESS_NOT_STARTED, TopicProgress},
    topic::{Topic, TopicWithProgress},
};

const PROGRESS_COLUMNS: &str = r#"
    id, user_id, topic_id, status, last_attempt_id,
    questions_total, questions_answered, correct_answers, created_at, updated_at
"#;

pub async fn find_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<Topic>, sqlx::Error> {
    sqlx::query_as::<_, Topic>(
        "SELECT id, name, description, questions_count FROM topics WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Every topic, left-joined with the user's progress row and last attempt.
pub async fn list_with_progress<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
) -> Result<Vec<TopicWithProgress>, sqlx::Error> {
    sqlx::query_as::<_, TopicWithProgress>(
        r#"
        SELECT
            t.id,
            t.name,
            t.description,
            t.questions_count,
            COALESCE(tp.status, $2) AS status,
            COALESCE(tp.correct_answers, 0) AS correct_answers,
            COALESCE(tp.questions_answered, 0) AS questions_answered,
            COALESCE(tp.questions_total, t.questions_count) AS questions_total,
            a.completed_at AS last_attempt_date
        FROM topics t
        LEFT JOIN topic_progress tp ON tp.topic_id = t.id AND tp.user_id = $1
        LEFT JOIN test_attempts a ON a.id = tp.last_attempt_id
        ORDER BY t.id
        "#,
    )
    .bind(user_id)
    .bind(PROGRESS_NOT_STARTED)
    .fetch_all(executor)
    .await
}

/// Creates the (user, topic) progress row on first use; keeps an existing one.
pub async fn ensure_progress<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    topic_id: i64,
    questions_total: i32,
) -> Result<TopicProgress, sqlx::Error> {
    sqlx::query_as::<_, TopicProgress>(&format!(
        r#"
        INSERT INTO topic_progress (user_id, topic_id, status, questions_total)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, topic_id)
        DO UPDATE SET questions_total = EXCLUDED.questions_total, updated_at = NOW()
        RETURNING {PROGRESS_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(topic_id)
    .bind(PROGRESS_NOT_STARTED)
    .bind(questions_total)
    .fetch_one(executor)
    .await
}

/// Overwrites the running counters with values recounted from the answer log.
pub async fn set_progress_counts<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    topic_id: i64,
    questions_answered: i32,
    correct_answers: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE topic_progress SET
            status = $3,
            questions_answered = $4,
            correct_answers = $5,
            updated_at = NOW()
        WHERE user_id = $1 AND topic_id = $2
        "#,
    )
    .bind(user_id)
    .bind(topic_id)
    .bind(PROGRESS_IN_PROGRESS)
    .bind(questions_answered)
    .bind(correct_answers)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn finish_progress<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    topic_id: i64,
    status: AttemptStatus,
    attempt_id: i64,
    questions_answered: i32,
    correct_answers: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE topic_progress SET
            status = $3,
            last_attempt_id = $4,
            questions_answered = $5,
            correct_answers = $6,
            updated_at = NOW()
        WHERE user_id = $1 AND topic_id = $2
        "#,
    )
    .bind(user_id)
    .bind(topic_id)
    .bind(status.as_str())
    .bind(attempt_id)
    .bind(questions_answered)
    .bind(correct_answers)
    .execute(executor)
    .await?;
    Ok(())
}
