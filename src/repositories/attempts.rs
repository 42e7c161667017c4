// src/repositories/attempts.rs

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};

use crate::models::attempt::{AnswerBreakdown, AnswerTally, AttemptStatus, TestAttempt, TestType};

const ATTEMPT_COLUMNS: &str = r#"
    id, user_id, test_type, status, topic_id,
    total_questions, base_questions_count, additional_questions_answered,
    correct_answers, incorrect_answers, time_spent_seconds,
    started_at, completed_at
"#;

pub async fn create<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    test_type: TestType,
    topic_id: Option<i64>,
    question_count: i32,
) -> Result<TestAttempt, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        r#"
        INSERT INTO test_attempts
            (user_id, test_type, status, topic_id, total_questions, base_questions_count, started_at)
        VALUES ($1, $2, $3, $4, $5, $5, NOW())
        RETURNING {ATTEMPT_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(test_type.as_str())
    .bind(AttemptStatus::InProgress.as_str())
    .bind(topic_id)
    .bind(question_count)
    .fetch_one(executor)
    .await
}

pub async fn find_for_user<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    user_id: i64,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM test_attempts WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Same as `find_for_user` but takes a row lock until the transaction ends.
pub async fn lock_for_user<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    user_id: i64,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM test_attempts WHERE id = $1 AND user_id = $2 FOR UPDATE"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Records the question set handed out, continuing positions from `first_position`.
pub async fn assign_questions(
    conn: &mut PgConnection,
    attempt_id: i64,
    question_ids: &[i64],
    first_position: i32,
    is_additional: bool,
) -> Result<(), sqlx::Error> {
    for (offset, question_id) in question_ids.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO attempt_questions (attempt_id, question_id, position, is_additional)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(attempt_id)
        .bind(question_id)
        .bind(first_position + offset as i32)
        .bind(is_additional)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn is_question_assigned<'e, E: PgExecutor<'e>>(
    executor: E,
    attempt_id: i64,
    question_id: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM attempt_questions WHERE attempt_id = $1 AND question_id = $2)",
    )
    .bind(attempt_id)
    .bind(question_id)
    .fetch_one(executor)
    .await
}

pub async fn has_answer<'e, E: PgExecutor<'e>>(
    executor: E,
    attempt_id: i64,
    question_id: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM user_answers WHERE attempt_id = $1 AND question_id = $2)",
    )
    .bind(attempt_id)
    .bind(question_id)
    .fetch_one(executor)
    .await
}

pub async fn insert_user_answer<'e, E: PgExecutor<'e>>(
    executor: E,
    attempt_id: i64,
    question_id: i64,
    answer_id: i64,
    is_correct: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_answers (attempt_id, question_id, answer_id, is_correct)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(attempt_id)
    .bind(question_id)
    .bind(answer_id)
    .bind(is_correct)
    .execute(executor)
    .await?;
    Ok(())
}

/// Recounts the answer log for an attempt.
pub async fn tally<'e, E: PgExecutor<'e>>(
    executor: E,
    attempt_id: i64,
) -> Result<AnswerTally, sqlx::Error> {
    sqlx::query_as::<_, AnswerTally>(
        r#"
        SELECT
            COUNT(*) AS answered,
            COUNT(*) FILTER (WHERE is_correct) AS correct
        FROM user_answers
        WHERE attempt_id = $1
        "#,
    )
    .bind(attempt_id)
    .fetch_one(executor)
    .await
}

pub struct TallyUpdate {
    pub correct: i32,
    pub incorrect: i32,
    pub total_questions: i32,
    pub additional_answered: i32,
    pub time_spent_seconds: i32,
}

pub async fn update_tally<'e, E: PgExecutor<'e>>(
    executor: E,
    attempt_id: i64,
    update: &TallyUpdate,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE test_attempts SET
            correct_answers = $1,
            incorrect_answers = $2,
            total_questions = $3,
            additional_questions_answered = $4,
            time_spent_seconds = $5
        WHERE id = $6
        "#,
    )
    .bind(update.correct)
    .bind(update.incorrect)
    .bind(update.total_questions)
    .bind(update.additional_answered)
    .bind(update.time_spent_seconds)
    .bind(attempt_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Moves the attempt to its final status. Only touches in-progress rows.
pub async fn complete<'e, E: PgExecutor<'e>>(
    executor: E,
    attempt_id: i64,
    status: AttemptStatus,
    correct: i32,
    incorrect: i32,
    time_spent_seconds: i32,
    completed_at: DateTime<Utc>,
) -> Result<TestAttempt, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        r#"
        UPDATE test_attempts SET
            status = $1,
            correct_answers = $2,
            incorrect_answers = $3,
            time_spent_seconds = $4,
            completed_at = $5
        WHERE id = $6 AND status = 'in_progress'
        RETURNING {ATTEMPT_COLUMNS}
        "#
    ))
    .bind(status.as_str())
    .bind(correct)
    .bind(incorrect)
    .bind(time_spent_seconds)
    .bind(completed_at)
    .bind(attempt_id)
    .fetch_one(executor)
    .await
}

/// Per-question breakdown ordered by submission time.
pub async fn breakdown<'e, E: PgExecutor<'e>>(
    executor: E,
    attempt_id: i64,
) -> Result<Vec<AnswerBreakdown>, sqlx::Error> {
    sqlx::query_as::<_, AnswerBreakdown>(
        r#"
        SELECT
            q.id AS question_id,
            q.text AS question_text,
            q.image_url AS image_file,
            a.id AS user_answer_id,
            a.text AS user_answer_text,
            ua.is_correct,
            ca.id AS correct_answer_id,
            ca.text AS correct_answer_text,
            ua.created_at AS answered_at
        FROM user_answers ua
        JOIN questions q ON q.id = ua.question_id
        JOIN answers a ON a.id = ua.answer_id
        LEFT JOIN LATERAL (
            SELECT id, text FROM answers
            WHERE question_id = q.id AND is_correct
            ORDER BY id
            LIMIT 1
        ) ca ON TRUE
        WHERE ua.attempt_id = $1
        ORDER BY ua.created_at, ua.id
        "#,
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub async fn completed_for_user<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
) -> Result<Vec<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        r#"
        SELECT {ATTEMPT_COLUMNS}
        FROM test_attempts
        WHERE user_id = $1 AND status <> 'in_progress'
        ORDER BY completed_at DESC NULLS LAST, id DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(executor)
    .await
}
