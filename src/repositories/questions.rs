// src/repositories/questions.rs

use sqlx::{PgConnection, PgExecutor};

use crate::models::question::{Answer, CreateQuestionRequest, Question};

const QUESTION_COLUMNS: &str = "id, topic_id, text, image_url, is_hard, created_at, updated_at";

pub async fn find_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn count_all<'e, E: PgExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions")
        .fetch_one(executor)
        .await
}

/// Random sample over the whole question pool.
pub async fn sample_random<'e, E: PgExecutor<'e>>(
    executor: E,
    limit: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions ORDER BY RANDOM() LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// Random sample of questions not yet assigned to the attempt.
pub async fn sample_unseen<'e, E: PgExecutor<'e>>(
    executor: E,
    attempt_id: i64,
    limit: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        r#"
        SELECT {QUESTION_COLUMNS}
        FROM questions
        WHERE id NOT IN (SELECT question_id FROM attempt_questions WHERE attempt_id = $1)
        ORDER BY RANDOM()
        LIMIT $2
        "#
    ))
    .bind(attempt_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub async fn sample_for_topic<'e, E: PgExecutor<'e>>(
    executor: E,
    topic_id: i64,
    limit: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE topic_id = $1 ORDER BY RANDOM() LIMIT $2"
    ))
    .bind(topic_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// Questions assigned to an attempt, in the order they were handed out.
pub async fn assigned_to_attempt<'e, E: PgExecutor<'e>>(
    executor: E,
    attempt_id: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT q.id, q.topic_id, q.text, q.image_url, q.is_hard, q.created_at, q.updated_at
        FROM attempt_questions aq
        JOIN questions q ON q.id = aq.question_id
        WHERE aq.attempt_id = $1
        ORDER BY aq.position
        "#,
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub async fn answers_for<'e, E: PgExecutor<'e>>(
    executor: E,
    question_ids: &[i64],
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(
        r#"
        SELECT id, question_id, text, is_correct
        FROM answers
        WHERE question_id = ANY($1)
        ORDER BY question_id, id
        "#,
    )
    .bind(question_ids)
    .fetch_all(executor)
    .await
}

pub async fn find_answer<'e, E: PgExecutor<'e>>(
    executor: E,
    answer_id: i64,
) -> Result<Option<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(
        "SELECT id, question_id, text, is_correct FROM answers WHERE id = $1",
    )
    .bind(answer_id)
    .fetch_optional(executor)
    .await
}

/// First correct answer by id. Question creation enforces exactly one.
pub async fn correct_answer_id<'e, E: PgExecutor<'e>>(
    executor: E,
    question_id: i64,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM answers WHERE question_id = $1 AND is_correct ORDER BY id LIMIT 1",
    )
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

/// Inserts the question, its answers and bumps the topic counter.
/// Must run inside a transaction.
pub async fn create_with_answers(
    conn: &mut PgConnection,
    req: &CreateQuestionRequest,
) -> Result<Question, sqlx::Error> {
    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        INSERT INTO questions (topic_id, text, is_hard)
        VALUES ($1, $2, $3)
        RETURNING {QUESTION_COLUMNS}
        "#
    ))
    .bind(req.topic_id)
    .bind(&req.text)
    .bind(req.is_hard)
    .fetch_one(&mut *conn)
    .await?;

    for answer in &req.answers {
        sqlx::query("INSERT INTO answers (question_id, text, is_correct) VALUES ($1, $2, $3)")
            .bind(question.id)
            .bind(&answer.text)
            .bind(answer.is_correct)
            .execute(&mut *conn)
            .await?;
    }

    sqlx::query(
        "UPDATE topics SET questions_count = questions_count + 1, updated_at = NOW() WHERE id = $1",
    )
    .bind(req.topic_id)
    .execute(&mut *conn)
    .await?;

    Ok(question)
}

pub async fn set_image<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    file_name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE questions SET image_url = $1, updated_at = NOW() WHERE id = $2")
        .bind(file_name)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
