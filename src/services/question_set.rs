// src/services/question_set.rs
//
// Turning question rows into client payloads and recording answers. Shared by
// the exam and topic workflows.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use sqlx::PgConnection;

use crate::{
    config::Config,
    error::AppError,
    models::{
        attempt::{AnswerTally, AttemptResults, AttemptStatus, SubmitAnswerRequest, TestAttempt},
        question::{Answer, PublicAnswer, PublicQuestion, Question},
    },
    repositories::{attempts, is_unique_violation, questions},
};

pub fn question_image_url(config: &Config, image_file: Option<&str>) -> Option<String> {
    image_file.map(|file| config.upload_url(&format!("questions/{}", file)))
}

/// Groups answers under their questions, dropping the correctness flag.
/// With `shuffle`, both question order and each answer list are randomized.
pub fn to_public(
    config: &Config,
    mut questions: Vec<Question>,
    answers: Vec<Answer>,
    shuffle: bool,
) -> Vec<PublicQuestion> {
    let mut by_question: HashMap<i64, Vec<PublicAnswer>> = HashMap::new();
    for answer in answers {
        by_question
            .entry(answer.question_id)
            .or_default()
            .push(PublicAnswer {
                id: answer.id,
                text: answer.text,
            });
    }

    let mut rng = rand::thread_rng();
    if shuffle {
        questions.shuffle(&mut rng);
    }

    questions
        .into_iter()
        .map(|q| {
            let mut answers = by_question.remove(&q.id).unwrap_or_default();
            if shuffle {
                answers.shuffle(&mut rng);
            }
            PublicQuestion {
                id: q.id,
                image_url: question_image_url(config, q.image_url.as_deref()),
                text: q.text,
                answers,
            }
        })
        .collect()
}

/// Loads answers for `questions` and builds the sanitized payload.
pub async fn load_public(
    conn: &mut PgConnection,
    config: &Config,
    questions: Vec<Question>,
    shuffle: bool,
) -> Result<Vec<PublicQuestion>, AppError> {
    let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    let answers = questions::answers_for(&mut *conn, &ids).await?;
    Ok(to_public(config, questions, answers, shuffle))
}

/// Validates and appends one answer to the attempt's log, then recounts it.
///
/// The caller holds the attempt row lock and has checked it is in progress.
pub async fn record_answer(
    conn: &mut PgConnection,
    attempt: &TestAttempt,
    req: &SubmitAnswerRequest,
) -> Result<(Answer, AnswerTally), AppError> {
    if !attempts::is_question_assigned(&mut *conn, attempt.id, req.question_id).await? {
        return Err(AppError::NotFound(
            "Вопрос не относится к этой попытке".to_string(),
        ));
    }

    let answer = questions::find_answer(&mut *conn, req.answer_id)
        .await?
        .filter(|a| a.question_id == req.question_id)
        .ok_or_else(|| AppError::BadRequest("Недопустимый ответ".to_string()))?;

    if attempts::has_answer(&mut *conn, attempt.id, req.question_id).await? {
        return Err(AppError::QuestionAlreadyAnswered);
    }

    attempts::insert_user_answer(
        &mut *conn,
        attempt.id,
        req.question_id,
        answer.id,
        answer.is_correct,
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::QuestionAlreadyAnswered
        } else {
            AppError::from(e)
        }
    })?;

    let tally = attempts::tally(&mut *conn, attempt.id).await?;
    Ok((answer, tally))
}

/// Full per-question breakdown of an attempt, ordered by submission time.
pub async fn attempt_results(
    conn: &mut PgConnection,
    config: &Config,
    attempt: TestAttempt,
    topic_name: Option<String>,
) -> Result<AttemptResults, AppError> {
    let mut results = attempts::breakdown(&mut *conn, attempt.id).await?;
    for row in &mut results {
        row.image_url = question_image_url(config, row.image_file.as_deref());
    }

    Ok(AttemptResults {
        attempt_id: attempt.id,
        passed: attempt.status == AttemptStatus::Passed.as_str(),
        test_type: attempt.test_type,
        topic_id: attempt.topic_id,
        topic_name,
        status: attempt.status,
        correct_answers: attempt.correct_answers,
        incorrect_answers: attempt.incorrect_answers,
        total_questions: attempt.total_questions,
        time_spent: attempt.time_spent_seconds,
        started_at: attempt.started_at,
        completed_at: attempt.completed_at,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config as config;

    fn question(id: i64, image: Option<&str>) -> Question {
        Question {
            id,
            topic_id: 1,
            text: format!("Вопрос {}", id),
            image_url: image.map(str::to_string),
            is_hard: false,
            created_at: chrono::Utc::now(),
            updated_at: None,
        }
    }

    fn answer(id: i64, question_id: i64, is_correct: bool) -> Answer {
        Answer {
            id,
            question_id,
            text: format!("Ответ {}", id),
            is_correct,
        }
    }

    #[test]
    fn answers_are_grouped_under_their_question() {
        let questions = vec![question(1, Some("sign.png")), question(2, None)];
        let answers = vec![
            answer(10, 1, true),
            answer(11, 1, false),
            answer(20, 2, false),
            answer(21, 2, true),
            answer(22, 2, false),
        ];

        let public = to_public(&config(), questions, answers, false);
        assert_eq!(public.len(), 2);
        assert_eq!(public[0].answers.len(), 2);
        assert_eq!(public[1].answers.len(), 3);
        assert_eq!(
            public[0].image_url.as_deref(),
            Some("http://api.test/uploads/questions/sign.png")
        );
        assert!(public[1].image_url.is_none());
    }

    #[test]
    fn shuffling_keeps_the_same_sets() {
        let questions: Vec<Question> = (1..=20).map(|id| question(id, None)).collect();
        let answers: Vec<Answer> = (1..=20)
            .flat_map(|q| (0..3).map(move |i| answer(q * 10 + i, q, i == 0)))
            .collect();

        let public = to_public(&config(), questions, answers, true);
        let mut ids: Vec<i64> = public.iter().map(|q| q.id).collect();
        ids.sort();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
        for q in &public {
            let mut answer_ids: Vec<i64> = q.answers.iter().map(|a| a.id).collect();
            answer_ids.sort();
            assert_eq!(answer_ids, vec![q.id * 10, q.id * 10 + 1, q.id * 10 + 2]);
        }
    }
}
