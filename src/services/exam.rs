// src/services/exam.rs
//
// Full exam: 20 random questions, one extension of 5 or 10 questions after
// one or two mistakes in the base set, failed at three mistakes.

use sqlx::PgPool;

use crate::{
    config::{Config, EXAM_QUESTION_COUNT},
    error::AppError,
    models::attempt::{
        AnswerResult, AttemptOutcome, AttemptResults, AttemptStatus, StartExamResponse,
        SubmitAnswerRequest, TestAttempt, TestType, UserStats,
    },
    repositories::{attempts, questions},
    services::{
        grading::{compute_user_stats, ensure_exam_pool, exam_passed, pending_extension},
        question_set::{attempt_results, load_public, record_answer},
    },
};

fn exam_only(attempt: Option<TestAttempt>) -> Result<TestAttempt, AppError> {
    attempt
        .filter(|a| a.test_type == TestType::Exam.as_str())
        .ok_or_else(|| AppError::NotFound("Попытка не найдена".to_string()))
}

#[derive(Clone)]
pub struct ExamService {
    pool: PgPool,
    config: Config,
}

impl ExamService {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self { pool, config }
    }

    pub async fn start_exam(&self, user_id: i64) -> Result<StartExamResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        ensure_exam_pool(questions::count_all(&mut *tx).await?)?;

        let sample = questions::sample_random(&mut *tx, EXAM_QUESTION_COUNT as i64).await?;

        let attempt =
            attempts::create(&mut *tx, user_id, TestType::Exam, None, EXAM_QUESTION_COUNT).await?;

        let questions = load_public(&mut *tx, &self.config, sample, true).await?;
        let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        attempts::assign_questions(&mut *tx, attempt.id, &ids, 0, false).await?;

        tx.commit().await?;
        tracing::info!("Exam attempt {} started by user {}", attempt.id, user_id);

        Ok(StartExamResponse {
            attempt_id: attempt.id,
            questions,
        })
    }

    /// Records one answer under the attempt row lock and grants the
    /// extension when the base set has just been completed with 1 or 2 errors.
    pub async fn submit_answer(
        &self,
        user_id: i64,
        attempt_id: i64,
        req: SubmitAnswerRequest,
    ) -> Result<AnswerResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let attempt = exam_only(attempts::lock_for_user(&mut *tx, attempt_id, user_id).await?)?;
        if !attempt.is_in_progress() {
            return Err(AppError::AttemptCompleted);
        }

        let (answer, tally) = record_answer(&mut *tx, &attempt, &req).await?;

        let mut total_questions = attempt.total_questions;
        let mut additional_questions = None;

        let extension = pending_extension(&attempt, tally);
        if extension > 0 {
            let extra = questions::sample_unseen(&mut *tx, attempt.id, extension as i64).await?;
            if extra.is_empty() {
                tracing::warn!("No unseen questions left to extend attempt {}", attempt.id);
            } else {
                let extra = load_public(&mut *tx, &self.config, extra, true).await?;
                let ids: Vec<i64> = extra.iter().map(|q| q.id).collect();
                attempts::assign_questions(&mut *tx, attempt.id, &ids, total_questions, true)
                    .await?;
                total_questions += ids.len() as i32;
                tracing::info!(
                    "Attempt {} extended by {} questions after {} errors",
                    attempt.id,
                    ids.len(),
                    tally.incorrect()
                );
                additional_questions = Some(extra);
            }
        }

        let now = chrono::Utc::now();
        let update = attempts::TallyUpdate {
            correct: tally.correct as i32,
            incorrect: tally.incorrect() as i32,
            total_questions,
            additional_answered: (tally.answered - attempt.base_questions_count as i64).max(0)
                as i32,
            time_spent_seconds: attempt.elapsed_seconds(now),
        };
        attempts::update_tally(&mut *tx, attempt.id, &update).await?;

        let correct_answer_id = if answer.is_correct {
            None
        } else {
            questions::correct_answer_id(&mut *tx, req.question_id).await?
        };

        tx.commit().await?;

        Ok(AnswerResult {
            is_correct: answer.is_correct,
            correct_answer_id,
            correct_answers: update.correct,
            incorrect_answers: update.incorrect,
            answered: tally.answered,
            total_questions,
            additional_questions,
        })
    }

    pub async fn complete_exam(
        &self,
        user_id: i64,
        attempt_id: i64,
    ) -> Result<AttemptOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let attempt = exam_only(attempts::lock_for_user(&mut *tx, attempt_id, user_id).await?)?;
        if !attempt.is_in_progress() {
            return Err(AppError::AttemptCompleted);
        }

        let tally = attempts::tally(&mut *tx, attempt.id).await?;
        let passed = exam_passed(tally, attempt.base_questions_count, attempt.total_questions);
        let now = chrono::Utc::now();

        let done = attempts::complete(
            &mut *tx,
            attempt.id,
            AttemptStatus::from_passed(passed),
            tally.correct as i32,
            tally.incorrect() as i32,
            attempt.elapsed_seconds(now),
            now,
        )
        .await?;

        tx.commit().await?;
        tracing::info!(
            "Exam attempt {} completed: {} ({}/{})",
            done.id,
            done.status,
            done.correct_answers,
            done.total_questions
        );

        Ok(AttemptOutcome {
            attempt_id: done.id,
            passed,
            status: done.status,
            correct_answers: done.correct_answers,
            incorrect_answers: done.incorrect_answers,
            total_questions: done.total_questions,
            time_spent: done.time_spent_seconds,
        })
    }

    pub async fn get_results(
        &self,
        user_id: i64,
        attempt_id: i64,
    ) -> Result<AttemptResults, AppError> {
        let mut conn = self.pool.acquire().await?;
        let attempt = exam_only(attempts::find_for_user(&mut *conn, attempt_id, user_id).await?)?;
        attempt_results(&mut *conn, &self.config, attempt, None).await
    }

    pub async fn get_user_stats(&self, user_id: i64) -> Result<UserStats, AppError> {
        let completed = attempts::completed_for_user(&self.pool, user_id).await?;
        Ok(compute_user_stats(&completed))
    }
}
