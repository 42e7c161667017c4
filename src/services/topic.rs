// src/services/topic.rs

use sqlx::PgPool;

use crate::{
    config::{Config, TOPIC_QUESTION_LIMIT},
    error::AppError,
    models::{
        attempt::{
            AnswerResult, AttemptOutcome, AttemptProgress, AttemptResults, AttemptStatus,
            StartTopicResponse, SubmitAnswerRequest, TestAttempt, TestType, TopicAttemptView,
        },
        topic::{Topic, TopicWithProgress},
    },
    repositories::{attempts, questions, topics},
    services::{
        grading::topic_passed,
        question_set::{attempt_results, load_public, record_answer},
    },
};

/// The attempt must be a topic attempt for exactly this topic.
fn scoped_to_topic(attempt: Option<TestAttempt>, topic_id: i64) -> Result<TestAttempt, AppError> {
    attempt
        .filter(|a| a.test_type == TestType::Topic.as_str() && a.topic_id == Some(topic_id))
        .ok_or_else(|| AppError::NotFound("Попытка не найдена".to_string()))
}

fn topic_not_found() -> AppError {
    AppError::NotFound("Тема не найдена".to_string())
}

#[derive(Clone)]
pub struct TopicService {
    pool: PgPool,
    config: Config,
}

impl TopicService {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self { pool, config }
    }

    pub async fn get_topics_with_progress(
        &self,
        user_id: i64,
    ) -> Result<Vec<TopicWithProgress>, AppError> {
        Ok(topics::list_with_progress(&self.pool, user_id).await?)
    }

    /// Hands out up to 20 random questions of the topic. The set is stored
    /// with the attempt, so later reads see the same questions.
    pub async fn start_topic_test(
        &self,
        user_id: i64,
        topic_id: i64,
    ) -> Result<StartTopicResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        let topic: Topic = topics::find_by_id(&mut *tx, topic_id)
            .await?
            .ok_or_else(topic_not_found)?;

        let sample = questions::sample_for_topic(&mut *tx, topic.id, TOPIC_QUESTION_LIMIT).await?;
        if sample.is_empty() {
            return Err(AppError::EmptyTopic);
        }
        let count = sample.len() as i32;

        let attempt =
            attempts::create(&mut *tx, user_id, TestType::Topic, Some(topic.id), count).await?;

        let questions = load_public(&mut *tx, &self.config, sample, true).await?;
        let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        attempts::assign_questions(&mut *tx, attempt.id, &ids, 0, false).await?;

        topics::ensure_progress(&mut *tx, user_id, topic.id, count).await?;

        tx.commit().await?;
        tracing::info!(
            "Topic attempt {} started by user {} on topic {} ({} questions)",
            attempt.id,
            user_id,
            topic.id,
            count
        );

        Ok(StartTopicResponse {
            attempt_id: attempt.id,
            topic_id: topic.id,
            topic_name: topic.name,
            questions,
        })
    }

    pub async fn get_attempt(
        &self,
        user_id: i64,
        topic_id: i64,
        attempt_id: i64,
    ) -> Result<TopicAttemptView, AppError> {
        let mut conn = self.pool.acquire().await?;

        let attempt = scoped_to_topic(
            attempts::find_for_user(&mut *conn, attempt_id, user_id).await?,
            topic_id,
        )?;
        let topic = topics::find_by_id(&mut *conn, topic_id)
            .await?
            .ok_or_else(topic_not_found)?;

        let assigned = questions::assigned_to_attempt(&mut *conn, attempt.id).await?;
        let questions = load_public(&mut *conn, &self.config, assigned, false).await?;
        let tally = attempts::tally(&mut *conn, attempt.id).await?;

        Ok(TopicAttemptView {
            attempt_id: attempt.id,
            topic_id: topic.id,
            topic_name: topic.name,
            status: attempt.status,
            questions,
            progress: AttemptProgress {
                answered: tally.answered,
                total: attempt.total_questions,
            },
        })
    }

    /// Records an answer and mirrors the recounted tally onto the user's
    /// progress row for the topic, all under the attempt row lock.
    pub async fn submit_answer(
        &self,
        user_id: i64,
        topic_id: i64,
        attempt_id: i64,
        req: SubmitAnswerRequest,
    ) -> Result<AnswerResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let attempt = scoped_to_topic(
            attempts::lock_for_user(&mut *tx, attempt_id, user_id).await?,
            topic_id,
        )?;
        if !attempt.is_in_progress() {
            return Err(AppError::AttemptCompleted);
        }

        let (answer, tally) = record_answer(&mut *tx, &attempt, &req).await?;

        let update = attempts::TallyUpdate {
            correct: tally.correct as i32,
            incorrect: tally.incorrect() as i32,
            total_questions: attempt.total_questions,
            additional_answered: 0,
            time_spent_seconds: attempt.elapsed_seconds(chrono::Utc::now()),
        };
        attempts::update_tally(&mut *tx, attempt.id, &update).await?;

        topics::set_progress_counts(
            &mut *tx,
            user_id,
            topic_id,
            tally.answered as i32,
            update.correct,
        )
        .await?;

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
            total_questions: attempt.total_questions,
            additional_questions: None,
        })
    }

    /// Grades against 70% of the assigned questions; unanswered ones count
    /// as incorrect.
    pub async fn finish_attempt(
        &self,
        user_id: i64,
        topic_id: i64,
        attempt_id: i64,
    ) -> Result<AttemptOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let attempt = scoped_to_topic(
            attempts::lock_for_user(&mut *tx, attempt_id, user_id).await?,
            topic_id,
        )?;
        if !attempt.is_in_progress() {
            return Err(AppError::AttemptCompleted);
        }

        let tally = attempts::tally(&mut *tx, attempt.id).await?;
        let passed = topic_passed(tally.correct, attempt.total_questions);
        let status = AttemptStatus::from_passed(passed);
        let correct = tally.correct as i32;
        let now = chrono::Utc::now();

        let done = attempts::complete(
            &mut *tx,
            attempt.id,
            status,
            correct,
            attempt.total_questions - correct,
            attempt.elapsed_seconds(now),
            now,
        )
        .await?;

        topics::finish_progress(
            &mut *tx,
            user_id,
            topic_id,
            status,
            done.id,
            tally.answered as i32,
            correct,
        )
        .await?;

        tx.commit().await?;
        tracing::info!(
            "Topic attempt {} completed: {} ({}/{})",
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

    pub async fn get_attempt_results(
        &self,
        user_id: i64,
        topic_id: i64,
        attempt_id: i64,
    ) -> Result<AttemptResults, AppError> {
        let mut conn = self.pool.acquire().await?;

        let attempt = scoped_to_topic(
            attempts::find_for_user(&mut *conn, attempt_id, user_id).await?,
            topic_id,
        )?;
        let topic_name = topics::find_by_id(&mut *conn, topic_id)
            .await?
            .map(|t| t.name);

        attempt_results(&mut *conn, &self.config, attempt, topic_name).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn topic_attempt(topic_id: Option<i64>, test_type: TestType) -> TestAttempt {
        TestAttempt {
            id: 3,
            user_id: 1,
            test_type: test_type.as_str().to_string(),
            status: AttemptStatus::InProgress.as_str().to_string(),
            topic_id,
            total_questions: 10,
            base_questions_count: 10,
            additional_questions_answered: 0,
            correct_answers: 0,
            incorrect_answers: 0,
            time_spent_seconds: 0,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn attempt_must_match_topic_and_type() {
        assert!(scoped_to_topic(Some(topic_attempt(Some(5), TestType::Topic)), 5).is_ok());
        assert!(scoped_to_topic(Some(topic_attempt(Some(5), TestType::Topic)), 6).is_err());
        assert!(scoped_to_topic(Some(topic_attempt(None, TestType::Exam)), 5).is_err());
        assert!(scoped_to_topic(None, 5).is_err());
    }
}
