// src/services/grading.rs
//
// Pure attempt rules: exam extension, pass/fail and statistics.

use crate::{
    config::{
        EXAM_EXTENSION_ONE_ERROR, EXAM_EXTENSION_TWO_ERRORS, EXAM_FAIL_ERRORS,
        EXAM_QUESTION_COUNT, TOPIC_PASS_PERCENTAGE,
    },
    error::AppError,
    models::attempt::{
        AnswerTally, AttemptStatus, ExamStats, LastAttemptSummary, TestAttempt, TestType,
        UserStats,
    },
};

/// A full exam needs at least 20 questions in the pool.
pub fn ensure_exam_pool(available: i64) -> Result<(), AppError> {
    let required = EXAM_QUESTION_COUNT as i64;
    if available < required {
        return Err(AppError::InsufficientQuestions {
            required,
            available,
        });
    }
    Ok(())
}

/// Number of additional questions earned by a given error count in the base set.
pub fn extension_size(incorrect: i64) -> i32 {
    match incorrect {
        1 => EXAM_EXTENSION_ONE_ERROR,
        2 => EXAM_EXTENSION_TWO_ERRORS,
        _ => 0,
    }
}

/// Extension owed after the latest submission, or 0.
///
/// Granted once: at the submission that completes the base set, and only
/// while the attempt has not been extended yet.
pub fn pending_extension(attempt: &TestAttempt, tally: AnswerTally) -> i32 {
    let base = attempt.base_questions_count as i64;
    if tally.answered != base || attempt.total_questions != attempt.base_questions_count {
        return 0;
    }
    extension_size(tally.incorrect())
}

/// An exam fails at three mistakes. Below that it passes, unless an
/// extension was granted and left partly unanswered. Skipped base
/// questions do not count against it.
pub fn exam_passed(tally: AnswerTally, base_questions: i32, total_questions: i32) -> bool {
    if tally.incorrect() >= EXAM_FAIL_ERRORS as i64 {
        return false;
    }
    let extended = total_questions > base_questions;
    !extended || tally.answered >= total_questions as i64
}

/// Topic practice passes at 70% of the assigned questions, rounded up.
pub fn topic_passed(correct: i64, total_questions: i32) -> bool {
    let required = (total_questions as f64 * TOPIC_PASS_PERCENTAGE / 100.0).ceil() as i64;
    correct >= required
}

/// sum(correct) / sum(total) * 100, rounded. Zero for an empty set.
fn average_score<'a>(attempts: impl Iterator<Item = &'a TestAttempt> + Clone) -> i64 {
    let total: i64 = attempts.clone().map(|a| a.total_questions as i64).sum();
    if total == 0 {
        return 0;
    }
    let correct: i64 = attempts.map(|a| a.correct_answers as i64).sum();
    (correct as f64 / total as f64 * 100.0).round() as i64
}

fn average_time<'a>(attempts: impl Iterator<Item = &'a TestAttempt>) -> i64 {
    let (count, sum) = attempts.fold((0i64, 0i64), |(count, sum), a| {
        (count + 1, sum + a.time_spent_seconds as i64)
    });
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as i64
}

/// Aggregates completed attempts. In-progress rows are ignored.
pub fn compute_user_stats(attempts: &[TestAttempt]) -> UserStats {
    let completed = || attempts.iter().filter(|a| a.is_completed());
    let exams = || completed().filter(|a| a.test_type == TestType::Exam.as_str());

    let last_attempt = exams()
        .max_by_key(|a| (a.completed_at, a.id))
        .map(|a| LastAttemptSummary {
            attempt_id: a.id,
            status: a.status.clone(),
            correct_answers: a.correct_answers,
            total_questions: a.total_questions,
            time_spent: a.time_spent_seconds,
            completed_at: a.completed_at,
        });

    UserStats {
        total_attempts: completed().count(),
        average_score: average_score(completed()),
        average_time: average_time(completed()),
        exam: ExamStats {
            total_attempts: exams().count(),
            passed_attempts: exams()
                .filter(|a| a.status == AttemptStatus::Passed.as_str())
                .count(),
            average_score: average_score(exams()),
            average_time: average_time(exams()),
            last_attempt,
        },
    }
}
