// tests/topic_tests.rs

mod common;

use common::{TestApp, question_ids, read, spawn_app};
use serde_json::{Value, json};

async fn start_topic(app: &TestApp, token: &str, topic_id: i64) -> (u16, Value) {
    read(
        app.post(&format!("/api/topics/{}/start", topic_id), token)
            .send()
            .await
            .unwrap(),
    )
    .await
}

async fn answer(
    app: &TestApp,
    token: &str,
    topic_id: i64,
    attempt_id: i64,
    question_id: i64,
    correct: bool,
) -> (u16, Value) {
    let answer_id = if correct {
        app.correct_answer(question_id).await
    } else {
        app.wrong_answer(question_id).await
    };
    read(
        app.post(
            &format!("/api/topics/{}/attempt/{}/answer", topic_id, attempt_id),
            token,
        )
        .json(&json!({ "questionId": question_id, "answerId": answer_id }))
        .send()
        .await
        .unwrap(),
    )
    .await
}

async fn finish(app: &TestApp, token: &str, topic_id: i64, attempt_id: i64) -> (u16, Value) {
    read(
        app.post(
            &format!("/api/topics/{}/attempt/{}/finish", topic_id, attempt_id),
            token,
        )
        .send()
        .await
        .unwrap(),
    )
    .await
}

async fn topic_entry(app: &TestApp, token: &str, topic_id: i64) -> Value {
    let (status, body) = read(app.get("/api/topics", token).send().await.unwrap()).await;
    assert_eq!(status, 200);
    body["topics"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == topic_id)
        .cloned()
        .expect("topic listed")
}

#[tokio::test]
async fn untouched_topic_is_not_started() {
    let app = spawn_app().await;
    let (token, _) = app.verified_user().await;
    let topic_id = app.seed_topic(4).await;

    let topic = topic_entry(&app, &token, topic_id).await;
    assert_eq!(topic["status"], "not_started");
    assert_eq!(topic["questionsCount"], 4);
    assert_eq!(topic["correctAnswers"], 0);
    assert_eq!(topic["questionsAnswered"], 0);
    assert!(topic["lastAttemptDate"].is_null());
}

#[tokio::test]
async fn topic_test_covers_at_most_twenty_questions_of_the_topic() {
    let app = spawn_app().await;
    let (token, _) = app.verified_user().await;

    let small = app.seed_topic(5).await;
    let (status, body) = start_topic(&app, &token, small).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["topicId"], small);
    assert_eq!(question_ids(&body["questions"]).len(), 5);

    let large = app.seed_topic(25).await;
    let (_, body) = start_topic(&app, &token, large).await;
    assert_eq!(question_ids(&body["questions"]).len(), 20);
}

#[tokio::test]
async fn empty_or_unknown_topic_cannot_start() {
    let app = spawn_app().await;
    let (token, _) = app.verified_user().await;

    let empty = app.seed_topic(0).await;
    let (status, body) = start_topic(&app, &token, empty).await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "EMPTY_TOPIC");

    let (status, body) = start_topic(&app, &token, i64::MAX).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn progress_tracks_the_answer_log() {
    let app = spawn_app().await;
    let (token, _) = app.verified_user().await;
    let topic_id = app.seed_topic(5).await;

    let (_, body) = start_topic(&app, &token, topic_id).await;
    let attempt_id = body["attemptId"].as_i64().unwrap();
    let ids = question_ids(&body["questions"]);

    answer(&app, &token, topic_id, attempt_id, ids[0], true).await;
    answer(&app, &token, topic_id, attempt_id, ids[1], false).await;
    let (status, last) = answer(&app, &token, topic_id, attempt_id, ids[2], true).await;
    assert_eq!(status, 200);
    assert_eq!(last["answered"], 3);
    assert_eq!(last["correctAnswers"], 2);
    assert_eq!(last["incorrectAnswers"], 1);

    let topic = topic_entry(&app, &token, topic_id).await;
    assert_eq!(topic["status"], "in_progress");
    assert_eq!(topic["questionsAnswered"], 3);
    assert_eq!(topic["correctAnswers"], 2);
    assert_eq!(topic["questionsTotal"], 5);

    // A duplicate submission changes nothing.
    let (status, body) = answer(&app, &token, topic_id, attempt_id, ids[0], false).await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "QUESTION_ALREADY_ANSWERED");
    let topic = topic_entry(&app, &token, topic_id).await;
    assert_eq!(topic["questionsAnswered"], 3);
}

#[tokio::test]
async fn attempt_view_is_stable() {
    let app = spawn_app().await;
    let (token, _) = app.verified_user().await;
    let topic_id = app.seed_topic(6).await;

    let (_, started) = start_topic(&app, &token, topic_id).await;
    let attempt_id = started["attemptId"].as_i64().unwrap();
    let mut started_ids = question_ids(&started["questions"]);

    answer(&app, &token, topic_id, attempt_id, started_ids[0], true).await;

    let path = format!("/api/topics/{}/attempt/{}", topic_id, attempt_id);
    let (status, view) = read(app.get(&path, &token).send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(view["status"], "in_progress");
    assert_eq!(view["progress"]["answered"], 1);
    assert_eq!(view["progress"]["total"], 6);

    let mut view_ids = question_ids(&view["questions"]);
    started_ids.sort();
    view_ids.sort();
    assert_eq!(started_ids, view_ids);

    // Same attempt under another topic id is not visible.
    let other = app.seed_topic(1).await;
    let (status, _) = read(
        app.get(&format!("/api/topics/{}/attempt/{}", other, attempt_id), &token)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn finish_applies_seventy_percent_threshold() {
    let app = spawn_app().await;
    let (token, _) = app.verified_user().await;
    let topic_id = app.seed_topic(5).await;

    // ceil(0.7 * 5) = 4 correct needed
    let (_, body) = start_topic(&app, &token, topic_id).await;
    let attempt_id = body["attemptId"].as_i64().unwrap();
    let ids = question_ids(&body["questions"]);
    for id in &ids[..3] {
        answer(&app, &token, topic_id, attempt_id, *id, true).await;
    }
    let (status, outcome) = finish(&app, &token, topic_id, attempt_id).await;
    assert_eq!(status, 200);
    assert_eq!(outcome["status"], "failed");
    assert_eq!(outcome["correctAnswers"], 3);
    assert_eq!(outcome["incorrectAnswers"], 2);

    let (_, body) = start_topic(&app, &token, topic_id).await;
    let attempt_id = body["attemptId"].as_i64().unwrap();
    let ids = question_ids(&body["questions"]);
    for (i, id) in ids.iter().enumerate() {
        answer(&app, &token, topic_id, attempt_id, *id, i != 0).await;
    }
    let (_, outcome) = finish(&app, &token, topic_id, attempt_id).await;
    assert_eq!(outcome["status"], "passed");
    assert_eq!(outcome["passed"], true);

    let topic = topic_entry(&app, &token, topic_id).await;
    assert_eq!(topic["status"], "passed");
    assert_eq!(topic["correctAnswers"], 4);
    assert_eq!(topic["questionsAnswered"], 5);
    assert!(!topic["lastAttemptDate"].is_null());
}

#[tokio::test]
async fn double_finish_is_rejected() {
    let app = spawn_app().await;
    let (token, _) = app.verified_user().await;
    let topic_id = app.seed_topic(2).await;

    let (_, body) = start_topic(&app, &token, topic_id).await;
    let attempt_id = body["attemptId"].as_i64().unwrap();
    let ids = question_ids(&body["questions"]);
    for id in &ids {
        answer(&app, &token, topic_id, attempt_id, *id, true).await;
    }

    let (status, _) = finish(&app, &token, topic_id, attempt_id).await;
    assert_eq!(status, 200);
    let (status, body) = finish(&app, &token, topic_id, attempt_id).await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "ATTEMPT_COMPLETED");

    let topic = topic_entry(&app, &token, topic_id).await;
    assert_eq!(topic["correctAnswers"], 2);
}

#[tokio::test]
async fn results_include_topic_name_and_breakdown() {
    let app = spawn_app().await;
    let (token, _) = app.verified_user().await;
    let topic_id = app.seed_topic(3).await;

    let (_, body) = start_topic(&app, &token, topic_id).await;
    let attempt_id = body["attemptId"].as_i64().unwrap();
    let topic_name = body["topicName"].clone();
    let ids = question_ids(&body["questions"]);
    answer(&app, &token, topic_id, attempt_id, ids[0], false).await;
    finish(&app, &token, topic_id, attempt_id).await;

    let (status, results) = read(
        app.get(
            &format!("/api/topics/{}/attempt/{}/results", topic_id, attempt_id),
            &token,
        )
        .send()
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(results["topicName"], topic_name);
    assert_eq!(results["testType"], "topic");
    let rows = results["results"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["isCorrect"], false);
    assert_eq!(rows[0]["correctAnswerId"], app.correct_answer(ids[0]).await);
}
