// tests/common/mod.rs
//
// Shared harness for the HTTP tests. Every test spins the real router on a
// random port against the Postgres database in DATABASE_URL, which must be set.
// `router_tests.rs` covers what can run without a database.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pdd_trainer::{
    config::Config,
    error::AppError,
    models::user::ROLE_USER,
    repositories::users,
    routes,
    services::{
        auth::AuthService,
        mailer::{Mailer, OutgoingEmail},
    },
    state::AppState,
    utils::hash::hash_password,
};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use sqlx::{PgPool, postgres::PgPoolOptions};

pub const PASSWORD: &str = "secret1";

/// Keeps every email instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

impl RecordingMailer {
    /// Token embedded in the most recent email sent to `to`.
    pub fn last_token_for(&self, to: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let email = sent.iter().rev().find(|e| e.to == to)?;
        let url = url::Url::parse(&email.link).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
    }

    pub fn count_for(&self, to: &str) -> usize {
        self.sent.lock().unwrap().iter().filter(|e| e.to == to).count()
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub mailer: Arc<RecordingMailer>,
    pub auth: AuthService,
    pub client: Client,
}

pub async fn spawn_app() -> TestApp {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let upload_dir = std::env::temp_dir().join(format!("pdd-test-{}", uuid::Uuid::new_v4()));

    let config = Config {
        database_url,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        app_env: "test".to_string(),
        port: 0,
        base_url: "http://api.test".to_string(),
        frontend_url: "http://front.test".to_string(),
        upload_dir: upload_dir.to_string_lossy().into_owned(),
        mail_from: "Тесты ПДД <test@localhost>".to_string(),
        smtp: None,
        admin_email: None,
        admin_password: None,
    };

    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(pool.clone(), config, mailer.clone());
    state.images.ensure_dirs().await.expect("Failed to create upload dirs");

    let auth = state.auth.clone();
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        mailer,
        auth,
        client: Client::new(),
    }
}

pub fn unique_email() -> String {
    format!("u_{}@example.com", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// Status and parsed JSON body.
pub async fn read(response: Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    pub async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        read(
            self.client
                .post(self.url(path))
                .json(&body)
                .send()
                .await
                .expect("request failed"),
        )
        .await
    }

    pub async fn register(&self, email: &str, password: &str) -> (u16, Value) {
        self.post_json(
            "/api/users/register",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (u16, Value) {
        self.post_json(
            "/api/users/login",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Registers, verifies through the emailed link and logs in.
    pub async fn signup(&self) -> (String, String) {
        let email = unique_email();
        let (status, _) = self.register(&email, PASSWORD).await;
        assert_eq!(status, 201);

        let token = self.mailer.last_token_for(&email).expect("no verification email");
        let (status, _) = read(
            self.client
                .get(self.url("/api/auth/verify-email"))
                .query(&[("token", token.as_str())])
                .send()
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(status, 200);

        let (status, body) = self.login(&email, PASSWORD).await;
        assert_eq!(status, 200);
        (body["token"].as_str().unwrap().to_string(), email)
    }

    /// Admin created through the startup seeding path, then logged in.
    pub async fn admin(&self) -> String {
        let email = unique_email();
        self.auth.seed_admin(&email, PASSWORD).await.unwrap();
        let (status, body) = self.login(&email, PASSWORD).await;
        assert_eq!(status, 200);
        body["token"].as_str().unwrap().to_string()
    }

    /// Verified regular user created straight in the database.
    pub async fn verified_user(&self) -> (String, String) {
        let email = unique_email();
        let hash = hash_password(PASSWORD).unwrap();
        users::create(&self.pool, &email, &hash, ROLE_USER, true)
            .await
            .unwrap();
        let (_, body) = self.login(&email, PASSWORD).await;
        (body["token"].as_str().unwrap().to_string(), email)
    }

    /// Creates a topic with `questions` questions of three answers each;
    /// the first answer of every question is the correct one.
    pub async fn seed_topic(&self, questions: usize) -> i64 {
        let topic_id: i64 = sqlx::query_scalar(
            "INSERT INTO topics (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(format!("Тема {}", uuid::Uuid::new_v4()))
        .bind("Тестовая тема")
        .fetch_one(&self.pool)
        .await
        .unwrap();

        for i in 0..questions {
            let question_id: i64 = sqlx::query_scalar(
                "INSERT INTO questions (topic_id, text) VALUES ($1, $2) RETURNING id",
            )
            .bind(topic_id)
            .bind(format!("Вопрос {}", i))
            .fetch_one(&self.pool)
            .await
            .unwrap();

            for (j, correct) in [true, false, false].into_iter().enumerate() {
                sqlx::query("INSERT INTO answers (question_id, text, is_correct) VALUES ($1, $2, $3)")
                    .bind(question_id)
                    .bind(format!("Ответ {}", j))
                    .bind(correct)
                    .execute(&self.pool)
                    .await
                    .unwrap();
            }
        }

        sqlx::query("UPDATE topics SET questions_count = $1 WHERE id = $2")
            .bind(questions as i32)
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .unwrap();

        topic_id
    }

    pub async fn correct_answer(&self, question_id: i64) -> i64 {
        sqlx::query_scalar("SELECT id FROM answers WHERE question_id = $1 AND is_correct")
            .bind(question_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn wrong_answer(&self, question_id: i64) -> i64 {
        sqlx::query_scalar(
            "SELECT id FROM answers WHERE question_id = $1 AND NOT is_correct ORDER BY id LIMIT 1",
        )
        .bind(question_id)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }
}

/// Question ids from a `questions` array in a response body.
pub fn question_ids(questions: &Value) -> Vec<i64> {
    questions
        .as_array()
        .expect("questions array")
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect()
}
