// src/config.rs

use std::env;

use dotenvy::dotenv;

/// Number of base questions in a full exam.
pub const EXAM_QUESTION_COUNT: i32 = 20;
/// Extra questions granted after exactly one mistake in the base set.
pub const EXAM_EXTENSION_ONE_ERROR: i32 = 5;
/// Extra questions granted after exactly two mistakes in the base set.
pub const EXAM_EXTENSION_TWO_ERRORS: i32 = 10;
/// An exam with this many incorrect answers (or more) is failed.
pub const EXAM_FAIL_ERRORS: i32 = 3;

/// Upper bound of questions handed out for one topic practice attempt.
pub const TOPIC_QUESTION_LIMIT: i64 = 20;
pub const TOPIC_PASS_PERCENTAGE: f64 = 70.0;

pub const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

pub const AVATAR_MAX_BYTES: usize = 2 * 1024 * 1024;
pub const QUESTION_IMAGE_MAX_BYTES: usize = 5 * 1024 * 1024;

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Session token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub app_env: String,
    pub port: u16,
    /// Public URL of this API, used for absolute upload links.
    pub base_url: String,
    /// Frontend origin, used for CORS and for links in emails.
    pub frontend_url: String,
    pub upload_dir: String,
    pub mail_from: String,
    pub smtp: Option<SmtpConfig>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7200);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://localhost:{}", port));

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());

        let smtp = non_empty("SMTP_HOST").map(|host| SmtpConfig {
            host,
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            username: non_empty("SMTP_USERNAME"),
            password: non_empty("SMTP_PASSWORD"),
        });

        let mail_from = env::var("MAIL_FROM")
            .unwrap_or_else(|_| "ПДД Тренажёр <no-reply@localhost>".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            app_env,
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            upload_dir,
            mail_from,
            smtp,
            admin_email: non_empty("ADMIN_EMAIL"),
            admin_password: non_empty("ADMIN_PASSWORD"),
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Absolute URL of a stored upload, e.g. `avatars/abc.png`.
    pub fn upload_url(&self, relative: &str) -> String {
        format!("{}/uploads/{}", self.base_url, relative)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: "test_secret".into(),
        jwt_expiration: 7200,
        rust_log: "error".into(),
        app_env: "test".into(),
        port: 5000,
        base_url: "http://api.test".into(),
        frontend_url: "http://front.test".into(),
        upload_dir: "uploads".into(),
        mail_from: "Тесты ПДД <test@localhost>".into(),
        smtp: None,
        admin_email: None,
        admin_password: None,
    }
}
