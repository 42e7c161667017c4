// src/error.rs

use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::Config;

/// Internal error text, carried on the response instead of in its body.
/// `expose_error_details` adds it to the JSON outside production.
#[derive(Debug, Clone)]
pub struct ErrorDetails(pub String);

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database, mail transport, filesystem or other unexpected failures.
    #[error("internal error: {0}")]
    InternalServerError(String),

    #[error("{0}")]
    BadRequest(String),

    /// Missing, malformed or expired session token.
    #[error("{0}")]
    AuthError(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Email уже используется")]
    EmailExists,

    #[error("Неверные учетные данные")]
    InvalidCredentials,

    #[error("Подтвердите email перед входом")]
    EmailNotVerified { has_active_token: bool },

    #[error("Недействительный токен")]
    InvalidToken,

    #[error("Срок действия токена истёк")]
    TokenExpired,

    #[error("Токен уже использован")]
    TokenAlreadyUsed,

    #[error("Текущий пароль неверен")]
    InvalidCurrentPassword,

    #[error("Попытка уже завершена")]
    AttemptCompleted,

    #[error("На этот вопрос уже дан ответ")]
    QuestionAlreadyAnswered,

    #[error("Недостаточно вопросов: требуется {required}, доступно {available}")]
    InsufficientQuestions { required: i64, available: i64 },

    #[error("В этой теме пока нет вопросов")]
    EmptyTopic,

    #[error("{0}")]
    InvalidFile(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_)
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::InvalidCurrentPassword
            | AppError::InvalidFile(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::EmailNotVerified { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_)
            | AppError::EmailExists
            | AppError::TokenAlreadyUsed
            | AppError::AttemptCompleted
            | AppError::QuestionAlreadyAnswered
            | AppError::InsufficientQuestions { .. }
            | AppError::EmptyTopic => StatusCode::CONFLICT,
        }
    }

    /// Stable machine-readable code sent to the client.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
            AppError::BadRequest(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::EmailExists => "EMAIL_EXISTS",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::EmailNotVerified { .. } => "EMAIL_NOT_VERIFIED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::TokenAlreadyUsed => "TOKEN_ALREADY_USED",
            AppError::InvalidCurrentPassword => "INVALID_CURRENT_PASSWORD",
            AppError::AttemptCompleted => "ATTEMPT_COMPLETED",
            AppError::QuestionAlreadyAnswered => "QUESTION_ALREADY_ANSWERED",
            AppError::InsufficientQuestions { .. } => "INSUFFICIENT_QUESTIONS",
            AppError::EmptyTopic => "EMPTY_TOPIC",
            AppError::InvalidFile(_) => "INVALID_FILE",
        }
    }
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON envelope with appropriate HTTP status code.
/// Internal errors are logged and only surfaced as a generic message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "success": false,
            "code": self.code(),
        });

        let mut details = None;
        match &self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                body["error"] = json!("Ошибка сервера");
                details = Some(ErrorDetails(msg.clone()));
            }
            AppError::EmailNotVerified { has_active_token } => {
                body["error"] = json!(self.to_string());
                body["hasActiveToken"] = json!(has_active_token);
            }
            _ => body["error"] = json!(self.to_string()),
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(details) = details {
            response.extensions_mut().insert(details);
        }
        response
    }
}

/// Axum Middleware: copies `ErrorDetails` into the error body unless
/// `APP_ENV` is production.
pub async fn expose_error_details(
    State(config): State<Config>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    if config.is_production() {
        return response;
    }
    let Some(ErrorDetails(details)) = response.extensions().get::<ErrorDetails>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };
    let Ok(mut value) = serde_json::from_slice::<Value>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };

    value["details"] = json!(details);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(value.to_string()))
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn internal_error_hides_message_behind_generic_text() {
        let (status, body) =
            body_json(AppError::InternalServerError("connection refused".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["success"], false);
        assert_ne!(body["error"], "connection refused");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn internal_error_carries_details_for_the_middleware() {
        let response = AppError::InternalServerError("pool timed out".into()).into_response();
        let details = response.extensions().get::<ErrorDetails>().unwrap();
        assert_eq!(details.0, "pool timed out");

        let response = AppError::NotFound("нет".into()).into_response();
        assert!(response.extensions().get::<ErrorDetails>().is_none());
    }

    #[tokio::test]
    async fn email_not_verified_reports_active_token() {
        let (status, body) = body_json(AppError::EmailNotVerified {
            has_active_token: true,
        })
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "EMAIL_NOT_VERIFIED");
        assert_eq!(body["hasActiveToken"], true);
    }

    #[test]
    fn token_errors_have_distinct_codes() {
        assert_eq!(AppError::InvalidToken.code(), "INVALID_TOKEN");
        assert_eq!(AppError::TokenExpired.code(), "TOKEN_EXPIRED");
        assert_eq!(AppError::TokenAlreadyUsed.code(), "TOKEN_ALREADY_USED");
        assert_eq!(AppError::TokenAlreadyUsed.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn insufficient_questions_is_a_conflict() {
        let (status, body) = body_json(AppError::InsufficientQuestions {
            required: 20,
            available: 3,
        })
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INSUFFICIENT_QUESTIONS");
        assert!(body["error"].as_str().unwrap().contains("доступно 3"));
    }

    #[test]
    fn business_conflicts_map_to_409() {
        assert_eq!(AppError::EmailExists.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::AttemptCompleted.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
    }
}
