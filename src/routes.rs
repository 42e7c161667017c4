// src/routes.rs

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    config::{AVATAR_MAX_BYTES, QUESTION_IMAGE_MAX_BYTES},
    error::expose_error_details,
    handlers::{auth, exam, questions, topics, users},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Multipart framing on top of the raw file size.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!("FRONTEND_URL is not a valid origin, CORS disabled");
            cors
        }
    }
}

/// Assembles the main application router.
///
/// * Merges all sub-routers (users, auth, exam, topics, questions).
/// * Serves uploaded files under `/uploads`.
/// * Applies global middleware (Trace, CORS, error details outside production).
pub fn create_router(state: AppState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let user_routes = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .merge(
            Router::new()
                .route("/me", get(users::me))
                .route("/change-password", post(users::change_password))
                .route(
                    "/upload-avatar",
                    post(users::upload_avatar)
                        .layer(DefaultBodyLimit::max(AVATAR_MAX_BYTES + MULTIPART_OVERHEAD)),
                )
                .layer(auth_layer.clone()),
        )
        .merge(
            Router::new()
                .route("/", get(users::list_users))
                .route("/admin-stats", get(users::admin_stats))
                // Auth first, then the admin check
                .layer(middleware::from_fn(admin_middleware))
                .layer(auth_layer.clone()),
        );

    let auth_routes = Router::new()
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route(
            "/verify-email",
            get(auth::verify_email_link).post(auth::verify_email),
        )
        .route("/resend-verification", post(auth::resend_verification));

    let exam_routes = Router::new()
        .route("/start", post(exam::start))
        .route("/stats", get(exam::stats))
        .route("/{attempt_id}/answer", post(exam::submit_answer))
        .route("/{attempt_id}/finish", post(exam::finish))
        .route("/{attempt_id}/results", get(exam::results))
        .layer(auth_layer.clone());

    let topic_routes = Router::new()
        .route("/", get(topics::list))
        .route("/{topic_id}/start", post(topics::start))
        .route("/{topic_id}/attempt/{attempt_id}", get(topics::get_attempt))
        .route(
            "/{topic_id}/attempt/{attempt_id}/answer",
            post(topics::submit_answer),
        )
        .route("/{topic_id}/attempt/{attempt_id}/finish", post(topics::finish))
        .route(
            "/{topic_id}/attempt/{attempt_id}/results",
            get(topics::results),
        )
        .layer(auth_layer.clone());

    let question_routes = Router::new()
        .route("/", post(questions::create_question))
        .route(
            "/{id}/image",
            post(questions::upload_image).layer(DefaultBodyLimit::max(
                QUESTION_IMAGE_MAX_BYTES + MULTIPART_OVERHEAD,
            )),
        )
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer);

    Router::new()
        .route("/", get(health))
        .nest("/api/users", user_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/exam", exam_routes)
        .nest("/api/topics", topic_routes)
        .nest("/api/questions", question_routes)
        .nest_service("/uploads", ServeDir::new(state.images.root()))
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.frontend_url))
                .layer(middleware::from_fn_with_state(
                    state.config.clone(),
                    expose_error_details,
                )),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "message": "ПДД Тренажёр API работает" }))
}
