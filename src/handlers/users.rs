// src/handlers/users.rs

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    models::{
        Envelope,
        user::{ChangePasswordRequest, LoginRequest, RegisterRequest, User, UserProfile},
    },
    repositories::users,
    services::uploads::{ImageKind, read_image},
    state::AppState,
};

fn profile(config: &Config, user: User) -> UserProfile {
    UserProfile {
        avatar_url: user
            .avatar
            .as_deref()
            .map(|file| config.upload_url(&format!("{}/{}", ImageKind::Avatar.dir(), file))),
        id: user.id,
        email: user.email,
        role: user.role,
        is_verified: user.is_verified,
        created_at: user.created_at,
    }
}

/// Registers a new user and sends the verification email.
/// No session token is issued until the email is confirmed.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.register(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(json!({
            "message": "Регистрация успешна. Проверьте почту для подтверждения email",
            "user": profile(&state.config, user),
        }))),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (token, user) = state.auth.login(payload).await?;

    Ok(Json(Envelope::ok(json!({
        "token": token,
        "user": profile(&state.config, user),
    }))))
}

/// The user loaded by the auth middleware.
pub async fn me(
    State(config): State<Config>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(Envelope::ok(json!({ "user": profile(&config, user) }))))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.change_password(&user, payload).await?;

    Ok(Json(Envelope::ok(json!({ "message": "Пароль успешно изменён" }))))
}

/// Stores a new avatar and removes the previous file.
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let image = read_image(&mut multipart, ImageKind::Avatar).await?;
    let file_name = state.images.save(ImageKind::Avatar, &image).await?;

    if let Err(e) = users::update_avatar(&state.pool, user.id, &file_name).await {
        state.images.remove(ImageKind::Avatar, &file_name).await;
        return Err(e.into());
    }

    if let Some(previous) = user.avatar.as_deref() {
        state.images.remove(ImageKind::Avatar, previous).await;
    }

    tracing::info!("User {} uploaded avatar {}", user.id, file_name);

    let avatar_url = state
        .config
        .upload_url(&format!("{}/{}", ImageKind::Avatar.dir(), file_name));
    Ok(Json(Envelope::ok(json!({ "avatarUrl": avatar_url }))))
}

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users: Vec<UserProfile> = users::list_all(&state.pool)
        .await?
        .into_iter()
        .map(|u| profile(&state.config, u))
        .collect();

    Ok(Json(Envelope::ok(json!({ "users": users }))))
}

/// Admin only.
pub async fn admin_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = users::admin_stats(&state.pool).await?;
    Ok(Json(Envelope::ok(json!({ "stats": stats }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::test_config, models::user::ROLE_USER};

    #[test]
    fn profile_builds_absolute_avatar_url() {
        let now = chrono::Utc::now();
        let user = User {
            id: 1,
            email: "a@x.com".into(),
            password_hash: "hash".into(),
            role: ROLE_USER.into(),
            is_verified: true,
            avatar: Some("abc.png".into()),
            created_at: now,
            updated_at: now,
        };
        let p = profile(&test_config(), user);
        assert_eq!(
            p.avatar_url.as_deref(),
            Some("http://api.test/uploads/avatars/abc.png")
        );
        let value = serde_json::to_value(&p).unwrap();
        assert!(value.get("passwordHash").is_none());
    }
}
