//! Authentication-related handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState, AuthUser};
use moneytalk_core::auth::{authenticate, issue_token, register_user};
use moneytalk_core::models::{NewUser, User};

#[derive(Serialize)]
pub struct UserResponse {
    pub status: &'static str,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub exp: DateTime<Utc>,
}

/// POST /api/v1/auth/register - Create an account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = register_user(&state.db, &body)?;
    info!(user_id = %user.id, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            status: "success",
            user,
        }),
    ))
}

/// POST /api/v1/auth/login - Exchange credentials for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = authenticate(&state.db, &body.user_email, &body.password)?;
    let issued = issue_token(&state.config.jwt_secret, user.id, state.config.token_ttl_secs)?;

    Ok(Json(LoginResponse {
        status: "success",
        token: issued.token,
        issued_at: issued.issued_at,
        exp: issued.exp,
    }))
}

/// GET /api/v1/auth/me - The authenticated user
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .db
        .get_user(auth.user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserResponse {
        status: "success",
        user,
    }))
}
