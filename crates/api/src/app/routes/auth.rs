use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use bytebasket_auth::user::normalize_email;
use bytebasket_auth::{hash_password, validate_password, verify_password, NewUser, Principal, Role, User};

use crate::app::dto::{AuthResponse, LoginRequest, RegisterRequest, VerifyEmailQuery};
use crate::app::errors::ApiError;
use crate::app::extract::{ApiJson, ApiQuery};
use crate::app::services::AppServices;

/// Self-registration. Staff and admin accounts are granted by an admin instead.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let role = body.role.unwrap_or(Role::Donor);
    if !role.is_self_assignable() {
        return Err(ApiError::Forbidden(format!("role '{role}' cannot be self-assigned")));
    }
    validate_password(&body.password)?;

    let user = User::register(
        NewUser {
            email: body.email,
            name: body.name,
            password_hash: hash_password(&body.password)?,
            role,
            foodbank_id: None,
        },
        Utc::now(),
    )?;
    let user = services.users.insert(user).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "user registered");

    services.send_verification(&user).await;

    let token = services.issue_token(&user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let rejected = || ApiError::Unauthenticated("invalid email or password".to_string());

    let email = normalize_email(&body.email).map_err(|_| rejected())?;
    let user = services
        .users
        .find_by_email(&email)
        .await?
        .filter(|u| verify_password(&body.password, &u.password_hash))
        .ok_or_else(|| {
            tracing::debug!("login rejected");
            rejected()
        })?;

    let token = services.issue_token(&user)?;
    Ok(Json(AuthResponse { token, user }))
}

pub async fn verify_email(
    Extension(services): Extension<Arc<AppServices>>,
    ApiQuery(query): ApiQuery<VerifyEmailQuery>,
) -> Result<Json<Value>, ApiError> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::validation("token is required"))?;

    let mut user = services
        .users
        .find_by_verification_token(token.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("verification token"))?;

    user.mark_verified(Utc::now());
    let user = services.users.update(user).await?;
    tracing::info!(user_id = %user.id, "email verified");

    Ok(Json(json!({ "message": "email verified", "user": user })))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<User>, ApiError> {
    let user = services
        .users
        .get(principal.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    Ok(Json(user))
}
