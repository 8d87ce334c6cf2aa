use core::str::FromStr;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::app::errors::ApiError;

pub mod auth;
pub mod foodbanks;
pub mod inventory;
pub mod system;
pub mod users;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify-email", get(auth::verify_email))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/users/:id/role", patch(users::assign_role))
        .nest("/api/foodbanks", foodbanks::router())
        .nest("/api/inventory", inventory::router())
}

/// Parse a path identifier. A malformed id names no resource, so it is a 404.
pub(crate) fn path_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse::<T>().map_err(|_| ApiError::not_found(what))
}
