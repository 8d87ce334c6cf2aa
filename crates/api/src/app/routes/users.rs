use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    Json,
};
use chrono::Utc;

use bytebasket_auth::{authorize, Capability, Principal, User};
use bytebasket_core::UserId;

use crate::app::dto::AssignRoleRequest;
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::routes::path_id;
use crate::app::services::AppServices;

/// Admin-only role and food bank assignment.
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AssignRoleRequest>,
) -> Result<Json<User>, ApiError> {
    authorize(&principal, Capability::UserManage)?;
    let id: UserId = path_id(&id, "user")?;

    let mut user = services
        .users
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    if let Some(foodbank_id) = body.foodbank_id {
        if services.foodbanks.get(foodbank_id).await?.is_none() {
            return Err(ApiError::InvalidReference(format!("foodbank {foodbank_id} does not exist")));
        }
    }

    user.assign_role(body.role, body.foodbank_id, Utc::now())?;
    let user = services.users.update(user).await?;
    tracing::info!(user_id = %user.id, role = %user.role, by = %principal.user_id, "role assigned");

    Ok(Json(user))
}
