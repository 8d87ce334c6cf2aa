use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use bytebasket_auth::{authorize, Capability, Principal};
use bytebasket_core::{FoodbankId, Page, PageRequest};
use bytebasket_foodbanks::{Foodbank, NewFoodbank};

use crate::app::dto::FoodbankListQuery;
use crate::app::errors::ApiError;
use crate::app::extract::{ApiJson, ApiQuery};
use crate::app::routes::path_id;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_foodbanks).post(create_foodbank))
        .route("/:id", get(get_foodbank))
}

pub async fn list_foodbanks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<FoodbankListQuery>,
) -> Result<Json<Page<Foodbank>>, ApiError> {
    authorize(&principal, Capability::FoodbankRead)?;

    let page = PageRequest::parse(query.page.as_deref(), query.limit.as_deref());
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    Ok(Json(services.foodbanks.list(search, page).await?))
}

pub async fn create_foodbank(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<NewFoodbank>,
) -> Result<(StatusCode, Json<Foodbank>), ApiError> {
    authorize(&principal, Capability::FoodbankManage)?;

    let foodbank = Foodbank::create(body, Utc::now())?;
    let foodbank = services.foodbanks.insert(foodbank).await?;
    tracing::info!(foodbank_id = %foodbank.id, "foodbank created");

    Ok((StatusCode::CREATED, Json(foodbank)))
}

pub async fn get_foodbank(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Foodbank>, ApiError> {
    authorize(&principal, Capability::FoodbankRead)?;
    let id: FoodbankId = path_id(&id, "foodbank")?;

    services
        .foodbanks
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("foodbank"))
}
