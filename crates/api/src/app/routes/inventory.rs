//! Inventory lifecycle, alerting and export endpoints.
//!
//! Every handler checks the caller's capability first, then resolves which
//! food banks the call may touch, then talks to the store.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use bytebasket_auth::{authorize, ensure_can_mutate, resolve_scope, Capability, Principal, Role};
use bytebasket_core::{FoodbankId, ItemId, Page};
use bytebasket_infra::export::{self, ExportFormat, MAX_EXPORT_ROWS};
use bytebasket_inventory::{
    DietaryCategory, InventoryItem, InventoryQuery, InventoryQueryParams, NewInventoryItem,
    QuantityChange, EXPIRING_SOON_DAYS,
};

use crate::app::dto::{
    parse_optional_date, parse_optional_dietary_category, AlertQuery, CreateItemRequest, ExpiringQuery,
    ItemView, UpdateItemRequest,
};
use crate::app::errors::ApiError;
use crate::app::extract::{ApiJson, ApiQuery};
use crate::app::routes::path_id;
use crate::app::services::AppServices;

/// Upper bound for the `days` window of the expiring alert.
pub const MAX_EXPIRING_DAYS: i64 = 365;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/alerts/low-stock", get(low_stock_alert))
        .route("/alerts/expiring", get(expiring_alert))
        .route("/meta/categories", get(categories))
        .route("/export", get(export_items))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/:id/quantity", patch(change_quantity))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    ApiQuery(params): ApiQuery<InventoryQueryParams>,
) -> Result<Json<Page<ItemView>>, ApiError> {
    authorize(&principal, Capability::InventoryRead)?;

    let mut query = InventoryQuery::parse(&params);
    query.filter.foodbank_id = resolve_scope(&principal, query.filter.foodbank_id)?.foodbank_id();

    let now = Utc::now();
    let page = services
        .inventory
        .list(&query.filter, query.sort, query.page, now)
        .await?;
    Ok(Json(page.map(|item| ItemView::new(item, now))))
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemView>), ApiError> {
    authorize(&principal, Capability::InventoryWrite)?;

    let foodbank_id = body
        .foodbank_id
        .or(principal.foodbank_id)
        .ok_or_else(|| ApiError::validation("foodbank_id is required"))?;
    ensure_can_mutate(&principal, foodbank_id)?;
    ensure_foodbank_exists(&services, foodbank_id).await?;

    let new = NewInventoryItem {
        foodbank_id,
        item_name: body.item_name,
        category: body.category,
        quantity: body
            .quantity
            .ok_or_else(|| ApiError::validation("quantity is required"))?,
        expiration_date: parse_optional_date(body.expiration_date.as_deref())?,
        storage_location: body.storage_location,
        dietary_category: parse_optional_dietary_category(body.dietary_category.as_deref())?,
        barcode: body.barcode,
        minimum_stock_level: body.minimum_stock_level,
    };

    let now = Utc::now();
    let item = InventoryItem::create(new, principal.user_id, now)?;
    let item = services.inventory.insert(item).await?;
    tracing::info!(item_id = %item.id, foodbank_id = %item.foodbank_id, "inventory item created");

    Ok((StatusCode::CREATED, Json(ItemView::new(item, now))))
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<ItemView>, ApiError> {
    authorize(&principal, Capability::InventoryRead)?;

    let item = load_item(&services, &id).await?;
    resolve_scope(&principal, Some(item.foodbank_id))?;

    Ok(Json(ItemView::new(item, Utc::now())))
}

/// Partial update; moving an item to another food bank is admin-only.
pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> Result<Json<ItemView>, ApiError> {
    authorize(&principal, Capability::InventoryWrite)?;

    let mut item = load_item(&services, &id).await?;
    ensure_can_mutate(&principal, item.foodbank_id)?;

    let patch = body.into_patch()?;
    if let Some(target) = patch.foodbank_id.filter(|target| *target != item.foodbank_id) {
        if principal.role != Role::Admin {
            return Err(ApiError::Forbidden(
                "only admins may move items between food banks".to_string(),
            ));
        }
        ensure_foodbank_exists(&services, target).await?;
    }

    let now = Utc::now();
    item.apply_patch(patch, principal.user_id, now)?;
    let item = services.inventory.update(item).await?;
    tracing::info!(item_id = %item.id, "inventory item updated");

    Ok(Json(ItemView::new(item, now)))
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    authorize(&principal, Capability::InventoryWrite)?;

    let item = load_item(&services, &id).await?;
    ensure_can_mutate(&principal, item.foodbank_id)?;

    services.inventory.delete(item.id).await?;
    tracing::info!(item_id = %item.id, "inventory item deleted");

    Ok(Json(json!({
        "message": "inventory item deleted",
        "id": item.id,
    })))
}

/// Set, add or subtract. A result below zero is rejected and nothing is stored.
pub async fn change_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(change): ApiJson<QuantityChange>,
) -> Result<Json<ItemView>, ApiError> {
    authorize(&principal, Capability::InventoryWrite)?;

    let mut item = load_item(&services, &id).await?;
    ensure_can_mutate(&principal, item.foodbank_id)?;

    let now = Utc::now();
    let before = item.quantity;
    item.change_quantity(change, principal.user_id, now)?;
    let item = services.inventory.update(item).await?;
    tracing::info!(
        item_id = %item.id,
        before,
        after = item.quantity,
        low_stock = item.low_stock,
        "inventory quantity changed"
    );

    Ok(Json(ItemView::new(item, now)))
}

pub async fn low_stock_alert(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<AlertQuery>,
) -> Result<Json<Value>, ApiError> {
    authorize(&principal, Capability::InventoryAlerts)?;
    let scope = resolve_scope(&principal, requested_foodbank(query.foodbank_id.as_deref()))?;

    let items = services.inventory.low_stock(scope.foodbank_id()).await?;
    let items = ItemView::many(items, Utc::now());

    Ok(Json(json!({
        "count": items.len(),
        "items": items,
    })))
}

pub async fn expiring_alert(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<ExpiringQuery>,
) -> Result<Json<Value>, ApiError> {
    authorize(&principal, Capability::InventoryAlerts)?;
    let scope = resolve_scope(&principal, requested_foodbank(query.foodbank_id.as_deref()))?;

    let days = expiring_days(query.days.as_deref());
    let now = Utc::now();
    let until = now + Duration::days(days);

    let items = services
        .inventory
        .expiring(scope.foodbank_id(), now, until)
        .await?;
    let items = ItemView::many(items, now);

    Ok(Json(json!({
        "count": items.len(),
        "days": days,
        "items": items,
    })))
}

pub async fn categories(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<AlertQuery>,
) -> Result<Json<Value>, ApiError> {
    authorize(&principal, Capability::InventoryRead)?;
    let scope = resolve_scope(&principal, requested_foodbank(query.foodbank_id.as_deref()))?;

    let categories = services.inventory.categories(scope.foodbank_id()).await?;
    let dietary: Vec<&str> = DietaryCategory::ALL.iter().map(|d| d.as_str()).collect();

    Ok(Json(json!({
        "categories": categories,
        "dietary_categories": dietary,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// Same filters and sort as the list endpoint, without pagination.
pub async fn export_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    ApiQuery(format): ApiQuery<ExportQuery>,
    ApiQuery(params): ApiQuery<InventoryQueryParams>,
) -> Result<Response, ApiError> {
    authorize(&principal, Capability::InventoryExport)?;

    let format = match format.format.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        None => ExportFormat::Csv,
        Some(raw) => ExportFormat::parse(raw).ok_or_else(|| {
            ApiError::validation(format!("unsupported export format '{raw}' (expected csv or xlsx)"))
        })?,
    };

    let mut query = InventoryQuery::parse(&params);
    query.filter.foodbank_id = resolve_scope(&principal, query.filter.foodbank_id)?.foodbank_id();

    let now = Utc::now();
    let items = services
        .inventory
        .export(&query.filter, query.sort, MAX_EXPORT_ROWS, now)
        .await?;
    let body = export::render(format, &items, now)?;
    tracing::info!(rows = items.len(), format = format.extension(), "inventory exported");

    let filename = format!(
        "inventory-export-{}.{}",
        now.format("%Y%m%d"),
        format.extension()
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}

async fn load_item(services: &AppServices, raw_id: &str) -> Result<InventoryItem, ApiError> {
    let id: ItemId = path_id(raw_id, "inventory item")?;
    services
        .inventory
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("inventory item"))
}

async fn ensure_foodbank_exists(services: &AppServices, id: FoodbankId) -> Result<(), ApiError> {
    match services.foodbanks.get(id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::InvalidReference(format!("foodbank {id} does not exist"))),
    }
}

/// Malformed ids are ignored, like other malformed query parameters.
fn requested_foodbank(raw: Option<&str>) -> Option<FoodbankId> {
    raw.and_then(|s| s.trim().parse().ok())
}

/// Missing, non-numeric or non-positive values fall back to the default
/// window; large values are capped.
fn expiring_days(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|d| *d > 0)
        .map(|d| d.min(MAX_EXPIRING_DAYS))
        .unwrap_or(EXPIRING_SOON_DAYS)
}
