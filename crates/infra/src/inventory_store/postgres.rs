//! Postgres-backed item store.
//!
//! Filters are pushed through `sqlx::QueryBuilder` as bound parameters; the
//! only interpolated SQL is the ORDER BY clause, built from the sort
//! allow-list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use bytebasket_core::{FoodbankId, ItemId, Page, PageRequest, UserId};
use bytebasket_inventory::stock::EXPIRING_SOON_DAYS;
use bytebasket_inventory::{DietaryCategory, InventoryFilter, InventoryItem, SortColumn, SortOrder, SortSpec};

use super::InventoryStore;
use crate::db::like_pattern;
use crate::error::{map_sqlx_error, StoreError};

const SELECT_COLUMNS: &str = r#"
SELECT
    id,
    foodbank_id,
    item_name,
    category,
    quantity,
    expiration_date,
    storage_location,
    dietary_category,
    barcode,
    minimum_stock_level,
    low_stock,
    created_at,
    updated_at,
    created_by,
    updated_by
FROM inventory_items
"#;

#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &InventoryFilter, now: DateTime<Utc>) {
    builder.push(" WHERE TRUE");

    if let Some(foodbank_id) = filter.foodbank_id {
        builder.push(" AND foodbank_id = ").push_bind(*foodbank_id.as_uuid());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (item_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR category ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = &filter.category {
        builder
            .push(" AND LOWER(category) = LOWER(")
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(dietary) = filter.dietary_category {
        builder
            .push(" AND dietary_category = ")
            .push_bind(dietary.as_str());
    }
    if let Some(location) = &filter.storage_location {
        builder
            .push(" AND storage_location ILIKE ")
            .push_bind(like_pattern(location));
    }
    if filter.expiring_soon {
        builder
            .push(" AND expiration_date >= ")
            .push_bind(now)
            .push(" AND expiration_date <= ")
            .push_bind(now + chrono::Duration::days(EXPIRING_SOON_DAYS));
    }
    if filter.low_stock_only {
        builder.push(" AND low_stock");
    }
}

fn order_by(sort: SortSpec) -> String {
    let column = sort.column.as_str();
    // Byte-wise collation so text orders the same as the in-memory store.
    let expr = if sort.column.is_text() {
        format!("LOWER({column}) COLLATE \"C\"")
    } else {
        column.to_string()
    };
    format!(
        " ORDER BY {expr} {} NULLS LAST, id ASC",
        sort.order.as_sql()
    )
}

struct ItemRow {
    id: Uuid,
    foodbank_id: Uuid,
    item_name: String,
    category: String,
    quantity: i64,
    expiration_date: Option<DateTime<Utc>>,
    storage_location: Option<String>,
    dietary_category: Option<String>,
    barcode: Option<String>,
    minimum_stock_level: i64,
    low_stock: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Option<Uuid>,
    updated_by: Option<Uuid>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ItemRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            foodbank_id: row.try_get("foodbank_id")?,
            item_name: row.try_get("item_name")?,
            category: row.try_get("category")?,
            quantity: row.try_get("quantity")?,
            expiration_date: row.try_get("expiration_date")?,
            storage_location: row.try_get("storage_location")?,
            dietary_category: row.try_get("dietary_category")?,
            barcode: row.try_get("barcode")?,
            minimum_stock_level: row.try_get("minimum_stock_level")?,
            low_stock: row.try_get("low_stock")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            created_by: row.try_get("created_by")?,
            updated_by: row.try_get("updated_by")?,
        })
    }
}

impl TryFrom<ItemRow> for InventoryItem {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let dietary_category = row
            .dietary_category
            .as_deref()
            .map(str::parse::<DietaryCategory>)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("failed to decode item row: {e}")))?;

        Ok(InventoryItem {
            id: ItemId::from_uuid(row.id),
            foodbank_id: FoodbankId::from_uuid(row.foodbank_id),
            item_name: row.item_name,
            category: row.category,
            quantity: row.quantity,
            expiration_date: row.expiration_date,
            storage_location: row.storage_location,
            dietary_category,
            barcode: row.barcode,
            minimum_stock_level: row.minimum_stock_level,
            low_stock: row.low_stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by.map(UserId::from_uuid),
            updated_by: row.updated_by.map(UserId::from_uuid),
        })
    }
}

fn into_items(rows: Vec<ItemRow>) -> Result<Vec<InventoryItem>, StoreError> {
    rows.into_iter().map(InventoryItem::try_from).collect()
}

impl PostgresInventoryStore {
    async fn fetch_sorted(
        &self,
        operation: &str,
        filter: &InventoryFilter,
        sort: SortSpec,
        limit: i64,
        offset: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<InventoryItem>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        push_filter(&mut builder, filter, now);
        builder.push(order_by(sort));
        builder.push(" LIMIT ").push_bind(limit);
        builder.push(" OFFSET ").push_bind(offset);

        let rows = builder
            .build_query_as::<ItemRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        into_items(rows)
    }
}

#[async_trait::async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self, item), fields(item_id = %item.id, foodbank_id = %item.foodbank_id), err)]
    async fn insert(&self, item: InventoryItem) -> Result<InventoryItem, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, foodbank_id, item_name, category, quantity, expiration_date,
                storage_location, dietary_category, barcode, minimum_stock_level,
                low_stock, created_at, updated_at, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.foodbank_id.as_uuid())
        .bind(&item.item_name)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(item.expiration_date)
        .bind(&item.storage_location)
        .bind(item.dietary_category.map(|d| d.as_str()))
        .bind(&item.barcode)
        .bind(item.minimum_stock_level)
        .bind(item.low_stock)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(item.created_by.map(|u| *u.as_uuid()))
        .bind(item.updated_by.map(|u| *u.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;

        Ok(item)
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn get(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;

        row.map(InventoryItem::try_from).transpose()
    }

    #[instrument(skip(self, item), fields(item_id = %item.id), err)]
    async fn update(&self, item: InventoryItem) -> Result<InventoryItem, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET
                foodbank_id = $2,
                item_name = $3,
                category = $4,
                quantity = $5,
                expiration_date = $6,
                storage_location = $7,
                dietary_category = $8,
                barcode = $9,
                minimum_stock_level = $10,
                low_stock = $11,
                updated_at = $12,
                updated_by = $13
            WHERE id = $1
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.foodbank_id.as_uuid())
        .bind(&item.item_name)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(item.expiration_date)
        .bind(&item.storage_location)
        .bind(item.dietary_category.map(|d| d.as_str()))
        .bind(&item.barcode)
        .bind(item.minimum_stock_level)
        .bind(item.low_stock)
        .bind(item.updated_at)
        .bind(item.updated_by.map(|u| *u.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(item)
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn delete(&self, id: ItemId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, filter), fields(page = page.page, limit = page.limit), err)]
    async fn list(
        &self,
        filter: &InventoryFilter,
        sort: SortSpec,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<InventoryItem>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM inventory_items");
        push_filter(&mut count, filter, now);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_items", e))?;

        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let items = self
            .fetch_sorted("list_items", filter, sort, i64::from(page.limit), offset, now)
            .await?;

        Ok(Page::new(items, page, total.max(0) as u64))
    }

    #[instrument(skip(self, filter), err)]
    async fn export(
        &self,
        filter: &InventoryFilter,
        sort: SortSpec,
        max_rows: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<InventoryItem>, StoreError> {
        self.fetch_sorted("export_items", filter, sort, i64::from(max_rows), 0, now)
            .await
    }

    #[instrument(skip(self), err)]
    async fn low_stock(&self, foodbank_id: Option<FoodbankId>) -> Result<Vec<InventoryItem>, StoreError> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE low_stock AND ($1::uuid IS NULL OR foodbank_id = $1){}",
            order_by(SortSpec::new(SortColumn::Quantity, SortOrder::Asc))
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(foodbank_id.map(|id| *id.as_uuid()))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("low_stock_items", e))?;
        into_items(rows)
    }

    #[instrument(skip(self), err)]
    async fn expiring(
        &self,
        foodbank_id: Option<FoodbankId>,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<InventoryItem>, StoreError> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE expiration_date >= $2 AND expiration_date <= $3 \
             AND ($1::uuid IS NULL OR foodbank_id = $1){}",
            order_by(SortSpec::new(SortColumn::ExpirationDate, SortOrder::Asc))
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(foodbank_id.map(|id| *id.as_uuid()))
            .bind(now)
            .bind(until)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("expiring_items", e))?;
        into_items(rows)
    }

    #[instrument(skip(self), err)]
    async fn categories(&self, foodbank_id: Option<FoodbankId>) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT category
            FROM inventory_items
            WHERE ($1::uuid IS NULL OR foodbank_id = $1)
            ORDER BY category
            "#,
        )
        .bind(foodbank_id.map(|id| *id.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("item_categories", e))
    }
}
