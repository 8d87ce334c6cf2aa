use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use bytebasket_core::{FoodbankId, Page, PageRequest};
use bytebasket_foodbanks::Foodbank;

use super::FoodbankStore;
use crate::db::like_pattern;
use crate::error::{map_sqlx_error, StoreError};

#[derive(Debug, Clone)]
pub struct PostgresFoodbankStore {
    pool: Arc<PgPool>,
}

impl PostgresFoodbankStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

struct FoodbankRow {
    id: Uuid,
    name: String,
    address: Option<String>,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for FoodbankRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(FoodbankRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            contact_email: row.try_get("contact_email")?,
            contact_phone: row.try_get("contact_phone")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<FoodbankRow> for Foodbank {
    fn from(row: FoodbankRow) -> Self {
        Foodbank {
            id: FoodbankId::from_uuid(row.id),
            name: row.name,
            address: row.address,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait::async_trait]
impl FoodbankStore for PostgresFoodbankStore {
    #[instrument(skip(self, foodbank), fields(foodbank_id = %foodbank.id), err)]
    async fn insert(&self, foodbank: Foodbank) -> Result<Foodbank, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO foodbanks (id, name, address, contact_email, contact_phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(foodbank.id.as_uuid())
        .bind(&foodbank.name)
        .bind(&foodbank.address)
        .bind(&foodbank.contact_email)
        .bind(&foodbank.contact_phone)
        .bind(foodbank.created_at)
        .bind(foodbank.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_foodbank", e))?;

        Ok(foodbank)
    }

    #[instrument(skip(self), fields(foodbank_id = %id), err)]
    async fn get(&self, id: FoodbankId) -> Result<Option<Foodbank>, StoreError> {
        let row = sqlx::query_as::<_, FoodbankRow>(
            r#"
            SELECT id, name, address, contact_email, contact_phone, created_at, updated_at
            FROM foodbanks
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_foodbank", e))?;

        Ok(row.map(Foodbank::from))
    }

    #[instrument(skip(self), err)]
    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Foodbank>, StoreError> {
        let pattern = search.map(like_pattern);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM foodbanks
            WHERE ($1::text IS NULL OR name ILIKE $1 OR address ILIKE $1)
            "#,
        )
        .bind(&pattern)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_foodbanks", e))?;

        let rows = sqlx::query_as::<_, FoodbankRow>(
            r#"
            SELECT id, name, address, contact_email, contact_phone, created_at, updated_at
            FROM foodbanks
            WHERE ($1::text IS NULL OR name ILIKE $1 OR address ILIKE $1)
            ORDER BY LOWER(name) COLLATE "C" ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_foodbanks", e))?;

        let items = rows.into_iter().map(Foodbank::from).collect();
        Ok(Page::new(items, page, total.max(0) as u64))
    }
}
