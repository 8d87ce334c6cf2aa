//! Postgres connection pool and schema bootstrap.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::error::{map_sqlx_error, StoreError};

/// Idempotent schema. Constraint names are relied on by the error mapping.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS foodbanks (
    id              UUID PRIMARY KEY,
    name            TEXT NOT NULL,
    address         TEXT,
    contact_email   TEXT,
    contact_phone   TEXT,
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS foodbanks_name_key ON foodbanks (LOWER(name));

CREATE TABLE IF NOT EXISTS users (
    id                  UUID PRIMARY KEY,
    email               TEXT NOT NULL,
    name                TEXT NOT NULL,
    password_hash       TEXT NOT NULL,
    role                TEXT NOT NULL,
    foodbank_id         UUID,
    email_verified      BOOLEAN NOT NULL DEFAULT FALSE,
    verification_token  TEXT,
    created_at          TIMESTAMPTZ NOT NULL,
    updated_at          TIMESTAMPTZ NOT NULL,
    CONSTRAINT users_email_key UNIQUE (email),
    CONSTRAINT users_foodbank_id_fkey FOREIGN KEY (foodbank_id) REFERENCES foodbanks (id)
);

CREATE INDEX IF NOT EXISTS users_verification_token_idx ON users (verification_token);

CREATE TABLE IF NOT EXISTS inventory_items (
    id                   UUID PRIMARY KEY,
    foodbank_id          UUID NOT NULL,
    item_name            TEXT NOT NULL,
    category             TEXT NOT NULL,
    quantity             BIGINT NOT NULL CHECK (quantity >= 0),
    expiration_date      TIMESTAMPTZ,
    storage_location     TEXT,
    dietary_category     TEXT,
    barcode              TEXT,
    minimum_stock_level  BIGINT NOT NULL DEFAULT 10 CHECK (minimum_stock_level >= 0),
    low_stock            BOOLEAN NOT NULL,
    created_at           TIMESTAMPTZ NOT NULL,
    updated_at           TIMESTAMPTZ NOT NULL,
    created_by           UUID,
    updated_by           UUID,
    CONSTRAINT inventory_items_foodbank_id_fkey FOREIGN KEY (foodbank_id) REFERENCES foodbanks (id)
);

CREATE UNIQUE INDEX IF NOT EXISTS inventory_items_foodbank_barcode_key
    ON inventory_items (foodbank_id, barcode) WHERE barcode IS NOT NULL;
CREATE INDEX IF NOT EXISTS inventory_items_foodbank_idx ON inventory_items (foodbank_id);
CREATE INDEX IF NOT EXISTS inventory_items_expiration_idx ON inventory_items (expiration_date);
"#;

/// Open a pool against `database_url`.
#[instrument(skip(database_url), err)]
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;
    info!(max_connections, "connected to postgres");
    Ok(pool)
}

/// Create tables and indexes if they do not exist yet.
#[instrument(skip(pool), err)]
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    info!("database schema ready");
    Ok(())
}

/// Escape LIKE metacharacters and wrap in `%…%`.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
