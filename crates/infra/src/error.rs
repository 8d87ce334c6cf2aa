//! Storage error model shared by every store backend.
//!
//! ## Error Mapping (Postgres)
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `InvalidReference` |
//! | Database (check constraint violation) | `23514` | `Backend` |
//! | RowNotFound | N/A | `NotFound` |
//! | anything else | N/A | `Backend` |

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referenced record does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Backend failure (connection, decoding, lock poisoning...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        StoreError::Backend("lock poisoned".to_string())
    }
}

/// Map a sqlx error raised by `operation` into a [`StoreError`].
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(conflict_message(&constraint)),
                Some("23503") => StoreError::InvalidReference(reference_message(&constraint)),
                _ => StoreError::Backend(format!(
                    "database error in {operation}: {}",
                    db_err.message()
                )),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn conflict_message(constraint: &str) -> String {
    match constraint {
        "inventory_items_foodbank_barcode_key" => {
            "an item with this barcode already exists in this foodbank".to_string()
        }
        "users_email_key" => "an account with this email already exists".to_string(),
        "foodbanks_name_key" => "a foodbank with this name already exists".to_string(),
        "" => "duplicate record".to_string(),
        other => format!("duplicate value violates {other}"),
    }
}

fn reference_message(constraint: &str) -> String {
    match constraint {
        "inventory_items_foodbank_id_fkey" | "users_foodbank_id_fkey" => {
            "referenced foodbank does not exist".to_string()
        }
        "" => "referenced record does not exist".to_string(),
        other => format!("referenced record does not exist ({other})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert_eq!(map_sqlx_error("get_item", sqlx::Error::RowNotFound), StoreError::NotFound);
    }

    #[test]
    fn pool_closed_is_a_backend_error() {
        let err = map_sqlx_error("list_items", sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Backend(msg) if msg.contains("list_items")));
    }

    #[test]
    fn known_constraints_get_readable_messages() {
        assert!(conflict_message("inventory_items_foodbank_barcode_key").contains("barcode"));
        assert!(reference_message("inventory_items_foodbank_id_fkey").contains("foodbank"));
    }
}
