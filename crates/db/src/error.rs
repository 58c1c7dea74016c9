//! Mapping from database errors to store errors.

use accord_core::store::StoreError;
use sea_orm::{DbErr, SqlErr};

/// Maps a `SeaORM` error into the store's error vocabulary.
///
/// Unique violations become `Duplicate` and connection failures
/// `Unavailable`; everything else is a `Backend` error.
pub(crate) fn map_db_err(err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return StoreError::Duplicate(detail);
    }
    match err {
        DbErr::Conn(e) => StoreError::Unavailable(e.to_string()),
        DbErr::ConnectionAcquire(e) => StoreError::Unavailable(e.to_string()),
        other => StoreError::Backend(other.to_string()),
    }
}

/// Error for a stored value the domain cannot represent.
pub(crate) fn corrupt(what: &str, value: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("invalid {what} in database: {value}"))
}
