//! Identifier coercion
//!
//! Ids are `i64` past the repository boundary. Whatever representation an id
//! arrives in (integer column, TEXT column, form field) is
//! coerced here, so grouping code only ever compares integers.

use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Backend-assigned entity identifier
pub type EntityId = i64;

/// Parse an id from request input ("12", " 12 ")
pub fn parse_id(raw: &str) -> Result<EntityId> {
    raw.trim()
        .parse::<EntityId>()
        .map_err(|_| Error::Validation(format!("'{}' is not a valid id", raw)))
}

/// Parse an optional foreign key; blank input means "none"
pub fn parse_optional_id(raw: Option<&str>) -> Result<Option<EntityId>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_id(value).map(Some),
    }
}

/// Read a non-null id column, accepting INTEGER or numeric TEXT storage
pub fn read_id(row: &SqliteRow, column: &str) -> Result<EntityId> {
    read_optional_id(row, column)?
        .ok_or_else(|| Error::Internal(format!("column {} is NULL", column)))
}

/// Read a nullable id column, accepting INTEGER or numeric TEXT storage
pub fn read_optional_id(row: &SqliteRow, column: &str) -> Result<Option<EntityId>> {
    if let Ok(value) = row.try_get::<Option<i64>, _>(column) {
        return Ok(value);
    }

    let text: Option<String> = row.try_get(column)?;
    match text.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| Error::Internal(format!("column {} holds non-numeric id '{}'", column, s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_trims_whitespace() {
        assert_eq!(parse_id(" 42 ").unwrap(), 42);
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(matches!(parse_id("4x2"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_optional_id_blank_is_none() {
        assert_eq!(parse_optional_id(None).unwrap(), None);
        assert_eq!(parse_optional_id(Some("")).unwrap(), None);
        assert_eq!(parse_optional_id(Some("  ")).unwrap(), None);
        assert_eq!(parse_optional_id(Some("7")).unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_read_id_from_text_column() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        // No declared type means no affinity, so '1' stays TEXT
        let row = sqlx::query("SELECT '1' AS class_id, 2 AS region_id, NULL AS book_id")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(read_id(&row, "class_id").unwrap(), 1);
        assert_eq!(read_id(&row, "region_id").unwrap(), 2);
        assert_eq!(read_optional_id(&row, "book_id").unwrap(), None);
    }
}
