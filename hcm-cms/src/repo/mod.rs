//! Entity Repository
//!
//! Typed CRUD over the five content tables. `get_*` returns `Ok(None)` for a
//! missing id; callers decide whether that is a 404 or ignorable. `update_*`
//! and `delete_*` on a missing id return `Error::NotFound`.
//!
//! Asset slot arguments on `update_*` use replace-if-provided semantics:
//! `None` keeps the persisted reference exactly as it is.

mod classes;
mod lessons;
mod regions;
mod specials;
mod topics;

pub use lessons::LessonOrder;

use hcm_common::{Error, Result};
use sqlx::sqlite::SqliteQueryResult;
use sqlx::SqlitePool;
use std::collections::HashSet;

/// Handle over the relational backend, constructed once with the shared pool
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Every non-null asset reference held by any row
    pub async fn referenced_assets(&self) -> Result<HashSet<String>> {
        let references: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT cover FROM regions WHERE cover IS NOT NULL
            UNION SELECT cover FROM books WHERE cover IS NOT NULL
            UNION SELECT attachment FROM lessons WHERE attachment IS NOT NULL
            UNION SELECT cover FROM special_articles WHERE cover IS NOT NULL
            UNION SELECT attachment FROM special_articles WHERE attachment IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(references.into_iter().collect())
    }

    /// Rich-text and description bodies, which may embed editor image URLs
    pub async fn rich_text_bodies(&self) -> Result<Vec<String>> {
        let bodies: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT content FROM lessons WHERE content IS NOT NULL
            UNION ALL SELECT objectives FROM lessons WHERE objectives IS NOT NULL
            UNION ALL SELECT content FROM special_articles WHERE content IS NOT NULL
            UNION ALL SELECT summary FROM special_articles WHERE summary IS NOT NULL
            UNION ALL SELECT description FROM books WHERE description IS NOT NULL
            UNION ALL SELECT description FROM regions WHERE description IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(bodies)
    }
}

/// Map "no row touched" to NotFound
fn expect_row(result: SqliteQueryResult, what: &str, id: i64) -> Result<()> {
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("{} {}", what, id)));
    }
    Ok(())
}
