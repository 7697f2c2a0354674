//! Special article persistence

use super::{expect_row, Repository};
use chrono::{DateTime, Utc};
use hcm_common::ids::{read_id, EntityId};
use hcm_common::models::{SpecialArticle, SpecialFields, SpecialSummary};
use hcm_common::time::format_display_date;
use hcm_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const SPECIAL_COLUMNS: &str = "id, title, slug, summary, content, cover, attachment, \
    published, created_by, created_at";

fn special_from_row(row: &SqliteRow) -> Result<SpecialArticle> {
    Ok(SpecialArticle {
        id: read_id(row, "id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        summary: row.try_get("summary")?,
        content: row.try_get("content")?,
        cover: row.try_get("cover")?,
        attachment: row.try_get("attachment")?,
        published: row.try_get("published")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

impl Repository {
    pub async fn get_special(&self, id: EntityId) -> Result<Option<SpecialArticle>> {
        let sql = format!("SELECT {} FROM special_articles WHERE id = ?", SPECIAL_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(special_from_row).transpose()
    }

    /// Public lookup; unpublished drafts read as missing
    pub async fn get_published_special(&self, id: EntityId) -> Result<Option<SpecialArticle>> {
        let sql = format!(
            "SELECT {} FROM special_articles WHERE id = ? AND published = 1",
            SPECIAL_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(special_from_row).transpose()
    }

    pub async fn list_specials(&self, published_only: bool, limit: i64) -> Result<Vec<SpecialSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, summary, cover, published, created_at
            FROM special_articles
            WHERE (?1 = 0 OR published = 1)
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(published_only)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                let created_at: DateTime<Utc> = row.try_get("created_at")?;
                Ok(SpecialSummary {
                    id: read_id(row, "id")?,
                    title: row.try_get("title")?,
                    summary: row.try_get("summary")?,
                    cover: row.try_get("cover")?,
                    published: row.try_get("published")?,
                    created_display: format_display_date(&created_at),
                    created_at,
                })
            })
            .collect()
    }

    pub async fn create_special(
        &self,
        fields: &SpecialFields,
        slug: &str,
        cover: Option<&str>,
        attachment: Option<&str>,
        created_by: &str,
        created_at: DateTime<Utc>,
    ) -> Result<EntityId> {
        let result = sqlx::query(
            r#"
            INSERT INTO special_articles
                (title, slug, summary, content, cover, attachment, published, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(fields.title.trim())
        .bind(slug)
        .bind(&fields.summary)
        .bind(&fields.content)
        .bind(cover)
        .bind(attachment)
        .bind(fields.published)
        .bind(created_by)
        .bind(created_at)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_special(
        &self,
        id: EntityId,
        fields: &SpecialFields,
        slug: &str,
        cover: Option<&str>,
        attachment: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE special_articles
            SET title = ?, slug = ?, summary = ?, content = ?, published = ?,
                cover = COALESCE(?, cover),
                attachment = COALESCE(?, attachment)
            WHERE id = ?
            "#,
        )
        .bind(fields.title.trim())
        .bind(slug)
        .bind(&fields.summary)
        .bind(&fields.content)
        .bind(fields.published)
        .bind(cover)
        .bind(attachment)
        .bind(id)
        .execute(self.pool())
        .await?;

        expect_row(result, "special article", id)
    }

    pub async fn delete_special(&self, id: EntityId) -> Result<()> {
        let result = sqlx::query("DELETE FROM special_articles WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        expect_row(result, "special article", id)
    }
}
