//! Region persistence

use super::{expect_row, Repository};
use hcm_common::ids::{read_id, EntityId};
use hcm_common::models::{Region, RegionFields};
use hcm_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const REGION_COLUMNS: &str = "id, code, name, description, cover";

fn region_from_row(row: &SqliteRow) -> Result<Region> {
    Ok(Region {
        id: read_id(row, "id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        cover: row.try_get("cover")?,
    })
}

impl Repository {
    pub async fn get_region(&self, id: EntityId) -> Result<Option<Region>> {
        let sql = format!("SELECT {} FROM regions WHERE id = ?", REGION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(region_from_row).transpose()
    }

    pub async fn list_regions(&self) -> Result<Vec<Region>> {
        let sql = format!("SELECT {} FROM regions ORDER BY id", REGION_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;

        rows.iter().map(region_from_row).collect()
    }

    pub async fn create_region(&self, fields: &RegionFields, cover: Option<&str>) -> Result<EntityId> {
        let result = sqlx::query(
            "INSERT INTO regions (code, name, description, cover) VALUES (?, ?, ?, ?)",
        )
        .bind(&fields.code)
        .bind(fields.name.trim())
        .bind(&fields.description)
        .bind(cover)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_region(
        &self,
        id: EntityId,
        fields: &RegionFields,
        cover: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE regions
            SET code = ?, name = ?, description = ?, cover = COALESCE(?, cover)
            WHERE id = ?
            "#,
        )
        .bind(&fields.code)
        .bind(fields.name.trim())
        .bind(&fields.description)
        .bind(cover)
        .bind(id)
        .execute(self.pool())
        .await?;

        expect_row(result, "region", id)
    }

    pub async fn delete_region(&self, id: EntityId) -> Result<()> {
        let result = sqlx::query("DELETE FROM regions WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        expect_row(result, "region", id)
    }
}
