//! Class persistence

use super::{expect_row, Repository};
use hcm_common::ids::{read_id, EntityId};
use hcm_common::models::{Class, ClassFields};
use hcm_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn class_from_row(row: &SqliteRow) -> Result<Class> {
    Ok(Class {
        id: read_id(row, "id")?,
        name: row.try_get("name")?,
    })
}

impl Repository {
    pub async fn get_class(&self, id: EntityId) -> Result<Option<Class>> {
        let row = sqlx::query("SELECT id, name FROM classes WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(class_from_row).transpose()
    }

    pub async fn list_classes(&self) -> Result<Vec<Class>> {
        let rows = sqlx::query("SELECT id, name FROM classes ORDER BY id")
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(class_from_row).collect()
    }

    pub async fn create_class(&self, fields: &ClassFields) -> Result<EntityId> {
        let result = sqlx::query("INSERT INTO classes (name) VALUES (?)")
            .bind(fields.name.trim())
            .execute(self.pool())
            .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_class(&self, id: EntityId, fields: &ClassFields) -> Result<()> {
        let result = sqlx::query("UPDATE classes SET name = ? WHERE id = ?")
            .bind(fields.name.trim())
            .bind(id)
            .execute(self.pool())
            .await?;

        expect_row(result, "class", id)
    }

    pub async fn delete_class(&self, id: EntityId) -> Result<()> {
        let result = sqlx::query("DELETE FROM classes WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        expect_row(result, "class", id)
    }
}
