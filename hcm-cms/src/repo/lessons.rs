//! Lesson ("article") persistence

use super::{expect_row, Repository};
use chrono::{DateTime, Utc};
use hcm_common::ids::{read_id, read_optional_id, EntityId};
use hcm_common::models::{Lesson, LessonFields, LessonSummary};
use hcm_common::time::format_display_date;
use hcm_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const LESSON_COLUMNS: &str =
    "id, book_id, title, objectives, content, attachment, created_by, created_at";

/// Listing order for the lessons of one topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonOrder {
    /// Topic detail view
    NewestFirst,
    /// Legacy book view
    OldestFirst,
}

fn lesson_from_row(row: &SqliteRow) -> Result<Lesson> {
    Ok(Lesson {
        id: read_id(row, "id")?,
        book_id: read_optional_id(row, "book_id")?,
        title: row.try_get("title")?,
        objectives: row.try_get("objectives")?,
        content: row.try_get("content")?,
        attachment: row.try_get("attachment")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

impl Repository {
    pub async fn get_lesson(&self, id: EntityId) -> Result<Option<Lesson>> {
        let sql = format!("SELECT {} FROM lessons WHERE id = ?", LESSON_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(lesson_from_row).transpose()
    }

    pub async fn list_lessons_for_topic(
        &self,
        topic_id: EntityId,
        order: LessonOrder,
    ) -> Result<Vec<Lesson>> {
        let order_by = match order {
            LessonOrder::NewestFirst => "created_at DESC, id DESC",
            LessonOrder::OldestFirst => "created_at ASC, id ASC",
        };
        let sql = format!(
            "SELECT {} FROM lessons WHERE book_id = ? ORDER BY {}",
            LESSON_COLUMNS, order_by
        );
        let rows = sqlx::query(&sql)
            .bind(topic_id)
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(lesson_from_row).collect()
    }

    /// Newest lessons with their topic title; unattached lessons have none
    pub async fn list_recent_lessons(&self, limit: i64) -> Result<Vec<LessonSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id AS id, l.title AS title, l.created_at AS created_at, b.title AS topic
            FROM lessons l
            LEFT JOIN books b ON l.book_id = b.id
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                let created_at: DateTime<Utc> = row.try_get("created_at")?;
                Ok(LessonSummary {
                    id: read_id(row, "id")?,
                    title: row.try_get("title")?,
                    created_display: format_display_date(&created_at),
                    created_at,
                    topic: row.try_get("topic")?,
                })
            })
            .collect()
    }

    pub async fn create_lesson(
        &self,
        fields: &LessonFields,
        attachment: Option<&str>,
        created_by: &str,
        created_at: DateTime<Utc>,
    ) -> Result<EntityId> {
        let result = sqlx::query(
            r#"
            INSERT INTO lessons (book_id, title, objectives, content, attachment, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(fields.book_id)
        .bind(fields.title.trim())
        .bind(&fields.objectives)
        .bind(&fields.content)
        .bind(attachment)
        .bind(created_by)
        .bind(created_at)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Full overwrite of the editable columns; `created_*` never change
    pub async fn update_lesson(
        &self,
        id: EntityId,
        fields: &LessonFields,
        attachment: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE lessons
            SET book_id = ?, title = ?, objectives = ?, content = ?,
                attachment = COALESCE(?, attachment)
            WHERE id = ?
            "#,
        )
        .bind(fields.book_id)
        .bind(fields.title.trim())
        .bind(&fields.objectives)
        .bind(&fields.content)
        .bind(attachment)
        .bind(id)
        .execute(self.pool())
        .await?;

        expect_row(result, "lesson", id)
    }

    pub async fn delete_lesson(&self, id: EntityId) -> Result<()> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        expect_row(result, "lesson", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hcm_common::db::init_memory_database;
    use hcm_common::models::{ClassFields, RegionFields, TopicFields};

    fn lesson(title: &str, book_id: Option<EntityId>) -> LessonFields {
        LessonFields {
            book_id,
            title: title.to_string(),
            objectives: None,
            content: Some("<p>nội dung</p>".to_string()),
        }
    }

    async fn repo_with_topic() -> (Repository, EntityId) {
        let repo = Repository::new(init_memory_database().await.unwrap());
        let class_id = repo.create_class(&ClassFields { name: "Lớp 10".into() }).await.unwrap();
        let region_id = repo
            .create_region(&RegionFields { code: None, name: "Miền Nam".into(), description: None }, None)
            .await
            .unwrap();
        let topic_id = repo
            .create_topic(
                &TopicFields {
                    title: "Topic A".into(),
                    description: None,
                    position: 0,
                    class_id,
                    region_id,
                },
                None,
            )
            .await
            .unwrap();
        (repo, topic_id)
    }

    #[tokio::test]
    async fn test_lessons_ordered_by_creation() {
        let (repo, topic_id) = repo_with_topic().await;
        let base = Utc::now();
        let old = repo.create_lesson(&lesson("old", Some(topic_id)), None, "admin", base).await.unwrap();
        let new = repo
            .create_lesson(&lesson("new", Some(topic_id)), None, "admin", base + Duration::seconds(5))
            .await
            .unwrap();
        repo.create_lesson(&lesson("loose", None), None, "admin", base).await.unwrap();

        let newest: Vec<_> = repo
            .list_lessons_for_topic(topic_id, LessonOrder::NewestFirst)
            .await
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        let oldest: Vec<_> = repo
            .list_lessons_for_topic(topic_id, LessonOrder::OldestFirst)
            .await
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();

        assert_eq!(newest, vec![new, old]);
        assert_eq!(oldest, vec![old, new]);
    }

    #[tokio::test]
    async fn test_topic_delete_detaches_lessons() {
        let (repo, topic_id) = repo_with_topic().await;
        let id = repo
            .create_lesson(&lesson("kept", Some(topic_id)), None, "admin", Utc::now())
            .await
            .unwrap();

        repo.delete_topic(topic_id).await.unwrap();

        let lesson = repo.get_lesson(id).await.unwrap().unwrap();
        assert_eq!(lesson.book_id, None);
    }

    #[tokio::test]
    async fn test_recent_lessons_tolerate_unattached() {
        let (repo, topic_id) = repo_with_topic().await;
        let now = Utc::now();
        repo.create_lesson(&lesson("attached", Some(topic_id)), None, "admin", now).await.unwrap();
        repo.create_lesson(&lesson("loose", None), None, "admin", now + Duration::seconds(1))
            .await
            .unwrap();

        let recent = repo.list_recent_lessons(50).await.unwrap();

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].title, "loose");
        assert_eq!(recent[0].topic, None);
        assert_eq!(recent[1].topic.as_deref(), Some("Topic A"));
    }

    #[tokio::test]
    async fn test_update_preserves_creation_fields() {
        let (repo, topic_id) = repo_with_topic().await;
        let created = Utc::now() - Duration::days(3);
        let id = repo
            .create_lesson(&lesson("a", Some(topic_id)), Some("/public/uploads/1-a.pdf"), "editor", created)
            .await
            .unwrap();

        repo.update_lesson(id, &lesson("b", None), None).await.unwrap();

        let lesson = repo.get_lesson(id).await.unwrap().unwrap();
        assert_eq!(lesson.title, "b");
        assert_eq!(lesson.book_id, None);
        assert_eq!(lesson.created_by, "editor");
        assert_eq!(lesson.created_at.timestamp(), created.timestamp());
        assert_eq!(lesson.attachment.as_deref(), Some("/public/uploads/1-a.pdf"));
    }
}
