//! Topic ("book") persistence

use super::{expect_row, Repository};
use hcm_common::ids::{read_id, EntityId};
use hcm_common::models::{Topic, TopicFields, TopicFilter, TopicListing};
use hcm_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const TOPIC_COLUMNS: &str = "b.id AS id, b.title AS title, b.description AS description, \
    b.position AS position, b.class_id AS class_id, b.region_id AS region_id, b.cover AS cover";

fn topic_from_row(row: &SqliteRow) -> Result<Topic> {
    Ok(Topic {
        id: read_id(row, "id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        position: row.try_get("position")?,
        class_id: read_id(row, "class_id")?,
        region_id: read_id(row, "region_id")?,
        cover: row.try_get("cover")?,
    })
}

impl Repository {
    pub async fn get_topic(&self, id: EntityId) -> Result<Option<Topic>> {
        let sql = format!("SELECT {} FROM books b WHERE b.id = ?", TOPIC_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(topic_from_row).transpose()
    }

    /// Topics matching the filter, ordered by (class_id, region_id, position, id)
    pub async fn list_topics(&self, filter: TopicFilter) -> Result<Vec<Topic>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM books b
            WHERE (?1 IS NULL OR b.class_id = ?1)
              AND (?2 IS NULL OR b.region_id = ?2)
            ORDER BY b.class_id, b.region_id, b.position, b.id
            "#,
            TOPIC_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(filter.class_id)
            .bind(filter.region_id)
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(topic_from_row).collect()
    }

    /// All topics ordered by (position, id), as the home page lists them
    pub async fn list_topics_by_position(&self) -> Result<Vec<Topic>> {
        let sql = format!("SELECT {} FROM books b ORDER BY b.position, b.id", TOPIC_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;

        rows.iter().map(topic_from_row).collect()
    }

    /// Topics joined with class and region names for the admin dashboard
    pub async fn list_topics_with_names(&self) -> Result<Vec<TopicListing>> {
        let sql = format!(
            r#"
            SELECT {}, c.name AS class_name, r.name AS region_name
            FROM books b
            LEFT JOIN classes c ON b.class_id = c.id
            LEFT JOIN regions r ON b.region_id = r.id
            ORDER BY b.position, b.id
            "#,
            TOPIC_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;

        rows.iter()
            .map(|row| {
                Ok(TopicListing {
                    topic: topic_from_row(row)?,
                    class_name: row.try_get("class_name")?,
                    region_name: row.try_get("region_name")?,
                })
            })
            .collect()
    }

    pub async fn count_topics(&self, filter: TopicFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM books
            WHERE (?1 IS NULL OR class_id = ?1)
              AND (?2 IS NULL OR region_id = ?2)
            "#,
        )
        .bind(filter.class_id)
        .bind(filter.region_id)
        .fetch_one(self.pool())
        .await?;

        Ok(count)
    }

    pub async fn create_topic(&self, fields: &TopicFields, cover: Option<&str>) -> Result<EntityId> {
        let result = sqlx::query(
            r#"
            INSERT INTO books (title, description, position, class_id, region_id, cover)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(fields.position)
        .bind(fields.class_id)
        .bind(fields.region_id)
        .bind(cover)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_topic(
        &self,
        id: EntityId,
        fields: &TopicFields,
        cover: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = ?, description = ?, position = ?, class_id = ?, region_id = ?,
                cover = COALESCE(?, cover)
            WHERE id = ?
            "#,
        )
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(fields.position)
        .bind(fields.class_id)
        .bind(fields.region_id)
        .bind(cover)
        .bind(id)
        .execute(self.pool())
        .await?;

        expect_row(result, "topic", id)
    }

    /// Lessons of the topic stay behind with `book_id = NULL`
    pub async fn delete_topic(&self, id: EntityId) -> Result<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        expect_row(result, "topic", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcm_common::db::init_memory_database;
    use hcm_common::models::{ClassFields, RegionFields};

    async fn seeded() -> Repository {
        let repo = Repository::new(init_memory_database().await.unwrap());
        for name in ["Lớp 10", "Lớp 11"] {
            repo.create_class(&ClassFields { name: name.to_string() }).await.unwrap();
        }
        for name in ["Miền Bắc", "Miền Nam"] {
            let fields = RegionFields { code: None, name: name.to_string(), description: None };
            repo.create_region(&fields, None).await.unwrap();
        }
        repo
    }

    fn fields(title: &str, class_id: i64, region_id: i64, position: i64) -> TopicFields {
        TopicFields {
            title: title.to_string(),
            description: None,
            position,
            class_id,
            region_id,
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_by_position_then_id() {
        let repo = seeded().await;
        let late = repo.create_topic(&fields("late", 1, 2, 5), None).await.unwrap();
        let tie_a = repo.create_topic(&fields("tie a", 1, 2, 1), None).await.unwrap();
        let tie_b = repo.create_topic(&fields("tie b", 1, 2, 1), None).await.unwrap();
        repo.create_topic(&fields("other region", 1, 1, 0), None).await.unwrap();
        repo.create_topic(&fields("other class", 2, 2, 0), None).await.unwrap();

        let topics = repo.list_topics(TopicFilter::class_region(1, 2)).await.unwrap();
        let ids: Vec<_> = topics.iter().map(|t| t.id).collect();

        assert_eq!(ids, vec![tie_a, tie_b, late]);
        assert!(topics.iter().all(|t| t.class_id == 1 && t.region_id == 2));
    }

    #[tokio::test]
    async fn test_list_with_no_matches_is_empty() {
        let repo = seeded().await;
        repo.create_topic(&fields("a", 1, 1, 0), None).await.unwrap();

        let topics = repo.list_topics(TopicFilter::class_region(2, 2)).await.unwrap();
        assert!(topics.is_empty());
        let topics = repo.list_topics(TopicFilter::class_region(99, 99)).await.unwrap();
        assert!(topics.is_empty());
    }

    #[tokio::test]
    async fn test_unfiltered_list_orders_by_class_then_region() {
        let repo = seeded().await;
        let c2r1 = repo.create_topic(&fields("c2r1", 2, 1, 0), None).await.unwrap();
        let c1r2 = repo.create_topic(&fields("c1r2", 1, 2, 0), None).await.unwrap();
        let c1r1 = repo.create_topic(&fields("c1r1", 1, 1, 9), None).await.unwrap();

        let ids: Vec<_> = repo
            .list_topics(TopicFilter::default())
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();

        assert_eq!(ids, vec![c1r1, c1r2, c2r1]);
    }

    #[tokio::test]
    async fn test_update_keeps_cover_when_none_given() {
        let repo = seeded().await;
        let id = repo
            .create_topic(&fields("a", 1, 1, 0), Some("/public/uploads/1-x.png"))
            .await
            .unwrap();

        repo.update_topic(id, &fields("renamed", 1, 2, 3), None).await.unwrap();

        let topic = repo.get_topic(id).await.unwrap().unwrap();
        assert_eq!(topic.title, "renamed");
        assert_eq!(topic.region_id, 2);
        assert_eq!(topic.cover.as_deref(), Some("/public/uploads/1-x.png"));
    }

    #[tokio::test]
    async fn test_missing_topic() {
        let repo = seeded().await;

        assert!(repo.get_topic(404).await.unwrap().is_none());
        let err = repo.update_topic(404, &fields("a", 1, 1, 0), None).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(repo.delete_topic(404).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_listing_carries_names() {
        let repo = seeded().await;
        repo.create_topic(&fields("a", 2, 1, 0), None).await.unwrap();

        let listing = repo.list_topics_with_names().await.unwrap();
        assert_eq!(listing[0].class_name.as_deref(), Some("Lớp 11"));
        assert_eq!(listing[0].region_name.as_deref(), Some("Miền Bắc"));
    }
}
