//! Lifecycle Coordinator
//!
//! Every mutation that can carry or drop an asset runs through here, in the
//! replace-then-reap order:
//!
//! 1. store any new upload (failure aborts before the row is touched)
//! 2. read the prior slot references
//! 3. write the row; slots without a new upload keep their value
//! 4. delete the superseded blobs, best-effort
//!
//! Deleting an entity deletes the row first, then every blob it held.
//!
//! If step 3 fails after step 1 stored something, the new blob is left on
//! disk and the caller receives `Error::OrphanedAsset`. A step 3 that finds
//! no row (`NotFound`) has nothing referencing the new blob, so it is
//! removed before the error is returned.

mod sweep;

pub use sweep::DEFAULT_SWEEP_MIN_AGE;

use crate::assets::{AssetStore, StoredAsset, UploadedFile};
use crate::repo::Repository;
use hcm_common::ids::EntityId;
use hcm_common::models::{
    ClassFields, LessonFields, RegionFields, SpecialFields, TopicFields, TopicFilter,
};
use hcm_common::slug::slugify;
use hcm_common::time::now;
use hcm_common::{Error, Result, StorageError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Response shape rich-text editors expect after an inline image upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub uploaded: u8,
    pub file_name: String,
    pub url: String,
}

/// Blobs stored for the current mutation, by slot
#[derive(Debug, Default)]
struct Fresh {
    cover: Option<StoredAsset>,
    attachment: Option<StoredAsset>,
}

impl Fresh {
    fn cover(&self) -> Option<&str> {
        self.cover.as_ref().map(|a| a.reference.as_str())
    }

    fn attachment(&self) -> Option<&str> {
        self.attachment.as_ref().map(|a| a.reference.as_str())
    }

    fn references(&self) -> Vec<&str> {
        self.cover().into_iter().chain(self.attachment()).collect()
    }
}

#[derive(Clone)]
pub struct Coordinator {
    repo: Repository,
    assets: Arc<dyn AssetStore>,
}

impl Coordinator {
    pub fn new(repo: Repository, assets: Arc<dyn AssetStore>) -> Self {
        Self { repo, assets }
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    // ------------------------------------------------------------------
    // Asset plumbing
    // ------------------------------------------------------------------

    async fn accept_one(&self, upload: &UploadedFile) -> Result<StoredAsset> {
        let limit = self.assets.max_bytes();
        if upload.size() > limit {
            return Err(StorageError::TooLarge {
                size: upload.size(),
                limit,
            }
            .into());
        }

        Ok(self.assets.store(upload).await?)
    }

    /// Step 1. A failure on the second slot removes the first slot's blob,
    /// which nothing references yet.
    async fn accept(
        &self,
        cover: Option<&UploadedFile>,
        attachment: Option<&UploadedFile>,
    ) -> Result<Fresh> {
        let mut fresh = Fresh::default();

        if let Some(upload) = cover {
            fresh.cover = Some(self.accept_one(upload).await?);
        }
        if let Some(upload) = attachment {
            match self.accept_one(upload).await {
                Ok(stored) => fresh.attachment = Some(stored),
                Err(e) => {
                    self.discard(&fresh).await;
                    return Err(e);
                }
            }
        }

        Ok(fresh)
    }

    /// Best-effort delete; a failure is logged and never propagated
    async fn reap(&self, reference: &str) {
        match self.assets.delete(reference).await {
            Ok(()) => info!("Reaped asset {}", reference),
            Err(e) => warn!("Failed to delete asset {}: {}", reference, e),
        }
    }

    /// Step 4 for one slot: the prior blob goes only if a new one replaced it
    async fn reap_superseded(&self, prior: Option<&str>, fresh: Option<&str>) {
        if let (Some(prior), Some(fresh)) = (prior, fresh) {
            if prior != fresh {
                self.reap(prior).await;
            }
        }
    }

    async fn discard(&self, fresh: &Fresh) {
        for reference in fresh.references() {
            self.reap(reference).await;
        }
    }

    /// Map a failure after step 1 to the caller-visible error
    async fn settle(&self, fresh: &Fresh, err: Error) -> Error {
        let references = fresh.references();
        if references.is_empty() {
            return err;
        }

        if err.is_not_found() {
            self.discard(fresh).await;
            return err;
        }

        let reference = references.join(", ");
        error!("Row write failed, orphaned asset(s) {}: {}", reference, err);
        Error::OrphanedAsset {
            reference,
            source: Box::new(err),
        }
    }

    /// Read step for an update. Nothing references the new blobs yet, so a
    /// missing row or a failed read discards them.
    async fn prior<T>(
        &self,
        fresh: &Fresh,
        read: Result<Option<T>>,
        what: &str,
        id: EntityId,
    ) -> Result<T> {
        match read {
            Ok(Some(row)) => Ok(row),
            Ok(None) => {
                self.discard(fresh).await;
                Err(Error::NotFound(format!("{} {}", what, id)))
            }
            Err(e) => {
                self.discard(fresh).await;
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Reference checks
    // ------------------------------------------------------------------

    async fn require_class_region(&self, class_id: EntityId, region_id: EntityId) -> Result<()> {
        if self.repo.get_class(class_id).await?.is_none() {
            return Err(Error::Validation(format!("class {} does not exist", class_id)));
        }
        if self.repo.get_region(region_id).await?.is_none() {
            return Err(Error::Validation(format!("region {} does not exist", region_id)));
        }
        Ok(())
    }

    async fn require_topic(&self, book_id: Option<EntityId>) -> Result<()> {
        if let Some(book_id) = book_id {
            if self.repo.get_topic(book_id).await?.is_none() {
                return Err(Error::Validation(format!("topic {} does not exist", book_id)));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inline editor images
    // ------------------------------------------------------------------

    pub async fn upload_image(&self, upload: &UploadedFile) -> Result<ImageUploadResponse> {
        let stored = self.accept_one(upload).await?;
        info!("Stored editor image {}", stored.reference);

        Ok(ImageUploadResponse {
            uploaded: 1,
            file_name: stored.file_name,
            url: stored.reference,
        })
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    pub async fn create_class(&self, fields: &ClassFields) -> Result<EntityId> {
        fields.validate()?;
        let id = self.repo.create_class(fields).await?;
        info!("Created class {} ({})", id, fields.name.trim());
        Ok(id)
    }

    pub async fn update_class(&self, id: EntityId, fields: &ClassFields) -> Result<()> {
        fields.validate()?;
        self.repo.update_class(id, fields).await?;
        info!("Updated class {}", id);
        Ok(())
    }

    /// Refused while any topic still belongs to the class
    pub async fn delete_class(&self, id: EntityId) -> Result<()> {
        let topics = self.repo.count_topics(TopicFilter::class(id)).await?;
        if topics > 0 {
            return Err(Error::Conflict(format!("class {} still has {} topic(s)", id, topics)));
        }

        self.repo.delete_class(id).await?;
        info!("Deleted class {}", id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Regions
    // ------------------------------------------------------------------

    pub async fn create_region(
        &self,
        fields: &RegionFields,
        cover: Option<&UploadedFile>,
    ) -> Result<EntityId> {
        fields.validate()?;
        let fresh = self.accept(cover, None).await?;

        match self.repo.create_region(fields, fresh.cover()).await {
            Ok(id) => {
                info!("Created region {} ({})", id, fields.name.trim());
                Ok(id)
            }
            Err(e) => Err(self.settle(&fresh, e).await),
        }
    }

    pub async fn update_region(
        &self,
        id: EntityId,
        fields: &RegionFields,
        cover: Option<&UploadedFile>,
    ) -> Result<()> {
        fields.validate()?;
        let fresh = self.accept(cover, None).await?;

        let read = self.repo.get_region(id).await;
        let prior = self.prior(&fresh, read, "region", id).await?;

        if let Err(e) = self.repo.update_region(id, fields, fresh.cover()).await {
            return Err(self.settle(&fresh, e).await);
        }
        info!("Updated region {}", id);

        self.reap_superseded(prior.cover.as_deref(), fresh.cover()).await;
        Ok(())
    }

    pub async fn delete_region(&self, id: EntityId) -> Result<()> {
        let topics = self
            .repo
            .count_topics(TopicFilter { class_id: None, region_id: Some(id) })
            .await?;
        if topics > 0 {
            return Err(Error::Conflict(format!("region {} still has {} topic(s)", id, topics)));
        }

        let region = self
            .repo
            .get_region(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("region {}", id)))?;

        self.repo.delete_region(id).await?;
        info!("Deleted region {}", id);

        if let Some(cover) = region.cover.as_deref() {
            self.reap(cover).await;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Topics
    // ------------------------------------------------------------------

    pub async fn create_topic(
        &self,
        fields: &TopicFields,
        cover: Option<&UploadedFile>,
    ) -> Result<EntityId> {
        fields.validate()?;
        self.require_class_region(fields.class_id, fields.region_id).await?;
        let fresh = self.accept(cover, None).await?;

        match self.repo.create_topic(fields, fresh.cover()).await {
            Ok(id) => {
                info!("Created topic {} ({})", id, fields.title.trim());
                Ok(id)
            }
            Err(e) => Err(self.settle(&fresh, e).await),
        }
    }

    pub async fn update_topic(
        &self,
        id: EntityId,
        fields: &TopicFields,
        cover: Option<&UploadedFile>,
    ) -> Result<()> {
        fields.validate()?;
        self.require_class_region(fields.class_id, fields.region_id).await?;
        let fresh = self.accept(cover, None).await?;

        let read = self.repo.get_topic(id).await;
        let prior = self.prior(&fresh, read, "topic", id).await?;

        if let Err(e) = self.repo.update_topic(id, fields, fresh.cover()).await {
            return Err(self.settle(&fresh, e).await);
        }
        info!("Updated topic {}", id);

        self.reap_superseded(prior.cover.as_deref(), fresh.cover()).await;
        Ok(())
    }

    /// Lessons of the topic are kept, detached
    pub async fn delete_topic(&self, id: EntityId) -> Result<()> {
        let topic = self
            .repo
            .get_topic(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("topic {}", id)))?;

        self.repo.delete_topic(id).await?;
        info!("Deleted topic {}", id);

        if let Some(cover) = topic.cover.as_deref() {
            self.reap(cover).await;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lessons
    // ------------------------------------------------------------------

    pub async fn create_lesson(
        &self,
        fields: &LessonFields,
        attachment: Option<&UploadedFile>,
        created_by: &str,
    ) -> Result<EntityId> {
        fields.validate()?;
        self.require_topic(fields.book_id).await?;
        let fresh = self.accept(None, attachment).await?;

        match self
            .repo
            .create_lesson(fields, fresh.attachment(), created_by, now())
            .await
        {
            Ok(id) => {
                info!("Created lesson {} ({}) by {}", id, fields.title.trim(), created_by);
                Ok(id)
            }
            Err(e) => Err(self.settle(&fresh, e).await),
        }
    }

    pub async fn update_lesson(
        &self,
        id: EntityId,
        fields: &LessonFields,
        attachment: Option<&UploadedFile>,
    ) -> Result<()> {
        fields.validate()?;
        self.require_topic(fields.book_id).await?;
        let fresh = self.accept(None, attachment).await?;

        let read = self.repo.get_lesson(id).await;
        let prior = self.prior(&fresh, read, "lesson", id).await?;

        if let Err(e) = self.repo.update_lesson(id, fields, fresh.attachment()).await {
            return Err(self.settle(&fresh, e).await);
        }
        info!("Updated lesson {}", id);

        self.reap_superseded(prior.attachment.as_deref(), fresh.attachment()).await;
        Ok(())
    }

    pub async fn delete_lesson(&self, id: EntityId) -> Result<()> {
        let lesson = self
            .repo
            .get_lesson(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("lesson {}", id)))?;

        self.repo.delete_lesson(id).await?;
        info!("Deleted lesson {}", id);

        if let Some(attachment) = lesson.attachment.as_deref() {
            self.reap(attachment).await;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Special articles
    // ------------------------------------------------------------------

    pub async fn create_special(
        &self,
        fields: &SpecialFields,
        cover: Option<&UploadedFile>,
        attachment: Option<&UploadedFile>,
        created_by: &str,
    ) -> Result<EntityId> {
        fields.validate()?;
        let slug = slugify(&fields.title);
        let fresh = self.accept(cover, attachment).await?;

        match self
            .repo
            .create_special(fields, &slug, fresh.cover(), fresh.attachment(), created_by, now())
            .await
        {
            Ok(id) => {
                info!("Created special article {} ({}) by {}", id, slug, created_by);
                Ok(id)
            }
            Err(e) => Err(self.settle(&fresh, e).await),
        }
    }

    pub async fn update_special(
        &self,
        id: EntityId,
        fields: &SpecialFields,
        cover: Option<&UploadedFile>,
        attachment: Option<&UploadedFile>,
    ) -> Result<()> {
        fields.validate()?;
        let slug = slugify(&fields.title);
        let fresh = self.accept(cover, attachment).await?;

        let read = self.repo.get_special(id).await;
        let prior = self.prior(&fresh, read, "special article", id).await?;

        if let Err(e) = self
            .repo
            .update_special(id, fields, &slug, fresh.cover(), fresh.attachment())
            .await
        {
            return Err(self.settle(&fresh, e).await);
        }
        info!("Updated special article {}", id);

        self.reap_superseded(prior.cover.as_deref(), fresh.cover()).await;
        self.reap_superseded(prior.attachment.as_deref(), fresh.attachment()).await;
        Ok(())
    }

    pub async fn delete_special(&self, id: EntityId) -> Result<()> {
        let special = self
            .repo
            .get_special(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("special article {}", id)))?;

        self.repo.delete_special(id).await?;
        info!("Deleted special article {}", id);

        for reference in [special.cover.as_deref(), special.attachment.as_deref()]
            .into_iter()
            .flatten()
        {
            self.reap(reference).await;
        }
        Ok(())
    }
}
