//! Entity models and mutation field sets
//!
//! Row types mirror the five tables. The `*Fields` types carry the columns an
//! edit overwrites in full; asset slots are never part of them because slots
//! follow replace-if-provided semantics and are handled by the coordinator.

use crate::ids::EntityId;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: EntityId,
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub cover: Option<String>,
}

/// Third hierarchy level ("book"), stored in the `books` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    /// Ordering key within (class, region); neither contiguous nor unique
    pub position: i64,
    pub class_id: EntityId,
    pub region_id: EntityId,
    pub cover: Option<String>,
}

/// Lesson ("article"); `book_id` is None for unattached lessons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: EntityId,
    pub book_id: Option<EntityId>,
    pub title: String,
    pub objectives: Option<String>,
    pub content: Option<String>,
    pub attachment: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialArticle {
    pub id: EntityId,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub cover: Option<String>,
    pub attachment: Option<String>,
    pub published: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Topic row joined with its class and region names (admin listing)
#[derive(Debug, Clone, Serialize)]
pub struct TopicListing {
    #[serde(flatten)]
    pub topic: Topic,
    pub class_name: Option<String>,
    pub region_name: Option<String>,
}

/// Lesson row reduced for listings, with the owning topic title if any
#[derive(Debug, Clone, Serialize)]
pub struct LessonSummary {
    pub id: EntityId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub created_display: String,
    pub topic: Option<String>,
}

/// Special article reduced for listings
#[derive(Debug, Clone, Serialize)]
pub struct SpecialSummary {
    pub id: EntityId,
    pub title: String,
    pub summary: Option<String>,
    pub cover: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub created_display: String,
}

/// Filter for topic listings; `None` means "any"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicFilter {
    pub class_id: Option<EntityId>,
    pub region_id: Option<EntityId>,
}

impl TopicFilter {
    pub fn class(class_id: EntityId) -> Self {
        Self { class_id: Some(class_id), region_id: None }
    }

    pub fn class_region(class_id: EntityId, region_id: EntityId) -> Self {
        Self { class_id: Some(class_id), region_id: Some(region_id) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFields {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFields {
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFields {
    pub title: String,
    pub description: Option<String>,
    pub position: i64,
    pub class_id: EntityId,
    pub region_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonFields {
    pub book_id: Option<EntityId>,
    pub title: String,
    pub objectives: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialFields {
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub published: bool,
}

impl ClassFields {
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)
    }
}

impl RegionFields {
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)
    }
}

impl TopicFields {
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)
    }
}

impl LessonFields {
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)
    }
}

impl SpecialFields {
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Blank optional text is stored as NULL
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
