//! Hierarchy Resolver
//!
//! Read-only composition of repository queries into the class → region →
//! topic tree used for navigation and listing views.
//!
//! Grouping compares `i64` ids only. Ids are coerced when rows are decoded,
//! so a topic whose `class_id` was written as the text "1" groups under
//! class 1 like any other.
//!
//! Every method returns `Result`; degrading to an empty tree when the
//! backend fails is the caller's decision.

use crate::repo::{LessonOrder, Repository};
use hcm_common::ids::EntityId;
use hcm_common::models::{Class, Lesson, Region, Topic, TopicFilter};
use hcm_common::Result;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct NavClass {
    pub id: EntityId,
    pub name: String,
    pub regions: Vec<NavRegion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavRegion {
    pub id: EntityId,
    pub name: String,
    pub topics: Vec<Topic>,
}

/// Region with the topics one class holds in it
#[derive(Debug, Clone, Serialize)]
pub struct RegionTopics {
    #[serde(flatten)]
    pub region: Region,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassOverview {
    pub class: Class,
    pub regions: Vec<RegionTopics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionListing {
    pub class: Class,
    pub region: Region,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicDetail {
    pub topic: Topic,
    pub lessons: Vec<Lesson>,
}

/// Topics bucketed by (class_id, region_id), keeping their input order
fn group_topics(topics: Vec<Topic>) -> HashMap<(EntityId, EntityId), Vec<Topic>> {
    let mut groups: HashMap<(EntityId, EntityId), Vec<Topic>> = HashMap::new();
    for topic in topics {
        groups
            .entry((topic.class_id, topic.region_id))
            .or_default()
            .push(topic);
    }
    groups
}

/// Every class gets every region, each with its matching topics (possibly none)
pub fn assemble_nav(classes: Vec<Class>, regions: &[Region], topics: Vec<Topic>) -> Vec<NavClass> {
    let mut groups = group_topics(topics);

    classes
        .into_iter()
        .map(|class| {
            let regions = regions
                .iter()
                .map(|region| NavRegion {
                    id: region.id,
                    name: region.name.clone(),
                    topics: groups.remove(&(class.id, region.id)).unwrap_or_default(),
                })
                .collect();
            NavClass {
                id: class.id,
                name: class.name,
                regions,
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct HierarchyResolver {
    repo: Repository,
}

impl HierarchyResolver {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Full navigation tree from three queries
    pub async fn build_nav(&self) -> Result<Vec<NavClass>> {
        let classes = self.repo.list_classes().await?;
        let regions = self.repo.list_regions().await?;
        let topics = self.repo.list_topics(TopicFilter::default()).await?;

        Ok(assemble_nav(classes, &regions, topics))
    }

    /// One class with every region and the class's topics in each.
    /// `None` when the class does not exist.
    pub async fn class_overview(&self, class_id: EntityId) -> Result<Option<ClassOverview>> {
        let Some(class) = self.repo.get_class(class_id).await? else {
            return Ok(None);
        };

        let regions = self.repo.list_regions().await?;
        let mut groups = group_topics(self.repo.list_topics(TopicFilter::class(class_id)).await?);

        let regions = regions
            .into_iter()
            .map(|region| RegionTopics {
                topics: groups.remove(&(class.id, region.id)).unwrap_or_default(),
                region,
            })
            .collect();

        Ok(Some(ClassOverview { class, regions }))
    }

    /// Topics of one (class, region) cell; `None` if either end is missing
    pub async fn region_topics(
        &self,
        class_id: EntityId,
        region_id: EntityId,
    ) -> Result<Option<RegionListing>> {
        let Some(class) = self.repo.get_class(class_id).await? else {
            return Ok(None);
        };
        let Some(region) = self.repo.get_region(region_id).await? else {
            return Ok(None);
        };

        let topics = self
            .repo
            .list_topics(TopicFilter::class_region(class_id, region_id))
            .await?;

        Ok(Some(RegionListing { class, region, topics }))
    }

    pub async fn topic_detail(
        &self,
        topic_id: EntityId,
        order: LessonOrder,
    ) -> Result<Option<TopicDetail>> {
        let Some(topic) = self.repo.get_topic(topic_id).await? else {
            return Ok(None);
        };
        let lessons = self.repo.list_lessons_for_topic(topic_id, order).await?;

        Ok(Some(TopicDetail { topic, lessons }))
    }
}
