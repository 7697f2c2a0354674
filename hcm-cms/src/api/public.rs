//! Public read routes
//!
//! JSON views of the hierarchy for the rendering layer. None of these
//! require a session.

use axum::{
    extract::{Path, State},
    Json,
};
use hcm_common::ids::parse_id;
use hcm_common::models::{Lesson, SpecialArticle, SpecialSummary, Topic};
use serde::Serialize;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::hierarchy::{ClassOverview, NavClass, RegionListing, TopicDetail};
use crate::repo::LessonOrder;
use crate::AppState;

pub const HERO_IMAGE: &str = "/public/defaults/home.jpg";
const HOME_SPECIALS: i64 = 8;

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub hero_image: String,
    pub topics: Vec<Topic>,
    pub specials: Vec<SpecialSummary>,
}

/// GET /api/nav
///
/// Navigation is decoration: a backend failure yields an empty tree.
pub async fn get_nav(State(state): State<AppState>) -> Json<Vec<NavClass>> {
    match state.resolver.build_nav().await {
        Ok(nav) => Json(nav),
        Err(e) => {
            warn!("Error building nav: {}", e);
            Json(Vec::new())
        }
    }
}

/// GET /api/home
pub async fn get_home(State(state): State<AppState>) -> Json<HomePage> {
    let topics = match state.repo.list_topics_by_position().await {
        Ok(topics) => topics,
        Err(e) => {
            warn!("Home page topics unavailable: {}", e);
            Vec::new()
        }
    };
    let specials = match state.repo.list_specials(true, HOME_SPECIALS).await {
        Ok(specials) => specials,
        Err(e) => {
            warn!("Home page specials unavailable: {}", e);
            Vec::new()
        }
    };

    Json(HomePage {
        hero_image: HERO_IMAGE.to_string(),
        topics,
        specials,
    })
}

/// GET /api/class/:class_id
pub async fn get_class_overview(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> ApiResult<Json<ClassOverview>> {
    let class_id = parse_id(&class_id)?;
    state
        .resolver
        .class_overview(class_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("class {}", class_id)))
}

/// GET /api/class/:class_id/region/:region_id
pub async fn get_region_listing(
    State(state): State<AppState>,
    Path((class_id, region_id)): Path<(String, String)>,
) -> ApiResult<Json<RegionListing>> {
    let class_id = parse_id(&class_id)?;
    let region_id = parse_id(&region_id)?;
    state
        .resolver
        .region_topics(class_id, region_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("class {} / region {}", class_id, region_id)))
}

async fn topic_view(state: &AppState, raw_id: &str, order: LessonOrder) -> ApiResult<Json<TopicDetail>> {
    let id = parse_id(raw_id)?;
    state
        .resolver
        .topic_detail(id, order)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("topic {}", id)))
}

/// GET /api/topic/:id (lessons newest first)
pub async fn get_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TopicDetail>> {
    topic_view(&state, &id, LessonOrder::NewestFirst).await
}

/// GET /api/book/:id (legacy view, lessons oldest first)
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TopicDetail>> {
    topic_view(&state, &id, LessonOrder::OldestFirst).await
}

/// GET /api/lesson/:id
pub async fn get_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Lesson>> {
    let id = parse_id(&id)?;
    state
        .repo
        .get_lesson(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("lesson {}", id)))
}

/// GET /api/special/:id (published only)
pub async fn get_special(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SpecialArticle>> {
    let id = parse_id(&id)?;
    state
        .repo
        .get_published_special(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("special article {}", id)))
}
