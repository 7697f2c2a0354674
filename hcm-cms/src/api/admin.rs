//! Admin mutation routes
//!
//! Thin translation from form/multipart input to coordinator calls. Routes
//! with an asset slot take multipart bodies; the rest take URL-encoded forms.

use axum::{
    extract::{Multipart, Path, Query, State},
    Extension, Form, Json,
};
use hcm_common::ids::{parse_id, EntityId};
use hcm_common::models::{
    ClassFields, LessonFields, LessonSummary, RegionFields, SpecialFields,
    SpecialSummary, TopicFields, TopicListing,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::auth::AdminUser;
use super::upload::MultipartForm;
use crate::error::{ApiError, ApiResult};
use crate::lifecycle::{ImageUploadResponse, DEFAULT_SWEEP_MIN_AGE};
use crate::AppState;

const DASHBOARD_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub success: bool,
    pub id: EntityId,
}

impl MutationResponse {
    fn ok(id: EntityId) -> Json<Self> {
        Json(Self { success: true, id })
    }
}

#[derive(Debug, Deserialize)]
pub struct IdForm {
    pub id: String,
}

impl IdForm {
    fn id(&self) -> ApiResult<EntityId> {
        Ok(parse_id(&self.id)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct ClassForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub topics: Vec<TopicListing>,
    pub lessons: Vec<LessonSummary>,
    pub specials: Vec<SpecialSummary>,
}

/// GET /admin/dashboard
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<Dashboard>> {
    Ok(Json(Dashboard {
        topics: state.repo.list_topics_with_names().await?,
        lessons: state.repo.list_recent_lessons(DASHBOARD_LIMIT).await?,
        specials: state.repo.list_specials(false, DASHBOARD_LIMIT).await?,
    }))
}

/// POST /admin/upload-image (field `upload`)
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ImageUploadResponse>> {
    let form = MultipartForm::read(multipart).await?;
    let upload = form.file("upload").ok_or_else(|| {
        ApiError::BadRequest(
            "No file received. Send multipart/form-data with the file in field \"upload\"."
                .to_string(),
        )
    })?;

    Ok(Json(state.coordinator.upload_image(upload).await?))
}

// ----------------------------------------------------------------------
// Classes
// ----------------------------------------------------------------------

fn class_fields(form: ClassForm) -> ClassFields {
    ClassFields { name: form.name }
}

/// POST /admin/classes
pub async fn create_class(
    State(state): State<AppState>,
    Form(form): Form<ClassForm>,
) -> ApiResult<Json<MutationResponse>> {
    let id = state.coordinator.create_class(&class_fields(form)).await?;
    Ok(MutationResponse::ok(id))
}

/// POST /admin/classes/:id
pub async fn update_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<ClassForm>,
) -> ApiResult<Json<MutationResponse>> {
    let id = parse_id(&id)?;
    state.coordinator.update_class(id, &class_fields(form)).await?;
    Ok(MutationResponse::ok(id))
}

/// POST /admin/classes/delete
pub async fn delete_class(
    State(state): State<AppState>,
    Form(form): Form<IdForm>,
) -> ApiResult<Json<MutationResponse>> {
    let id = form.id()?;
    state.coordinator.delete_class(id).await?;
    Ok(MutationResponse::ok(id))
}

// ----------------------------------------------------------------------
// Regions
// ----------------------------------------------------------------------

fn region_fields(form: &MultipartForm) -> RegionFields {
    RegionFields {
        code: form.optional_text("code"),
        name: form.text_or_empty("name"),
        description: form.optional_text("description"),
    }
}

/// POST /admin/regions (field `cover`)
pub async fn create_region(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<MutationResponse>> {
    let form = MultipartForm::read(multipart).await?;
    let id = state
        .coordinator
        .create_region(&region_fields(&form), form.file("cover"))
        .await?;
    Ok(MutationResponse::ok(id))
}

/// POST /admin/regions/:id (field `cover`)
pub async fn update_region(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<MutationResponse>> {
    let id = parse_id(&id)?;
    let form = MultipartForm::read(multipart).await?;
    state
        .coordinator
        .update_region(id, &region_fields(&form), form.file("cover"))
        .await?;
    Ok(MutationResponse::ok(id))
}

/// POST /admin/regions/delete
pub async fn delete_region(
    State(state): State<AppState>,
    Form(form): Form<IdForm>,
) -> ApiResult<Json<MutationResponse>> {
    let id = form.id()?;
    state.coordinator.delete_region(id).await?;
    Ok(MutationResponse::ok(id))
}

// ----------------------------------------------------------------------
// Topics ("books")
// ----------------------------------------------------------------------

fn topic_fields(form: &MultipartForm) -> ApiResult<TopicFields> {
    Ok(TopicFields {
        title: form.text_or_empty("title"),
        description: form.optional_text("description"),
        position: form.position("position")?,
        class_id: form.id("class_id")?,
        region_id: form.id("region_id")?,
    })
}

/// POST /admin/book/new (field `cover`)
pub async fn create_topic(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<MutationResponse>> {
    let form = MultipartForm::read(multipart).await?;
    let fields = topic_fields(&form)?;
    let id = state.coordinator.create_topic(&fields, form.file("cover")).await?;
    Ok(MutationResponse::ok(id))
}

/// POST /admin/book/edit/:id (field `cover`)
pub async fn update_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<MutationResponse>> {
    let id = parse_id(&id)?;
    let form = MultipartForm::read(multipart).await?;
    let fields = topic_fields(&form)?;
    state
        .coordinator
        .update_topic(id, &fields, form.file("cover"))
        .await?;
    Ok(MutationResponse::ok(id))
}

/// POST /admin/book/delete
pub async fn delete_topic(
    State(state): State<AppState>,
    Form(form): Form<IdForm>,
) -> ApiResult<Json<MutationResponse>> {
    let id = form.id()?;
    state.coordinator.delete_topic(id).await?;
    Ok(MutationResponse::ok(id))
}

// ----------------------------------------------------------------------
// Lessons
// ----------------------------------------------------------------------

fn lesson_fields(form: &MultipartForm) -> ApiResult<LessonFields> {
    Ok(LessonFields {
        book_id: form.optional_id("book_id")?,
        title: form.text_or_empty("title"),
        objectives: form.optional_text("objectives"),
        content: form.text("content").map(str::to_string),
    })
}

/// POST /admin/upload-lesson (field `attachment`)
pub async fn create_lesson(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    multipart: Multipart,
) -> ApiResult<Json<MutationResponse>> {
    let form = MultipartForm::read(multipart).await?;
    let fields = lesson_fields(&form)?;
    let id = state
        .coordinator
        .create_lesson(&fields, form.file("attachment"), admin.name())
        .await?;
    Ok(MutationResponse::ok(id))
}

/// POST /admin/edit/:id (field `attachment`)
pub async fn update_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<MutationResponse>> {
    let id = parse_id(&id)?;
    let form = MultipartForm::read(multipart).await?;
    let fields = lesson_fields(&form)?;
    state
        .coordinator
        .update_lesson(id, &fields, form.file("attachment"))
        .await?;
    Ok(MutationResponse::ok(id))
}

/// POST /admin/delete-lesson
pub async fn delete_lesson(
    State(state): State<AppState>,
    Form(form): Form<IdForm>,
) -> ApiResult<Json<MutationResponse>> {
    let id = form.id()?;
    state.coordinator.delete_lesson(id).await?;
    Ok(MutationResponse::ok(id))
}

// ----------------------------------------------------------------------
// Special articles
// ----------------------------------------------------------------------

fn special_fields(form: &MultipartForm) -> SpecialFields {
    SpecialFields {
        title: form.text_or_empty("title"),
        summary: form.optional_text("summary"),
        content: form.text("content").map(str::to_string),
        published: form.flag("published"),
    }
}

/// POST /admin/special/new (fields `cover`, `attachment`)
pub async fn create_special(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    multipart: Multipart,
) -> ApiResult<Json<MutationResponse>> {
    let form = MultipartForm::read(multipart).await?;
    let id = state
        .coordinator
        .create_special(
            &special_fields(&form),
            form.file("cover"),
            form.file("attachment"),
            admin.name(),
        )
        .await?;
    Ok(MutationResponse::ok(id))
}

/// POST /admin/special/edit/:id (fields `cover`, `attachment`)
pub async fn update_special(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<MutationResponse>> {
    let id = parse_id(&id)?;
    let form = MultipartForm::read(multipart).await?;
    state
        .coordinator
        .update_special(id, &special_fields(&form), form.file("cover"), form.file("attachment"))
        .await?;
    Ok(MutationResponse::ok(id))
}

/// POST /admin/special/delete
pub async fn delete_special(
    State(state): State<AppState>,
    Form(form): Form<IdForm>,
) -> ApiResult<Json<MutationResponse>> {
    let id = form.id()?;
    state.coordinator.delete_special(id).await?;
    Ok(MutationResponse::ok(id))
}

// ----------------------------------------------------------------------
// Asset reconciliation
// ----------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct OrphanEntry {
    pub file_name: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct SweepQuery {
    /// Minimum age in seconds; defaults to one hour
    pub min_age_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub success: bool,
    pub removed: Vec<String>,
}

/// GET /admin/assets/orphans
pub async fn list_orphans(State(state): State<AppState>) -> ApiResult<Json<Vec<OrphanEntry>>> {
    let orphans = state.coordinator.find_orphans().await?;
    Ok(Json(
        orphans
            .into_iter()
            .map(|file| OrphanEntry {
                file_name: file.file_name,
                reference: file.reference,
            })
            .collect(),
    ))
}

/// POST /admin/assets/sweep
pub async fn sweep_orphans(
    State(state): State<AppState>,
    Query(query): Query<SweepQuery>,
) -> ApiResult<Json<SweepResponse>> {
    let min_age = query
        .min_age_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_SWEEP_MIN_AGE);
    let removed = state.coordinator.sweep_orphans(min_age).await?;
    Ok(Json(SweepResponse {
        success: true,
        removed,
    }))
}
