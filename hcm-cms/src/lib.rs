//! hcm-cms library - content hierarchy and asset lifecycle service
//!
//! Layers, leaves first: asset store, entity repository, hierarchy resolver,
//! lifecycle coordinator, and the axum HTTP surface on top.

use axum::Router;
use hcm_common::config::ServerConfig;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod api;
pub mod assets;
pub mod error;
pub mod hierarchy;
pub mod lifecycle;
pub mod repo;

use api::SessionStore;
use assets::AssetStore;
use hierarchy::HierarchyResolver;
use lifecycle::Coordinator;
use repo::Repository;

/// Headroom on top of two maximum-size files for form fields and framing
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
    pub coordinator: Coordinator,
    pub resolver: HierarchyResolver,
    pub sessions: SessionStore,
    pub admin_user: String,
    pub admin_pass: String,
    /// Directory served under `asset_url_prefix`
    pub asset_root: PathBuf,
    pub asset_url_prefix: String,
    pub max_upload_bytes: u64,
}

impl AppState {
    /// Wire every layer around one pool and one asset store
    pub fn new(pool: SqlitePool, assets: Arc<dyn AssetStore>, config: &ServerConfig) -> Self {
        let repo = Repository::new(pool);
        Self {
            coordinator: Coordinator::new(repo.clone(), assets),
            resolver: HierarchyResolver::new(repo.clone()),
            repo,
            sessions: SessionStore::new(Duration::from_secs(config.session_ttl_secs)),
            admin_user: config.admin_user.clone(),
            admin_pass: config.admin_pass.clone(),
            asset_root: config.asset_root.clone(),
            asset_url_prefix: config.asset_url_prefix.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Request body cap: special articles carry up to two files
    fn body_limit(&self) -> usize {
        usize::try_from(self.max_upload_bytes)
            .unwrap_or(usize::MAX / 4)
            .saturating_mul(2)
            .saturating_add(BODY_LIMIT_SLACK)
    }
}

/// Build application router
///
/// Public reads, login/logout and health need no session; every other
/// `/admin` route sits behind the session gate.
pub fn build_router(state: AppState) -> Router {
    use api::{admin, public};
    use axum::extract::DefaultBodyLimit;
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::limit::RequestBodyLimitLayer;
    use tower_http::services::ServeDir;
    use tower_http::trace::TraceLayer;

    // Protected routes (require an admin session)
    let protected = Router::new()
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/upload-image", post(admin::upload_image))
        .route("/admin/classes", post(admin::create_class))
        .route("/admin/classes/delete", post(admin::delete_class))
        .route("/admin/classes/:id", post(admin::update_class))
        .route("/admin/regions", post(admin::create_region))
        .route("/admin/regions/delete", post(admin::delete_region))
        .route("/admin/regions/:id", post(admin::update_region))
        .route("/admin/book/new", post(admin::create_topic))
        .route("/admin/book/edit/:id", post(admin::update_topic))
        .route("/admin/book/delete", post(admin::delete_topic))
        .route("/admin/upload-lesson", post(admin::create_lesson))
        .route("/admin/edit/:id", post(admin::update_lesson))
        .route("/admin/delete-lesson", post(admin::delete_lesson))
        .route("/admin/special/new", post(admin::create_special))
        .route("/admin/special/edit/:id", post(admin::update_special))
        .route("/admin/special/delete", post(admin::delete_special))
        .route("/admin/assets/orphans", get(admin::list_orphans))
        .route("/admin/assets/sweep", post(admin::sweep_orphans))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_admin,
        ));

    // Public routes (no session)
    let public = Router::new()
        .route("/api/nav", get(public::get_nav))
        .route("/api/home", get(public::get_home))
        .route("/api/class/:class_id", get(public::get_class_overview))
        .route(
            "/api/class/:class_id/region/:region_id",
            get(public::get_region_listing),
        )
        .route("/api/topic/:id", get(public::get_topic))
        .route("/api/book/:id", get(public::get_book))
        .route("/api/lesson/:id", get(public::get_lesson))
        .route("/api/special/:id", get(public::get_special))
        .route("/admin/login", post(api::login))
        .route("/admin/logout", post(api::logout))
        .merge(api::health_routes());

    let assets = ServeDir::new(&state.asset_root);
    let body_limit = state.body_limit();

    Router::new()
        .merge(protected)
        .merge(public)
        .nest_service(&state.asset_url_prefix, assets)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
