//! HTTP API handlers for hcm-cms

pub mod admin;
pub mod auth;
pub mod health;
pub mod public;
pub mod upload;

pub use auth::{login, logout, require_admin, AdminUser, SessionStore};
pub use health::health_routes;
