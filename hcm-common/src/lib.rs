//! # HCM Common Library
//!
//! Shared code for the HCM e-book content backend:
//! - Error taxonomy shared by every layer
//! - Bootstrap configuration loading
//! - Database initialization and schema
//! - Entity models and mutation field sets
//! - Identifier coercion, slug derivation and date helpers

pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod models;
pub mod slug;
pub mod time;

pub use error::{Error, Result, StorageError};
pub use ids::EntityId;
