//! Shared test infrastructure for hcm-cms integration tests
//!
//! - RecordingStore: AssetStore double that counts calls and can be told to fail
//! - TestEnv: in-memory database + temp asset root + coordinator
//! - Seeding helpers for the class/region grid

#![allow(dead_code)]

use async_trait::async_trait;
use hcm_cms::assets::{AssetStore, FsAssetStore, StoredAsset, StoredFile, UploadedFile};
use hcm_cms::hierarchy::HierarchyResolver;
use hcm_cms::lifecycle::Coordinator;
use hcm_cms::repo::Repository;
use hcm_common::config::{CompiledDefaults, ConfigOverrides, ServerConfig, TomlConfig};
use hcm_common::db::init_memory_database;
use hcm_common::models::{ClassFields, RegionFields, TopicFields};
use hcm_common::{EntityId, StorageError};
use sqlx::SqlitePool;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const MAX_BYTES: u64 = 1024;

/// Filesystem store that records every call
pub struct RecordingStore {
    pub inner: FsAssetStore,
    stores: AtomicUsize,
    deletes: Mutex<Vec<String>>,
    fail_store: AtomicBool,
    fail_delete: AtomicBool,
}

impl RecordingStore {
    pub fn new(inner: FsAssetStore) -> Self {
        Self {
            inner,
            stores: AtomicUsize::new(0),
            deletes: Mutex::new(Vec::new()),
            fail_store: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn store_calls(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn fail_stores(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// True if the blob behind a reference is on disk
    pub fn exists(&self, reference: &str) -> bool {
        self.inner
            .path_for_reference(reference)
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    pub fn file_count(&self) -> usize {
        std::fs::read_dir(self.inner.root()).unwrap().count()
    }
}

#[async_trait]
impl AssetStore for RecordingStore {
    async fn store(&self, upload: &UploadedFile) -> Result<StoredAsset, StorageError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::new(io::ErrorKind::Other, "disk full")));
        }
        self.inner.store(upload).await
    }

    async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        self.deletes.lock().unwrap().push(reference.to_string());
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only",
            )));
        }
        self.inner.delete(reference).await
    }

    async fn list_stored(&self) -> Result<Vec<StoredFile>, StorageError> {
        self.inner.list_stored().await
    }

    fn max_bytes(&self) -> u64 {
        self.inner.max_bytes()
    }
}

pub struct TestEnv {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub repo: Repository,
    pub store: Arc<RecordingStore>,
    pub coordinator: Coordinator,
    pub resolver: HierarchyResolver,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let fs_store = FsAssetStore::new(dir.path().join("uploads"), "/public/uploads", MAX_BYTES);
        fs_store.ensure_root().await.unwrap();
        let store = Arc::new(RecordingStore::new(fs_store));

        let pool = init_memory_database().await.unwrap();
        let repo = Repository::new(pool.clone());
        let coordinator = Coordinator::new(repo.clone(), store.clone());
        let resolver = HierarchyResolver::new(repo.clone());

        Self {
            dir,
            pool,
            repo,
            store,
            coordinator,
            resolver,
        }
    }

    /// Server config pointing at this environment's asset root
    pub fn server_config(&self) -> ServerConfig {
        let defaults = CompiledDefaults {
            data_root: self.dir.path().to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "info".to_string(),
        };
        let toml = TomlConfig {
            max_upload_bytes: Some(MAX_BYTES),
            ..TomlConfig::default()
        };
        let overrides = ConfigOverrides {
            asset_root: Some(self.store.inner.root().to_path_buf()),
            admin_user: Some("admin".to_string()),
            admin_pass: Some("secret".to_string()),
            ..ConfigOverrides::default()
        };
        ServerConfig::resolve(&overrides, &toml, &defaults)
    }

    /// Classes 1..=2 and regions 1..=2
    pub async fn seed_grid(&self) {
        for name in ["Lớp 10", "Lớp 11"] {
            self.repo
                .create_class(&ClassFields { name: name.to_string() })
                .await
                .unwrap();
        }
        for name in ["Miền Bắc", "Miền Nam"] {
            let fields = RegionFields {
                code: None,
                name: name.to_string(),
                description: None,
            };
            self.repo.create_region(&fields, None).await.unwrap();
        }
    }
}

pub fn upload(field: &str, name: &str, bytes: &[u8]) -> UploadedFile {
    UploadedFile::new(field, name, bytes.to_vec())
}

pub fn topic_fields(title: &str, class_id: EntityId, region_id: EntityId) -> TopicFields {
    TopicFields {
        title: title.to_string(),
        description: None,
        position: 0,
        class_id,
        region_id,
    }
}
