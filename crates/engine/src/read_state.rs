//! Durable per-user read markers.
//!
//! `ReadStateStore` owns key namespacing, JSON encoding and the swallow
//! policy. The raw key-value storage underneath is a `ReadStateBackend`, so
//! the same store runs on local files, Redis or plain memory.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use hrdesk_common::config::{AppConfig, ReadStateBackendKind};
use hrdesk_common::error::AppError;

/// Prefix of every read-marker key; the user id is appended.
pub const READ_STATE_KEY_PREFIX: &str = "hrdesk:notifications:read:";

/// The set of acknowledged notification ids for one user.
pub type ReadIds = BTreeSet<String>;

/// Storage key holding `user_id`'s read markers.
pub fn storage_key(user_id: &str) -> String {
    format!("{}{}", READ_STATE_KEY_PREFIX, user_id)
}

/// Raw durable key-value storage. Failures are returned, never swallowed;
/// the store above decides what a failure means.
#[async_trait]
pub trait ReadStateBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Value stored under `key`, or `None` if nothing was ever written.
    async fn load(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Replace the value stored under `key`.
    async fn store(&self, key: &str, value: &str) -> Result<(), AppError>;
}

/// Per-user read-marker sets on top of a swappable backend.
///
/// Reads never fail: missing, unreadable or corrupt state is an empty set.
/// Writes persist the whole set and drop failures after logging them.
#[derive(Clone)]
pub struct ReadStateStore {
    backend: Arc<dyn ReadStateBackend>,
}

impl ReadStateStore {
    pub fn new(backend: Arc<dyn ReadStateBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by an in-process map.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Build the store selected by `READ_STATE_BACKEND`.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let backend: Arc<dyn ReadStateBackend> = match config.read_state_backend {
            ReadStateBackendKind::File => Arc::new(FileBackend::new(&config.read_state_dir)),
            ReadStateBackendKind::Redis => Arc::new(RedisBackend::connect(&config.redis_url).await?),
            ReadStateBackendKind::Memory => Arc::new(MemoryBackend::new()),
        };

        tracing::info!(backend = backend.name(), "Read-state store ready");
        Ok(Self::new(backend))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// The persisted read markers for `user_id`.
    pub async fn get_read_ids(&self, user_id: &str) -> ReadIds {
        let key = storage_key(user_id);

        let raw = match self.backend.load(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return ReadIds::new(),
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    user_id,
                    error = %e,
                    "Failed to load read markers, treating as none"
                );
                return ReadIds::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    user_id,
                    error = %e,
                    "Corrupt read markers, treating as none"
                );
                ReadIds::new()
            }
        }
    }

    /// Overwrite the persisted read markers for `user_id` with `ids`.
    pub async fn save_read_ids(&self, user_id: &str, ids: &ReadIds) {
        let key = storage_key(user_id);

        let encoded = match serde_json::to_string(&ids.iter().collect::<Vec<_>>()) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to encode read markers");
                return;
            }
        };

        if let Err(e) = self.backend.store(&key, &encoded).await {
            tracing::warn!(
                backend = self.backend.name(),
                user_id,
                count = ids.len(),
                error = %e,
                "Failed to persist read markers, dropping write"
            );
        }
    }
}

/// One JSON file per key under a directory.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File holding `key`: the hex-encoded key, so distinct keys never
    /// share a file whatever characters the user id contains.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hex::encode(key)))
    }
}

#[async_trait]
impl ReadStateBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Plain `GET`/`SET` on a shared connection manager.
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        tracing::info!("Connected to Redis");
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl ReadStateBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }
}

/// In-process map, lost on exit.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, AppError> {
        self.entries
            .lock()
            .map_err(|_| AppError::Internal("read-state map poisoned".to_string()))
    }
}

#[async_trait]
impl ReadStateBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
