//! On-disk store registry
//!
//! Layout under the registry root:
//!
//! ```text
//! <root>/<tag>/generation.json          metadata (state, created_at, ...)
//! <root>/<tag>/entries/<digest>.body    raw response bytes
//! <root>/<tag>/entries/<digest>.json    key, status, headers
//! ```
//!
//! The `.json` record is written after the body, so a record on disk always
//! points at a complete body. Every file is written to a temp name and
//! renamed into place.

use crate::cache::generation::{GenerationInfo, GenerationTag};
use crate::cache::registry::{CacheStore, StoreRegistry};
use crate::cache::request::{CacheEntry, CapturedResponse, RequestKey};
use crate::error::{GardenError, GardenResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

const METADATA_FILE: &str = "generation.json";
const ENTRIES_DIR: &str = "entries";

/// Persisted part of an entry (everything but the body)
#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    key: RequestKey,
    status: u16,
    headers: Vec<(String, String)>,
}

/// Write `contents` to `path` via a temp file + rename
async fn write_atomic(path: &Path, contents: &[u8], operation: &str) -> GardenResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)
        .await
        .map_err(|e| GardenError::store(operation, format!("writing {}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| GardenError::store(operation, format!("renaming into {}: {}", path.display(), e)))
}

/// Non-blocking existence check; IO errors other than "not found" mean the
/// store cannot be read
async fn path_exists(path: &Path, operation: &str) -> GardenResult<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| GardenError::store(operation, format!("{}: {}", path.display(), e)))
}

/// A generation stored in its own directory
pub struct DiskStore {
    tag: GenerationTag,
    dir: PathBuf,
}

impl DiskStore {
    fn entries_dir(&self) -> PathBuf {
        self.dir.join(ENTRIES_DIR)
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    fn record_path(&self, key: &RequestKey) -> PathBuf {
        self.entries_dir().join(format!("{}.json", key.digest()))
    }

    fn body_path(&self, key: &RequestKey) -> PathBuf {
        self.entries_dir().join(format!("{}.body", key.digest()))
    }

    async fn read_info(&self) -> GardenResult<GenerationInfo> {
        let path = self.metadata_path();
        let content = fs::read(&path)
            .await
            .map_err(|e| GardenError::store("reading generation metadata", format!("{}: {}", path.display(), e)))?;
        Ok(serde_json::from_slice(&content)?)
    }

    async fn write_info(&self, info: &GenerationInfo) -> GardenResult<()> {
        let content = serde_json::to_vec_pretty(info)?;
        write_atomic(&self.metadata_path(), &content, "writing generation metadata").await
    }

    /// Key recorded in the slot `key` maps to, if any
    async fn slot_owner(&self, key: &RequestKey) -> GardenResult<Option<RequestKey>> {
        let path = self.record_path(key);
        match fs::read(&path).await {
            Ok(content) => Ok(Some(serde_json::from_slice::<EntryRecord>(&content)?.key)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GardenError::store(
                "reading entry record",
                format!("{}: {}", path.display(), e),
            )),
        }
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    fn tag(&self) -> &GenerationTag {
        &self.tag
    }

    async fn put(&self, entry: CacheEntry) -> GardenResult<()> {
        if let Some(owner) = self.slot_owner(&entry.key).await? {
            if owner != entry.key {
                return Err(GardenError::store(
                    "writing entry record",
                    format!("{} and {} share digest {}", owner, entry.key, entry.key.digest()),
                ));
            }
        }

        let record = EntryRecord {
            status: entry.response.status,
            headers: entry.response.headers,
            key: entry.key,
        };

        write_atomic(&self.body_path(&record.key), &entry.response.body, "writing entry body").await?;
        let content = serde_json::to_vec(&record)?;
        write_atomic(&self.record_path(&record.key), &content, "writing entry record").await?;

        debug!("Stored {} in {}", record.key, self.tag);
        Ok(())
    }

    async fn lookup(&self, key: &RequestKey) -> GardenResult<Option<CapturedResponse>> {
        let record_path = self.record_path(key);
        let content = match fs::read(&record_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(GardenError::store(
                    "reading entry record",
                    format!("{}: {}", record_path.display(), e),
                ))
            }
        };

        let record: EntryRecord = serde_json::from_slice(&content)?;
        // Slot owned by another identity with the same digest
        if &record.key != key {
            return Ok(None);
        }

        let body_path = self.body_path(key);
        let body = fs::read(&body_path)
            .await
            .map_err(|e| GardenError::store("reading entry body", format!("{}: {}", body_path.display(), e)))?;

        Ok(Some(CapturedResponse {
            status: record.status,
            headers: record.headers,
            body,
        }))
    }

    async fn keys(&self) -> GardenResult<Vec<RequestKey>> {
        let dir = self.entries_dir();
        let mut reader = match fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GardenError::io(format!("listing {}", dir.display()), e)),
        };

        let mut keys = Vec::new();
        while let Some(item) = reader
            .next_entry()
            .await
            .map_err(|e| GardenError::io(format!("listing {}", dir.display()), e))?
        {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let content = fs::read(&path)
                .await
                .map_err(|e| GardenError::io(format!("reading {}", path.display()), e))?;
            match serde_json::from_slice::<EntryRecord>(&content) {
                Ok(record) => keys.push(record.key),
                Err(e) => warn!("Skipping unreadable entry record {}: {}", path.display(), e),
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn info(&self) -> GardenResult<GenerationInfo> {
        let mut info = self.read_info().await?;
        info.entry_count = self.keys().await?.len();
        Ok(info)
    }

    async fn seal(&self) -> GardenResult<()> {
        let mut info = self.read_info().await?;
        let count = self.keys().await?.len();
        info.seal(count);
        self.write_info(&info).await
    }

    async fn mark_activated(&self) -> GardenResult<()> {
        let mut info = self.read_info().await?;
        info.activate();
        self.write_info(&info).await
    }
}

/// Registry mapping each generation to a directory under `root`
pub struct DiskRegistry {
    root: PathBuf,
}

impl DiskRegistry {
    /// Create a registry rooted at `root` (created lazily on first open)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_for(&self, tag: &GenerationTag) -> DiskStore {
        DiskStore {
            tag: tag.clone(),
            dir: self.root.join(tag.as_str()),
        }
    }
}

#[async_trait]
impl StoreRegistry for DiskRegistry {
    async fn open(&self, tag: &GenerationTag) -> GardenResult<Arc<dyn CacheStore>> {
        let store = self.store_for(tag);

        if !path_exists(&store.metadata_path(), "opening generation").await? {
            fs::create_dir_all(store.entries_dir())
                .await
                .map_err(|e| GardenError::store("creating generation", format!("{}: {}", store.dir.display(), e)))?;
            store.write_info(&GenerationInfo::building(tag.clone())).await?;
            debug!("Created generation {} at {}", tag, store.dir.display());
        }

        Ok(Arc::new(store))
    }

    async fn get(&self, tag: &GenerationTag) -> GardenResult<Option<Arc<dyn CacheStore>>> {
        let store = self.store_for(tag);
        if path_exists(&store.metadata_path(), "opening generation").await? {
            Ok(Some(Arc::new(store)))
        } else {
            Ok(None)
        }
    }

    async fn list_tags(&self) -> GardenResult<Vec<GenerationTag>> {
        let mut reader = match fs::read_dir(&self.root).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(GardenError::store(
                    "listing generations",
                    format!("{}: {}", self.root.display(), e),
                ))
            }
        };

        let mut tags = Vec::new();
        while let Some(item) = reader
            .next_entry()
            .await
            .map_err(|e| GardenError::store("listing generations", e))?
        {
            let path = item.path();
            // Only directories carrying metadata are generations
            if !path_exists(&path.join(METADATA_FILE), "listing generations").await? {
                continue;
            }

            let name = item.file_name().to_string_lossy().to_string();
            match GenerationTag::new(name) {
                Ok(tag) => tags.push(tag),
                Err(e) => debug!("Ignoring {}: {}", path.display(), e),
            }
        }

        tags.sort();
        Ok(tags)
    }

    async fn delete(&self, tag: &GenerationTag) -> GardenResult<bool> {
        let dir = self.root.join(tag.as_str());
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Removed generation directory {}", dir.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GardenError::store(
                "deleting generation",
                format!("{}: {}", dir.display(), e),
            )),
        }
    }

    fn backend_name(&self) -> &'static str {
        "disk"
    }
}
