//! On-disk cache storage.
//!
//! Layout: one directory per partition under the storage root, one JSON file
//! per entry named after the SHA-256 of its key:
//!
//! ```text
//! <root>/static-v10/3f1c...e2.json
//! <root>/dynamic-v10/9ab0...11.json
//! ```
//!
//! Entries are written to a temporary file and renamed into place, so a put
//! interrupted halfway never leaves a torn entry behind.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use super::storage::CacheStorage;
use crate::error::{Result, WorkerError};
use crate::models::ResponseSnapshot;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, warn};

/// Serialized form of one entry.
#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    key: String,
    status: u16,
    headers: Vec<(String, String)>,
    url: String,
    stored_at: Option<DateTime<Utc>>,
    body: String,
}

impl DiskEntry {
    fn from_snapshot(key: &str, response: &ResponseSnapshot) -> Self {
        Self {
            key: key.to_string(),
            status: response.status(),
            headers: response.headers().to_vec(),
            url: response.url().to_string(),
            stored_at: response.stored_at(),
            body: STANDARD.encode(response.body()),
        }
    }

    fn into_snapshot(self) -> Result<ResponseSnapshot> {
        let body = STANDARD
            .decode(self.body.as_bytes())
            .map_err(|e| WorkerError::Storage(format!("corrupt entry body for {}: {}", self.key, e)))?;
        Ok(ResponseSnapshot::from_parts(
            self.status,
            self.headers,
            Bytes::from(body),
            self.url,
            self.stored_at,
        ))
    }
}

/// Storage that survives restarts.
#[derive(Debug)]
pub struct DiskStorage {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_dir(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(WorkerError::Storage(format!("invalid partition name: {:?}", name)));
        }
        Ok(self.root.join(name))
    }

    fn entry_file(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{}.json", hex::encode(hasher.finalize()))
    }

    async fn read_entry(path: &Path) -> Result<Option<DiskEntry>> {
        match fs::read(path).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> Result<()> {
        fs::create_dir_all(self.partition_dir(name)?).await?;
        Ok(())
    }

    async fn put(&self, name: &str, key: &str, response: ResponseSnapshot) -> Result<()> {
        let dir = self.partition_dir(name)?;
        fs::create_dir_all(&dir).await?;

        let target = dir.join(Self::entry_file(key));
        let tmp = dir.join(format!(
            ".tmp-{}-{}",
            std::process::id(),
            self.tmp_counter.fetch_add(1, Ordering::Relaxed)
        ));

        let raw = serde_json::to_vec(&DiskEntry::from_snapshot(key, &response))?;
        fs::write(&tmp, raw).await?;
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("Stored {} bytes in {}", response.body().len(), name);
        Ok(())
    }

    async fn get(&self, name: &str, key: &str) -> Result<Option<ResponseSnapshot>> {
        let path = self.partition_dir(name)?.join(Self::entry_file(key));
        match Self::read_entry(&path).await? {
            // A hash collision would surface as a key mismatch
            Some(entry) if entry.key == key => Ok(Some(entry.into_snapshot()?)),
            Some(_) => Ok(None),
            None => Ok(None),
        }
    }

    async fn names(&self) -> Result<Vec<String>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        match fs::remove_dir_all(self.partition_dir(name)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>> {
        let mut dir = match fs::read_dir(self.partition_dir(name)?).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_entry(&path).await {
                Ok(Some(stored)) => keys.push(stored.key),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable cache entry {}: {}", path.display(), e),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_survive_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let key = "https://example.org/app/style.css";
        let response = ResponseSnapshot::new(200, "body { margin: 0 }")
            .with_header("content-type", "text/css")
            .with_url(key)
            .stamped(Utc::now());

        DiskStorage::new(dir.path())
            .put("static-v1", key, response.clone())
            .await
            .unwrap();

        let reopened = DiskStorage::new(dir.path());
        let got = reopened.get("static-v1", key).await.unwrap().unwrap();
        assert_eq!(got, response);
        assert_eq!(reopened.keys("static-v1").await.unwrap(), vec![key.to_string()]);
    }

    #[tokio::test]
    async fn test_binary_body_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path());
        let png: Vec<u8> = vec![0x89, 0x50, 0x4e, 0x47, 0x00, 0xff, 0x0d, 0x0a];

        storage
            .put("dynamic-v1", "https://cdn/icon.png", ResponseSnapshot::new(200, png.clone()))
            .await
            .unwrap();

        let got = storage.get("dynamic-v1", "https://cdn/icon.png").await.unwrap().unwrap();
        assert_eq!(got.body().as_ref(), png.as_slice());
    }

    #[tokio::test]
    async fn test_names_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path().join("caches"));

        assert!(storage.names().await.unwrap().is_empty());
        storage.open("static-v9").await.unwrap();
        storage.open("dynamic-v9").await.unwrap();
        assert_eq!(storage.names().await.unwrap(), vec!["dynamic-v9", "static-v9"]);

        assert!(storage.delete("static-v9").await.unwrap());
        assert!(!storage.delete("static-v9").await.unwrap());
        assert_eq!(storage.names().await.unwrap(), vec!["dynamic-v9"]);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path());
        assert!(storage.open("../escape").await.is_err());
        assert!(storage.open("").await.is_err());
    }
}
