//! Directory-backed object store
//!
//! Serves a local directory tree through the [`ObjectStore`] contract. Keys
//! are `/`-separated paths relative to the root. Useful for mounted buckets
//! and for exercising retrieval without a network.

use async_trait::async_trait;
use remora_core::dto::storage::ListObjectsResponse;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{ClientError, Result};
use crate::storage::ObjectStore;

const DEFAULT_PAGE_SIZE: usize = 1000;

/// Object store over a local directory
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    page_size: usize,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets how many keys a single `list` call returns
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !safe {
            return Err(ClientError::InvalidRequest(format!(
                "Not an object key: '{}'",
                key
            )));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn list(&self, prefix: &str, continuation: Option<&str>) -> Result<ListObjectsResponse> {
        let offset = match continuation {
            Some(token) => token.parse::<usize>().map_err(|_| {
                ClientError::InvalidRequest(format!("Invalid continuation token: '{}'", token))
            })?,
            None => 0,
        };

        let root = self.root.clone();
        let prefix = prefix.to_string();
        let mut keys = tokio::task::spawn_blocking(move || collect_keys(&root))
            .await
            .map_err(|e| ClientError::InternalError(format!("Listing task failed: {}", e)))??;

        keys.retain(|key| key.starts_with(&prefix));
        keys.sort();

        let end = (offset + self.page_size).min(keys.len());
        let next_token = (end < keys.len()).then(|| end.to_string());
        let page = keys.get(offset..end).map(<[String]>::to_vec).unwrap_or_default();

        Ok(ListObjectsResponse {
            keys: page,
            next_token,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ClientError::NotFound(key.to_string()))
            }
            Err(e) => Err(ClientError::io(path, e)),
        }
    }
}

/// Collects every file under `root` as a `/`-joined relative key
fn collect_keys(root: &Path) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    if root.exists() {
        collect_recursive(root, "", &mut keys)?;
    }
    Ok(keys)
}

fn collect_recursive(dir: &Path, base: &str, keys: &mut Vec<String>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| ClientError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| ClientError::io(dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = if base.is_empty() {
            name
        } else {
            format!("{}/{}", base, name)
        };

        let file_type = entry.file_type().map_err(|e| ClientError::io(&path, e))?;
        if file_type.is_dir() {
            collect_recursive(&path, &key, keys)?;
        } else if file_type.is_file() {
            keys.push(key);
        }
    }

    Ok(())
}
