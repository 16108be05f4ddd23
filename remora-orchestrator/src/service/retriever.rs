//! Artifact retrieval
//!
//! Mirrors the object tree under a remote prefix into a local directory.
//! The whole prefix is enumerated before the first transfer, so a listing
//! failure never leaves a half-written tree behind.

use remora_client::{ClientError, ObjectStore};
use remora_core::{FetchResult, JobHandle};
use std::collections::HashSet;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cancel::CancelSignal;
use crate::config::OrchestratorConfig;
use crate::error::RetrievalError;
use crate::service::{ProgressEvent, ProgressReporter, TracingReporter};

/// Copies a job's artifact tree out of the object store
///
/// Only reads from the store.
#[derive(Clone)]
pub struct ArtifactRetriever {
    store: Arc<dyn ObjectStore>,
    attempts: u32,
    backoff: Duration,
    reporter: Arc<dyn ProgressReporter>,
}

/// Why a retried store call gave up
enum RetryFailure {
    Cancelled,
    Exhausted { attempts: u32, source: ClientError },
}

impl ArtifactRetriever {
    pub fn new(store: Arc<dyn ObjectStore>, config: &OrchestratorConfig) -> Self {
        Self {
            store,
            attempts: config.fetch_attempts.max(1),
            backoff: config.fetch_backoff,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Replaces the progress reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Copies every object under `remote_prefix` into `local_dir`
    ///
    /// Keys are written relative to the prefix. Directory markers (keys
    /// ending in `/`) are skipped. Keys whose relative part would escape
    /// `local_dir` abort the copy with [`RetrievalError::UnsafePath`].
    ///
    /// Every error carries the relative paths copied so far.
    pub async fn fetch(
        &self,
        handle: &JobHandle,
        remote_prefix: &str,
        local_dir: &Path,
        cancel: &CancelSignal,
    ) -> Result<FetchResult, RetrievalError> {
        if cancel.is_cancelled() {
            return Err(RetrievalError::Cancelled { copied: Vec::new() });
        }

        let prefix = normalize_prefix(remote_prefix);
        info!(
            "Fetching artifacts of job {} from '{}' into {}",
            handle,
            prefix,
            local_dir.display()
        );

        tokio::fs::create_dir_all(local_dir)
            .await
            .map_err(|source| RetrievalError::Io {
                path: local_dir.to_path_buf(),
                source,
                copied: Vec::new(),
            })?;

        let keys = self.list_all(&prefix, cancel).await?;
        debug!("Found {} object(s) under '{}'", keys.len(), prefix);

        let mut result = FetchResult::new(local_dir);

        for key in keys {
            if cancel.is_cancelled() {
                warn!(
                    "Artifact retrieval for job {} cancelled after {} file(s)",
                    handle,
                    result.files.len()
                );
                return Err(RetrievalError::Cancelled {
                    copied: result.files,
                });
            }

            let Some(relative) = key.strip_prefix(prefix.as_str()) else {
                debug!("Skipping '{}', outside of '{}'", key, prefix);
                continue;
            };
            if relative.is_empty() || relative.ends_with('/') {
                continue;
            }

            let Some(target) = safe_join(local_dir, relative) else {
                return Err(RetrievalError::UnsafePath {
                    key,
                    copied: result.files,
                });
            };

            let body = match self.retry(cancel, || self.store.get(&key)).await {
                Ok(body) => body,
                Err(RetryFailure::Cancelled) => {
                    return Err(RetrievalError::Cancelled {
                        copied: result.files,
                    });
                }
                Err(RetryFailure::Exhausted { attempts, source }) => {
                    return Err(RetrievalError::Transfer {
                        key,
                        attempts,
                        source,
                        copied: result.files,
                    });
                }
            };

            if let Err(source) = write_file(&target, &body).await {
                return Err(RetrievalError::Io {
                    path: target,
                    source,
                    copied: result.files,
                });
            }

            let bytes = body.len() as u64;
            self.reporter.report(&ProgressEvent::ArtifactCopied {
                handle: handle.clone(),
                path: relative.to_string(),
                bytes,
            });
            result.files.push(relative.to_string());
            result.bytes += bytes;
        }

        info!(
            "Fetched {} file(s), {} bytes, for job {}",
            result.files.len(),
            result.bytes,
            handle
        );
        Ok(result)
    }

    /// Follows continuation tokens until the listing is exhausted
    async fn list_all(
        &self,
        prefix: &str,
        cancel: &CancelSignal,
    ) -> Result<Vec<String>, RetrievalError> {
        let mut keys = Vec::new();
        let mut seen = HashSet::new();
        let mut tokens = HashSet::new();
        let mut continuation: Option<String> = None;

        loop {
            let token = continuation.as_deref();
            let page = match self.retry(cancel, || self.store.list(prefix, token)).await {
                Ok(page) => page,
                Err(RetryFailure::Cancelled) => {
                    return Err(RetrievalError::Cancelled { copied: Vec::new() });
                }
                Err(RetryFailure::Exhausted { source, .. }) => {
                    return Err(RetrievalError::Listing {
                        prefix: prefix.to_string(),
                        source,
                    });
                }
            };

            for key in page.keys {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }

            match page.next_token {
                Some(next) if tokens.insert(next.clone()) => continuation = Some(next),
                Some(next) => {
                    warn!("Listing of '{}' repeated token '{}'", prefix, next);
                    return Err(RetrievalError::IncompleteListing {
                        prefix: prefix.to_string(),
                        token: next,
                    });
                }
                None => break,
            }
        }

        Ok(keys)
    }

    /// Runs `op` until it succeeds, fails permanently or runs out of attempts
    ///
    /// Only transient errors are retried, after `attempt * backoff`. Both the
    /// call and the backoff give way to cancellation.
    async fn retry<T, F, Fut>(&self, cancel: &CancelSignal, mut op: F) -> Result<T, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = remora_client::Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryFailure::Cancelled),
                outcome = op() => outcome,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    let delay = self.backoff * attempt;
                    warn!(
                        "Store call failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.attempts, delay, e
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(RetryFailure::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(source) => {
                    return Err(RetryFailure::Exhausted {
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}

/// Ensures a non-empty prefix ends with exactly one `/`
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// Joins a `/`-separated relative key onto `root`
///
/// Returns `None` if any segment is absolute, `..`, `.` or empty.
fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in relative.split('/') {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => path.push(part),
            _ => return None,
        }
    }
    Some(path)
}

async fn write_file(path: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use crate::service::InMemoryReporter;
    use async_trait::async_trait;
    use remora_client::LocalObjectStore;
    use remora_core::dto::storage::ListObjectsResponse;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    /// In-memory store with one key per page and scripted get failures
    #[derive(Default)]
    struct MemoryStore {
        objects: BTreeMap<String, Vec<u8>>,
        failures: Mutex<HashMap<String, (u32, u16)>>,
        gets: AtomicU32,
        lists: AtomicU32,
    }

    impl MemoryStore {
        fn with(objects: &[(&str, &str)]) -> Self {
            Self {
                objects: objects
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                    .collect(),
                ..Self::default()
            }
        }

        /// Fails the next `times` gets of `key` with HTTP `status`
        fn failing(self, key: &str, times: u32, status: u16) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(key.to_string(), (times, status));
            self
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn list(
            &self,
            prefix: &str,
            continuation: Option<&str>,
        ) -> remora_client::Result<ListObjectsResponse> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            let keys: Vec<&String> = self.objects.keys().filter(|k| k.starts_with(prefix)).collect();
            let offset: usize = continuation.map(|t| t.parse().unwrap()).unwrap_or(0);

            Ok(ListObjectsResponse {
                keys: keys.get(offset).map(|k| vec![(*k).clone()]).unwrap_or_default(),
                next_token: (offset + 1 < keys.len()).then(|| (offset + 1).to_string()),
            })
        }

        async fn get(&self, key: &str) -> remora_client::Result<Vec<u8>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if let Some((remaining, status)) = self.failures.lock().unwrap().get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ClientError::api_error(*status, "injected"));
                }
            }

            self.objects
                .get(key)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(key.to_string()))
        }
    }

    fn retriever(store: MemoryStore) -> (ArtifactRetriever, Arc<MemoryStore>) {
        let store = Arc::new(store);
        let config = OrchestratorConfig::default().with_fetch_retry(3, Duration::from_secs(1));
        (ArtifactRetriever::new(store.clone(), &config), store)
    }

    fn handle() -> JobHandle {
        JobHandle::new("build:job-1")
    }

    #[tokio::test]
    async fn test_fetch_mirrors_tree() {
        let dir = TempDir::new().unwrap();
        let (retriever, _) = retriever(MemoryStore::with(&[
            ("out/job-1/a/b.txt", "x"),
            ("out/job-1/c.txt", "y"),
        ]));

        let result = retriever
            .fetch(&handle(), "out/job-1/", dir.path(), &CancelSignal::never())
            .await
            .unwrap();

        let mut files = result.files.clone();
        files.sort();
        assert_eq!(files, vec!["a/b.txt", "c.txt"]);
        assert_eq!(result.bytes, 2);
        assert_eq!(std::fs::read_to_string(dir.path().join("a/b.txt")).unwrap(), "x");
        assert_eq!(std::fs::read_to_string(dir.path().join("c.txt")).unwrap(), "y");
    }

    #[tokio::test]
    async fn test_fetch_follows_every_page() {
        let dir = TempDir::new().unwrap();
        let objects: Vec<(String, String)> = (0..5)
            .map(|i| (format!("out/job-1/f{}.txt", i), i.to_string()))
            .collect();
        let refs: Vec<(&str, &str)> = objects.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let (retriever, store) = retriever(MemoryStore::with(&refs));

        let result = retriever
            .fetch(&handle(), "out/job-1", dir.path(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(result.files.len(), 5);
        assert_eq!(store.lists.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_foreign_keys_and_markers_are_skipped() {
        let dir = TempDir::new().unwrap();
        let (retriever, _) = retriever(MemoryStore::with(&[
            ("out/job-1/", ""),
            ("out/job-1/logs/", ""),
            ("out/job-1/report.html", "<html/>"),
            ("out/job-10/other.txt", "nope"),
        ]));

        let result = retriever
            .fetch(&handle(), "out/job-1/", dir.path(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(result.files, vec!["report.html"]);
        assert!(!dir.path().join("other.txt").exists());
    }

    #[tokio::test]
    async fn test_empty_prefix_yields_empty_result() {
        let dir = TempDir::new().unwrap();
        let (retriever, _) = retriever(MemoryStore::with(&[("elsewhere/a.txt", "a")]));

        let result = retriever
            .fetch(&handle(), "out/job-1/", dir.path(), &CancelSignal::never())
            .await
            .unwrap();

        assert!(result.is_empty());
        assert!(dir.path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_transfer_error_is_retried() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::with(&[("out/job-1/a.txt", "a")]).failing("out/job-1/a.txt", 2, 503);
        let (retriever, store) = retriever(store);

        let result = retriever
            .fetch(&handle(), "out/job-1/", dir.path(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(result.files, vec!["a.txt"]);
        assert_eq!(store.gets.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_report_copied_files() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::with(&[("out/job-1/a.txt", "a"), ("out/job-1/b.txt", "b")])
            .failing("out/job-1/b.txt", 10, 500);
        let (retriever, _) = retriever(store);

        let err = retriever
            .fetch(&handle(), "out/job-1/", dir.path(), &CancelSignal::never())
            .await
            .unwrap_err();

        match &err {
            RetrievalError::Transfer { key, attempts, .. } => {
                assert_eq!(key, "out/job-1/b.txt");
                assert_eq!(*attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.copied(), ["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_permanent_transfer_error_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::with(&[("out/job-1/a.txt", "a")]).failing("out/job-1/a.txt", 1, 403);
        let (retriever, store) = retriever(store);

        let err = retriever
            .fetch(&handle(), "out/job-1/", dir.path(), &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, RetrievalError::Transfer { attempts: 1, .. }));
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    /// Store whose listing never ends and whose downloads never finish
    struct StuckStore {
        keys: Vec<String>,
        constant_token: bool,
    }

    #[async_trait]
    impl ObjectStore for StuckStore {
        async fn list(
            &self,
            _prefix: &str,
            _continuation: Option<&str>,
        ) -> remora_client::Result<ListObjectsResponse> {
            Ok(ListObjectsResponse {
                keys: self.keys.clone(),
                next_token: self.constant_token.then(|| "page-2".to_string()),
            })
        }

        async fn get(&self, _key: &str) -> remora_client::Result<Vec<u8>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(b"late".to_vec())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_download_in_flight() {
        let dir = TempDir::new().unwrap();
        let store = StuckStore {
            keys: vec!["out/job-1/a.txt".to_string()],
            constant_token: false,
        };
        let retriever = ArtifactRetriever::new(Arc::new(store), &OrchestratorConfig::default());
        let (cancel, signal) = cancel_pair();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });
        let started = tokio::time::Instant::now();

        let err = retriever
            .fetch(&handle(), "out/job-1/", dir.path(), &signal)
            .await
            .unwrap_err();

        canceller.await.unwrap();
        assert!(matches!(err, RetrievalError::Cancelled { .. }));
        assert!(err.copied().is_empty());
        assert!(started.elapsed() < Duration::from_secs(60));
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_repeated_continuation_token_fails_listing() {
        let dir = TempDir::new().unwrap();
        let store = StuckStore {
            keys: vec!["out/job-1/a.txt".to_string()],
            constant_token: true,
        };
        let retriever = ArtifactRetriever::new(Arc::new(store), &OrchestratorConfig::default());

        let err = retriever
            .fetch(&handle(), "out/job-1/", dir.path(), &CancelSignal::never())
            .await
            .unwrap_err();

        match err {
            RetrievalError::IncompleteListing { prefix, token } => {
                assert_eq!(prefix, "out/job-1/");
                assert_eq!(token, "page-2");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_copies_nothing() {
        let dir = TempDir::new().unwrap();
        let (retriever, store) = retriever(MemoryStore::with(&[("out/job-1/a.txt", "a")]));
        let (cancel, signal) = cancel_pair();
        cancel.cancel();

        let err = retriever
            .fetch(&handle(), "out/job-1/", dir.path(), &signal)
            .await
            .unwrap_err();

        assert!(matches!(err, RetrievalError::Cancelled { .. }));
        assert!(err.copied().is_empty());
        assert_eq!(store.lists.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsafe_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (retriever, _) = retriever(MemoryStore::with(&[
            ("out/job-1/../../etc/passwd", "root"),
        ]));

        let err = retriever
            .fetch(&handle(), "out/job-1/", dir.path(), &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, RetrievalError::UnsafePath { .. }));
    }

    #[tokio::test]
    async fn test_copied_files_are_reported() {
        let dir = TempDir::new().unwrap();
        let (retriever, _) = retriever(MemoryStore::with(&[("out/job-1/a.txt", "abc")]));
        let reporter = InMemoryReporter::new();
        let retriever = retriever.with_reporter(Arc::new(reporter.clone()));

        retriever
            .fetch(&handle(), "out/job-1/", dir.path(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(
            reporter.drain(),
            vec![ProgressEvent::ArtifactCopied {
                handle: handle(),
                path: "a.txt".to_string(),
                bytes: 3,
            }]
        );
    }

    #[tokio::test]
    async fn test_fetch_from_local_store() {
        let bucket = TempDir::new().unwrap();
        let nested = bucket.path().join("docs-output/job-1/site/css");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("main.css"), "body{}").unwrap();
        std::fs::write(bucket.path().join("docs-output/job-1/index.html"), "<h1/>").unwrap();

        let store = LocalObjectStore::new(bucket.path()).with_page_size(1);
        let retriever = ArtifactRetriever::new(Arc::new(store), &OrchestratorConfig::default());
        let out = TempDir::new().unwrap();

        let result = retriever
            .fetch(&handle(), "docs-output/job-1/", out.path(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(result.files, vec!["index.html", "site/css/main.css"]);
        assert_eq!(
            std::fs::read_to_string(out.path().join("site/css/main.css")).unwrap(),
            "body{}"
        );
    }

    #[test]
    fn test_safe_join() {
        let root = Path::new("/tmp/out");
        assert_eq!(safe_join(root, "a/b.txt"), Some(PathBuf::from("/tmp/out/a/b.txt")));
        assert_eq!(safe_join(root, "../x"), None);
        assert_eq!(safe_join(root, "a//b"), None);
        assert_eq!(safe_join(root, "/etc/passwd"), None);
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("out/job-1"), "out/job-1/");
        assert_eq!(normalize_prefix("out/job-1//"), "out/job-1/");
        assert_eq!(normalize_prefix(""), "");
    }
}
