//! Artifact store for the trained model and its metadata
//!
//! This module provides:
//! - All-or-nothing writes of the model + metadata pair
//! - Checksum validation of the model file against its metadata
//! - Bounded retries on transient read failures at load time

use crate::error::{Error, Result};
use crate::forest::RandomForest;
use crate::models::ModelMetadata;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const MODEL_FILE: &str = "diabetes_model.json";
pub const METADATA_FILE: &str = "model_metadata.json";

/// Retry policy for reading artifacts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total read attempts, including the first
    pub attempts: u32,
    /// Delay before the second attempt; grows linearly afterwards
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Model and metadata as read from disk, already cross-checked
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub forest: RandomForest,
    pub metadata: ModelMetadata,
}

/// Directory holding one model/metadata pair
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Persist both artifacts or neither.
    ///
    /// Fills in `metadata.model_checksum` and returns the record as written.
    /// Both files are fully written and synced to temp files before either
    /// final path is touched.
    pub fn write(&self, forest: &RandomForest, mut metadata: ModelMetadata) -> Result<ModelMetadata> {
        let model_bytes = serde_json::to_vec(forest)
            .map_err(|e| Error::Internal(format!("failed to serialize model: {}", e)))?;
        metadata.model_checksum = compute_checksum(&model_bytes);
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| Error::Internal(format!("failed to serialize metadata: {}", e)))?;

        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;

        let model_tmp = self.stage(&model_bytes)?;
        let metadata_tmp = self.stage(&metadata_bytes)?;

        let model_path = self.model_path();
        let metadata_path = self.metadata_path();
        let previous_model = match fs::read(&model_path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(Error::io(&model_path, e)),
        };

        model_tmp
            .persist(&model_path)
            .map_err(|e| Error::io(&model_path, e.error))?;

        if let Err(e) = metadata_tmp.persist(&metadata_path) {
            self.restore_model(previous_model.as_deref());
            return Err(Error::io(&metadata_path, e.error));
        }

        info!(
            dir = %self.dir.display(),
            version = %metadata.model_version,
            checksum = %metadata.model_checksum,
            size = model_bytes.len(),
            "Artifacts written"
        );
        Ok(metadata)
    }

    /// Write bytes to a synced temp file in the artifact directory
    fn stage(&self, bytes: &[u8]) -> Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        tmp.write_all(bytes).map_err(|e| Error::io(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
        Ok(tmp)
    }

    /// Put back the model file that was replaced by a failed write
    fn restore_model(&self, previous: Option<&[u8]>) {
        let path = self.model_path();
        let result = match previous {
            Some(bytes) => fs::write(&path, bytes),
            None => fs::remove_file(&path),
        };
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Failed to restore previous model file");
        }
    }

    /// Read only the metadata record
    pub fn read_metadata(&self) -> Result<ModelMetadata> {
        let path = self.metadata_path();
        let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::corrupt(&path, e.to_string()))
    }

    /// Read and cross-check both artifacts
    pub fn load(&self) -> Result<Artifacts> {
        let metadata = self.read_metadata()?;

        let model_path = self.model_path();
        let model_bytes = fs::read(&model_path).map_err(|e| Error::io(&model_path, e))?;
        let checksum = compute_checksum(&model_bytes);
        if checksum != metadata.model_checksum {
            return Err(Error::corrupt(
                &model_path,
                format!(
                    "checksum mismatch: metadata expects {}, file has {}",
                    metadata.model_checksum, checksum
                ),
            ));
        }

        let forest: RandomForest =
            serde_json::from_slice(&model_bytes).map_err(|e| Error::corrupt(&model_path, e.to_string()))?;
        forest.check().map_err(|reason| Error::corrupt(&model_path, reason))?;

        debug!(
            version = %metadata.model_version,
            trees = forest.n_trees(),
            "Artifacts read"
        );
        Ok(Artifacts { forest, metadata })
    }

    /// `load` on the blocking pool, retrying transient I/O failures
    pub async fn load_with_retry(&self, policy: &RetryPolicy) -> Result<Artifacts> {
        let store = self.clone();
        retry_transient(policy, move || store.load()).await
    }
}

/// Run `op` on the blocking pool until it succeeds, fails permanently, or
/// `policy.attempts` runs out. Only transient `Io` errors are retried.
async fn retry_transient<T, F>(policy: &RetryPolicy, op: F) -> Result<T>
where
    T: Send + 'static,
    F: Fn() -> Result<T> + Clone + Send + 'static,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        let op = op.clone();
        let result = tokio::task::spawn_blocking(op)
            .await
            .map_err(|e| Error::Internal(format!("artifact load task failed: {}", e)))?;

        match result {
            Err(Error::Io { path, source }) if attempt < attempts && is_transient(source.kind()) => {
                let delay = policy.backoff * attempt;
                warn!(
                    path = %path.display(),
                    error = %source,
                    attempt = attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    "Transient artifact read failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Missing files and bad permissions will not fix themselves
fn is_transient(kind: ErrorKind) -> bool {
    !matches!(
        kind,
        ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::InvalidInput | ErrorKind::InvalidData
    )
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::ForestParams;
    use crate::models::MODEL_TYPE;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fixture(version: &str) -> (RandomForest, ModelMetadata) {
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, 1.0, 2.0, 3.0, 4.0]).collect();
        let labels: Vec<bool> = (0..40).map(|i| i >= 20).collect();
        let params = ForestParams {
            n_estimators: 3,
            ..Default::default()
        };
        let forest = RandomForest::fit(&rows, &labels, &params).unwrap();
        let metadata = ModelMetadata {
            model_version: version.to_string(),
            model_type: MODEL_TYPE.to_string(),
            trained_at: Utc::now(),
            feature_order: vec![
                "Glucose".into(),
                "Pregnancies".into(),
                "BloodPressure".into(),
                "BMI".into(),
                "Age".into(),
            ],
            label_column: "Diabetic".to_string(),
            training_row_count: 32,
            validation_row_count: 8,
            dropped_row_count: 0,
            validation_metrics: BTreeMap::from([("accuracy".to_string(), 1.0)]),
            decision_threshold: 0.5,
            feature_importances: BTreeMap::new(),
            hyperparameters: params,
            validation_fraction: 0.2,
            model_checksum: String::new(),
        };
        (forest, metadata)
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"test model weights");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"test model weights"));
        assert_ne!(checksum, compute_checksum(b"other weights"));
    }

    #[test]
    fn test_write_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path().join("nested"));
        let (forest, metadata) = fixture("v1");

        let written = store.write(&forest, metadata).unwrap();
        assert_eq!(written.model_checksum.len(), 64);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.metadata, written);
        assert_eq!(loaded.forest, forest);

        // No temp files left behind
        let names: Vec<String> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_load_missing_is_io_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        match store.load() {
            Err(Error::Io { source, .. }) => assert_eq!(source.kind(), ErrorKind::NotFound),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_tampered_model_detected() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        let (forest, metadata) = fixture("v1");
        store.write(&forest, metadata).unwrap();

        let mut bytes = fs::read(store.model_path()).unwrap();
        bytes.push(b' ');
        fs::write(store.model_path(), bytes).unwrap();

        assert!(matches!(store.load(), Err(Error::CorruptArtifact { .. })));
    }

    #[test]
    fn test_garbage_metadata_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        fs::write(store.metadata_path(), b"{not json").unwrap();
        fs::write(store.model_path(), b"{}").unwrap();
        assert!(matches!(store.load(), Err(Error::CorruptArtifact { .. })));
    }

    #[test]
    fn test_failed_write_leaves_previous_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        let (forest, metadata) = fixture("v1");
        store.write(&forest, metadata).unwrap();
        let model_before = fs::read(store.model_path()).unwrap();

        // A directory squatting on the metadata path makes the final rename fail
        fs::remove_file(store.metadata_path()).unwrap();
        fs::create_dir(store.metadata_path()).unwrap();
        fs::write(store.metadata_path().join("keep"), b"x").unwrap();

        let (forest2, metadata2) = fixture("v2");
        let forest2 = RandomForest::fit(
            &(0..40).map(|i| vec![i as f64 * 2.0, 0.0, 0.0, 0.0, 0.0]).collect::<Vec<_>>(),
            &(0..40).map(|i| i % 3 == 0).collect::<Vec<_>>(),
            forest2.params(),
        )
        .unwrap();
        assert!(matches!(store.write(&forest2, metadata2), Err(Error::Io { .. })));

        assert_eq!(fs::read(store.model_path()).unwrap(), model_before);
    }

    #[test]
    fn test_write_into_file_path_fails_without_output() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("artifacts");
        fs::write(&blocker, b"not a directory").unwrap();

        let store = ArtifactStore::new(&blocker);
        let (forest, metadata) = fixture("v1");
        assert!(matches!(store.write(&forest, metadata), Err(Error::Io { .. })));
        assert_eq!(fs::read(&blocker).unwrap(), b"not a directory");
    }

    #[test]
    fn test_load_with_retry_does_not_retry_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        let policy = RetryPolicy {
            attempts: 5,
            backoff: Duration::from_secs(30),
        };
        // Would take minutes if NotFound were retried
        let result = tokio_test::block_on(store.load_with_retry(&policy));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    fn quick_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_transient_failure_then_success_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = tokio_test::block_on(retry_transient(&quick_policy(3), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::io("model.json", io::Error::from(ErrorKind::Interrupted)))
            } else {
                Ok("loaded")
            }
        }));
        assert_eq!(result.unwrap(), "loaded");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_persistent_transient_failure_stops_after_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<()> = tokio_test::block_on(retry_transient(&quick_policy(3), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::io("model.json", io::Error::from(ErrorKind::Interrupted)))
        }));
        match result {
            Err(Error::Io { source, .. }) => assert_eq!(source.kind(), ErrorKind::Interrupted),
            other => panic!("expected io error, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_corrupt_artifact_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<()> = tokio_test::block_on(retry_transient(&quick_policy(3), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::corrupt("model.json", "checksum mismatch"))
        }));
        assert!(matches!(result, Err(Error::CorruptArtifact { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_kinds() {
        assert!(is_transient(ErrorKind::Interrupted));
        assert!(is_transient(ErrorKind::TimedOut));
        assert!(!is_transient(ErrorKind::NotFound));
        assert!(!is_transient(ErrorKind::PermissionDenied));
    }
}
