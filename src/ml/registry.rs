//! Process-wide classifier ownership.
//!
//! The registry moves from `Unloaded` to `Loaded` exactly once. Concurrent
//! `load()` callers share a single in-flight load; the blocking file read
//! runs on tokio's blocking pool under a timeout. A failed or timed-out load
//! leaves the registry `Unloaded`, so a later call may try again. A read
//! that outlived its timeout is kept and awaited by the retry; storage is
//! never read by two loads at once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::error::{Result, RiskError};
use crate::ml::artifact::{ClassifierSource, ModelManifest};
use crate::ml::classifier::RiskClassifier;
use crate::ml::dense::DenseClassifier;
use crate::ml::normalizer::FeatureNormalizer;

/// A manifest together with the normalizer and classifier built from it.
pub struct LoadedModel {
    manifest: ModelManifest,
    normalizer: FeatureNormalizer,
    classifier: Arc<dyn RiskClassifier>,
    loaded_at: DateTime<Utc>,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model", &self.manifest.model_id())
            .field("features", &self.normalizer.expected_features().len())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl LoadedModel {
    /// Pair a manifest with an already-built classifier.
    pub fn new(manifest: ModelManifest, classifier: Arc<dyn RiskClassifier>) -> Result<Self> {
        manifest.validate().map_err(RiskError::Artifact)?;
        let normalizer = FeatureNormalizer::new(&manifest.preprocessing)?;
        let expected = normalizer.expected_features().len();
        if classifier.input_dim() != expected {
            return Err(RiskError::Artifact(format!(
                "classifier takes {} features, manifest lists {expected}",
                classifier.input_dim()
            )));
        }
        Ok(Self {
            manifest,
            normalizer,
            classifier,
            loaded_at: Utc::now(),
        })
    }

    /// Blocking: read the manifest and the classifier it points to.
    pub fn from_manifest<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manifest = ModelManifest::from_file(path)?;
        let classifier: Arc<dyn RiskClassifier> = match &manifest.classifier {
            ClassifierSource::Dense { path } => Arc::new(DenseClassifier::load(path)?),
            #[cfg(feature = "onnx")]
            ClassifierSource::Onnx { path } => Arc::new(crate::ml::onnx::OnnxClassifier::load(
                path,
                manifest.preprocessing.expected_features.len(),
            )?),
            #[cfg(not(feature = "onnx"))]
            ClassifierSource::Onnx { .. } => {
                return Err(RiskError::Artifact(
                    "onnx classifier requested but built without the `onnx` feature".to_string(),
                ))
            }
        };
        Self::new(manifest, classifier)
    }

    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }

    pub fn normalizer(&self) -> &FeatureNormalizer {
        &self.normalizer
    }

    pub fn classifier(&self) -> &dyn RiskClassifier {
        self.classifier.as_ref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Unloaded,
    Loaded,
}

type Loader = Arc<dyn Fn() -> Result<LoadedModel> + Send + Sync>;

enum ModelSource {
    Manifest(PathBuf),
    Custom(Loader),
    None,
}

pub struct ModelRegistry {
    source: ModelSource,
    load_timeout: Duration,
    cell: OnceCell<Arc<LoadedModel>>,
    load_attempts: AtomicUsize,
    /// Read still running after its caller timed out.
    pending: Mutex<Option<JoinHandle<Result<LoadedModel>>>>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("state", &self.state())
            .field("load_timeout", &self.load_timeout)
            .finish()
    }
}

impl ModelRegistry {
    /// Registry that reads the manifest at `path` on first `load()`.
    pub fn new(path: impl Into<PathBuf>, load_timeout: Duration) -> Self {
        Self::with_source(ModelSource::Manifest(path.into()), load_timeout)
    }

    /// Registry with a custom blocking loader.
    pub fn with_loader<F>(loader: F, load_timeout: Duration) -> Self
    where
        F: Fn() -> Result<LoadedModel> + Send + Sync + 'static,
    {
        Self::with_source(ModelSource::Custom(Arc::new(loader)), load_timeout)
    }

    /// Registry that is already `Loaded`.
    pub fn preloaded(model: LoadedModel) -> Self {
        Self {
            source: ModelSource::None,
            load_timeout: Duration::ZERO,
            cell: OnceCell::new_with(Some(Arc::new(model))),
            load_attempts: AtomicUsize::new(0),
            pending: Mutex::new(None),
        }
    }

    fn with_source(source: ModelSource, load_timeout: Duration) -> Self {
        Self {
            source,
            load_timeout,
            cell: OnceCell::new(),
            load_attempts: AtomicUsize::new(0),
            pending: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ModelState {
        if self.cell.initialized() {
            ModelState::Loaded
        } else {
            ModelState::Unloaded
        }
    }

    /// How many times the artifact was actually read from storage.
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::SeqCst)
    }

    /// The loaded model, or `ModelUnavailable` while still unloaded.
    pub fn get(&self) -> Result<Arc<LoadedModel>> {
        self.cell
            .get()
            .cloned()
            .ok_or_else(|| RiskError::ModelUnavailable("model is not loaded yet".to_string()))
    }

    /// Load the model if needed and return it.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Arc<LoadedModel>> {
        let model = self.cell.get_or_try_init(|| self.load_once()).await?;
        Ok(Arc::clone(model))
    }

    async fn load_once(&self) -> Result<Arc<LoadedModel>> {
        let mut pending = self.pending.lock().await;
        let mut task = match pending.take() {
            Some(task) => {
                info!("waiting on the model read left running by a timed-out load");
                task
            }
            None => self.spawn_read()?,
        };

        let started = Instant::now();
        let loaded = match tokio::time::timeout(self.load_timeout, &mut task).await {
            Err(_) => {
                error!(timeout = ?self.load_timeout, "model load timed out");
                *pending = Some(task);
                return Err(RiskError::ModelUnavailable(format!(
                    "model load timed out after {:?}",
                    self.load_timeout
                )));
            }
            Ok(Err(join_err)) => {
                error!(error = %join_err, "model load task panicked");
                return Err(RiskError::ModelUnavailable(format!(
                    "model load task failed: {join_err}"
                )));
            }
            Ok(Ok(Err(e))) => {
                error!(error = %e, "model load failed");
                return Err(RiskError::ModelUnavailable(format!("model load failed: {e}")));
            }
            Ok(Ok(Ok(model))) => model,
        };

        info!(
            model = %loaded.manifest().model_id(),
            features = loaded.normalizer().expected_features().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "risk model loaded"
        );
        Ok(Arc::new(loaded))
    }

    fn spawn_read(&self) -> Result<JoinHandle<Result<LoadedModel>>> {
        let loader: Loader = match &self.source {
            ModelSource::Manifest(path) => {
                let path = path.clone();
                Arc::new(move || LoadedModel::from_manifest(&path))
            }
            ModelSource::Custom(loader) => Arc::clone(loader),
            ModelSource::None => {
                return Err(RiskError::ModelUnavailable(
                    "no model source configured".to_string(),
                ))
            }
        };

        self.load_attempts.fetch_add(1, Ordering::SeqCst);
        info!(timeout_secs = self.load_timeout.as_secs_f64(), "loading risk model");
        Ok(tokio::task::spawn_blocking(move || loader()))
    }
}
