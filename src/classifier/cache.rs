use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use metrics::{gauge, histogram};
use tokio::sync::OnceCell;

use super::artifact::{load_from_path, TypeRegistry};
use super::{ChurnClassifier, ModelError};

/// Produces the classifier on first use. Runs on a blocking thread.
pub trait ModelLoader: Send + Sync + 'static {
    fn load(&self) -> Result<Arc<dyn ChurnClassifier>, ModelError>;

    fn describe(&self) -> String;
}

/// Loads the JSON artifact from disk through a type registry.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    path: PathBuf,
    registry: Arc<TypeRegistry>,
}

impl ArtifactLoader {
    pub fn new(path: impl Into<PathBuf>, registry: Arc<TypeRegistry>) -> Self {
        Self {
            path: path.into(),
            registry,
        }
    }
}

impl ModelLoader for ArtifactLoader {
    fn load(&self) -> Result<Arc<dyn ChurnClassifier>, ModelError> {
        let model = load_from_path(&self.path, &self.registry)?;
        tracing::debug!(
            path = %self.path.display(),
            features = model.width(),
            "Model artifact decoded"
        );
        Ok(Arc::new(model))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

struct Fixed(Arc<dyn ChurnClassifier>);

impl ModelLoader for Fixed {
    fn load(&self) -> Result<Arc<dyn ChurnClassifier>, ModelError> {
        Ok(Arc::clone(&self.0))
    }

    fn describe(&self) -> String {
        "preloaded".into()
    }
}

/// Process-wide classifier handle: loaded once, shared by every request.
///
/// Concurrent first callers wait on the same load. A failed load leaves the
/// handle empty, so the next caller tries again.
pub struct ModelHandle {
    cell: OnceCell<Arc<dyn ChurnClassifier>>,
    loader: Arc<dyn ModelLoader>,
}

impl ModelHandle {
    pub fn new(loader: impl ModelLoader) -> Self {
        Self {
            cell: OnceCell::new(),
            loader: Arc::new(loader),
        }
    }

    pub fn from_artifact(path: impl Into<PathBuf>, registry: Arc<TypeRegistry>) -> Self {
        Self::new(ArtifactLoader::new(path, registry))
    }

    /// Handle that already holds `model`; the loader is never consulted.
    pub fn preloaded(model: Arc<dyn ChurnClassifier>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Arc::clone(&model))),
            loader: Arc::new(Fixed(model)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Return the cached classifier, loading it on first call.
    pub async fn get(&self) -> Result<Arc<dyn ChurnClassifier>, ModelError> {
        let model = self
            .cell
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let source = loader.describe();
                let started = Instant::now();

                let loaded = tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| ModelError::LoadTask(e.to_string()))?;

                match loaded {
                    Ok(model) => {
                        let elapsed = started.elapsed();
                        histogram!("model_load_seconds").record(elapsed.as_secs_f64());
                        gauge!("model_loaded").set(1.0);
                        tracing::info!(
                            source = %source,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "Churn model loaded"
                        );
                        Ok(model)
                    }
                    Err(e) => {
                        tracing::error!(source = %source, error = %e, "Failed to load churn model");
                        Err(e)
                    }
                }
            })
            .await?;

        Ok(Arc::clone(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CanonicalFeatureRow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Constant(f64);

    impl ChurnClassifier for Constant {
        fn predict_proba(&self, rows: &[CanonicalFeatureRow]) -> Vec<f64> {
            vec![self.0; rows.len()]
        }
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ModelLoader for Counting {
        fn load(&self) -> Result<Arc<dyn ChurnClassifier>, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            if self.fail {
                Err(ModelError::Invalid("boom".into()))
            } else {
                Ok(Arc::new(Constant(0.4)))
            }
        }

        fn describe(&self) -> String {
            "counting".into()
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_load_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = Arc::new(ModelHandle::new(Counting {
            calls: Arc::clone(&calls),
            fail: false,
        }));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                tokio::spawn(async move { handle.get().await.unwrap() })
            })
            .collect();

        let mut models = Vec::new();
        for t in tasks {
            models.push(t.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(handle.is_loaded());
        assert!(models.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = ModelHandle::new(Counting {
            calls: Arc::clone(&calls),
            fail: true,
        });

        assert!(handle.get().await.is_err());
        assert!(handle.get().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!handle.is_loaded());
    }

    #[tokio::test]
    async fn test_preloaded_handle() {
        let model: Arc<dyn ChurnClassifier> = Arc::new(Constant(0.9));
        let handle = ModelHandle::preloaded(Arc::clone(&model));
        assert!(handle.is_loaded());
        assert!(Arc::ptr_eq(&handle.get().await.unwrap(), &model));
    }

    #[tokio::test]
    async fn test_missing_artifact_surfaces_io_error() {
        let handle = ModelHandle::from_artifact(
            "/nonexistent/model.json",
            Arc::new(TypeRegistry::with_legacy_aliases()),
        );
        assert!(matches!(handle.get().await, Err(ModelError::Io { .. })));
    }
}
