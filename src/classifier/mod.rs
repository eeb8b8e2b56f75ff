pub mod artifact;
pub mod cache;
pub mod logistic;

pub use artifact::{decode_artifact, load_from_path, StageKind, TypeRegistry};
pub use cache::{ArtifactLoader, ModelHandle, ModelLoader};
pub use logistic::{EncodedColumn, LogisticPipeline};

use std::path::PathBuf;

use thiserror::Error;

use crate::models::CanonicalFeatureRow;

/// Inference-time view of a trained churn model.
///
/// Implementations receive the whole batch at once and must return exactly
/// one positive-class probability per row, in input order.
pub trait ChurnClassifier: Send + Sync {
    fn predict_proba(&self, rows: &[CanonicalFeatureRow]) -> Vec<f64>;
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model artifact: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("model artifact references unregistered type `{0}`")]
    UnknownType(String),

    #[error("expected {expected} stage, found `{found}`")]
    UnexpectedStage { expected: &'static str, found: String },

    #[error("invalid model artifact: {0}")]
    Invalid(String),

    #[error("model load task failed: {0}")]
    LoadTask(String),
}
