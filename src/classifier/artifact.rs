//! Decoding of the on-disk model artifact.
//!
//! The artifact is a JSON tree of name-tagged nodes (`{"type": "...", ...}`)
//! laid out like the scikit-learn pipeline it was exported from. Every type
//! name is resolved through a [`TypeRegistry`]; names the registry does not
//! know are a hard error.

use std::collections::HashMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{CategoricalFeature, NumericFeature};

use super::logistic::{EncodedColumn, LogisticPipeline};
use super::ModelError;

/// Node kinds the loader knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Pipeline,
    FeatureMapper,
    ColumnTransformer,
    RemainderColumns,
    StandardScaler,
    OneHotEncoder,
    LogisticRegression,
}

impl StageKind {
    pub const ALL: [StageKind; 7] = [
        StageKind::Pipeline,
        StageKind::FeatureMapper,
        StageKind::ColumnTransformer,
        StageKind::RemainderColumns,
        StageKind::StandardScaler,
        StageKind::OneHotEncoder,
        StageKind::LogisticRegression,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            StageKind::Pipeline => "churnlens.Pipeline",
            StageKind::FeatureMapper => "churnlens.FeatureMapper",
            StageKind::ColumnTransformer => "churnlens.ColumnTransformer",
            StageKind::RemainderColumns => "churnlens.RemainderColumns",
            StageKind::StandardScaler => "churnlens.StandardScaler",
            StageKind::OneHotEncoder => "churnlens.OneHotEncoder",
            StageKind::LogisticRegression => "churnlens.LogisticRegression",
        }
    }
}

/// Names written by the original exporter. The mapper was defined in the
/// training notebook, so it was recorded under `__main__`.
const LEGACY_ALIASES: &[(&str, StageKind)] = &[
    ("sklearn.pipeline.Pipeline", StageKind::Pipeline),
    ("__main__.UniversalFeatureMapper", StageKind::FeatureMapper),
    ("model.UniversalFeatureMapper", StageKind::FeatureMapper),
    (
        "sklearn.compose._column_transformer.ColumnTransformer",
        StageKind::ColumnTransformer,
    ),
    (
        "sklearn.compose._column_transformer._RemainderColsList",
        StageKind::RemainderColumns,
    ),
    (
        "sklearn.preprocessing._data.StandardScaler",
        StageKind::StandardScaler,
    ),
    (
        "sklearn.preprocessing._encoders.OneHotEncoder",
        StageKind::OneHotEncoder,
    ),
    (
        "sklearn.linear_model._logistic.LogisticRegression",
        StageKind::LogisticRegression,
    ),
];

/// Lookup table from artifact type names to stage kinds.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    kinds: HashMap<String, StageKind>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Registry that only knows the canonical `churnlens.*` names.
    pub fn new() -> Self {
        let kinds = StageKind::ALL
            .into_iter()
            .map(|k| (k.canonical_name().to_string(), k))
            .collect();
        Self { kinds }
    }

    /// Canonical names plus every historical alias the exporter has used.
    pub fn with_legacy_aliases() -> Self {
        let mut registry = Self::new();
        for (name, kind) in LEGACY_ALIASES {
            registry.register(*name, *kind);
        }
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, kind: StageKind) {
        self.kinds.insert(name.into(), kind);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> Result<StageKind, ModelError> {
        self.kinds
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownType(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Node {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(flatten)]
    params: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct PipelineParams {
    steps: Vec<(String, Node)>,
}

#[derive(Debug, Deserialize)]
struct ColumnTransformerParams {
    transformers: Vec<(String, Node, Vec<String>)>,
    #[serde(default)]
    remainder: Option<Remainder>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Remainder {
    Keyword(String),
    Node(Node),
}

#[derive(Debug, Deserialize)]
struct StandardScalerParams {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct OneHotEncoderParams {
    categories: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct LogisticRegressionParams {
    coef: Weights,
    intercept: Intercept,
}

/// Coefficients as a flat list or sklearn's `(1, n)` shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Weights {
    Flat(Vec<f64>),
    Rows(Vec<Vec<f64>>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Intercept {
    Scalar(f64),
    List(Vec<f64>),
}

impl Weights {
    fn into_flat(self) -> Result<Vec<f64>, ModelError> {
        match self {
            Weights::Flat(w) => Ok(w),
            Weights::Rows(mut rows) if rows.len() == 1 => Ok(rows.remove(0)),
            Weights::Rows(rows) => Err(ModelError::Invalid(format!(
                "expected a binary classifier, found {} coefficient rows",
                rows.len()
            ))),
        }
    }
}

impl Intercept {
    fn into_scalar(self) -> Result<f64, ModelError> {
        match self {
            Intercept::Scalar(b) => Ok(b),
            Intercept::List(v) if v.len() == 1 => Ok(v[0]),
            Intercept::List(v) => Err(ModelError::Invalid(format!(
                "expected one intercept, found {}",
                v.len()
            ))),
        }
    }
}

fn params<T: DeserializeOwned>(node: Node) -> Result<T, ModelError> {
    Ok(serde_json::from_value(Value::Object(node.params))?)
}

fn expect_kind(
    registry: &TypeRegistry,
    node: &Node,
    expected: StageKind,
    label: &'static str,
) -> Result<(), ModelError> {
    if registry.resolve(&node.type_name)? == expected {
        Ok(())
    } else {
        Err(ModelError::UnexpectedStage {
            expected: label,
            found: node.type_name.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read and decode the artifact at `path`.
pub fn load_from_path(path: &Path, registry: &TypeRegistry) -> Result<LogisticPipeline, ModelError> {
    let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_artifact(&bytes, registry)
}

/// Decode an artifact held in memory.
pub fn decode_artifact(bytes: &[u8], registry: &TypeRegistry) -> Result<LogisticPipeline, ModelError> {
    let root: Node = serde_json::from_slice(bytes)?;
    expect_kind(registry, &root, StageKind::Pipeline, "pipeline")?;
    let pipeline: PipelineParams = params(root)?;

    let mut columns: Option<Vec<EncodedColumn>> = None;
    let mut classifier: Option<(Vec<f64>, f64)> = None;

    for (step_name, node) in pipeline.steps {
        if classifier.is_some() {
            return Err(ModelError::Invalid(format!(
                "step `{step_name}` follows the classifier"
            )));
        }

        match registry.resolve(&node.type_name)? {
            // Canonical mapping happens in the normalizer before scoring.
            StageKind::FeatureMapper => {}
            StageKind::ColumnTransformer => {
                if columns.is_some() {
                    return Err(ModelError::Invalid(
                        "more than one column transformer".into(),
                    ));
                }
                columns = Some(decode_column_transformer(registry, params(node)?)?);
            }
            StageKind::LogisticRegression => {
                let p: LogisticRegressionParams = params(node)?;
                classifier = Some((p.coef.into_flat()?, p.intercept.into_scalar()?));
            }
            _ => {
                return Err(ModelError::UnexpectedStage {
                    expected: "pipeline step",
                    found: node.type_name,
                })
            }
        }
    }

    let columns = columns.ok_or_else(|| ModelError::Invalid("missing column transformer".into()))?;
    let (coef, intercept) =
        classifier.ok_or_else(|| ModelError::Invalid("missing classifier step".into()))?;

    LogisticPipeline::new(columns, coef, intercept)
}

fn decode_column_transformer(
    registry: &TypeRegistry,
    ct: ColumnTransformerParams,
) -> Result<Vec<EncodedColumn>, ModelError> {
    match ct.remainder {
        None => {}
        Some(Remainder::Keyword(k)) if k == "drop" => {}
        Some(Remainder::Keyword(k)) => {
            return Err(ModelError::Invalid(format!(
                "unsupported remainder policy `{k}`"
            )))
        }
        Some(Remainder::Node(node)) => {
            expect_kind(registry, &node, StageKind::RemainderColumns, "remainder")?;
        }
    }

    let mut columns = Vec::new();
    for (name, node, targets) in ct.transformers {
        match registry.resolve(&node.type_name)? {
            StageKind::StandardScaler => {
                let p: StandardScalerParams = params(node)?;
                if p.mean.len() != targets.len() || p.scale.len() != targets.len() {
                    return Err(ModelError::Invalid(format!(
                        "transformer `{name}`: scaler parameters do not match {} columns",
                        targets.len()
                    )));
                }
                for ((target, mean), scale) in targets.iter().zip(p.mean).zip(p.scale) {
                    let feature = NumericFeature::from_name(target).ok_or_else(|| {
                        ModelError::Invalid(format!(
                            "transformer `{name}`: `{target}` is not a numeric feature"
                        ))
                    })?;
                    columns.push(EncodedColumn::Scaled {
                        feature,
                        mean,
                        scale,
                    });
                }
            }
            StageKind::OneHotEncoder => {
                let p: OneHotEncoderParams = params(node)?;
                if p.categories.len() != targets.len() {
                    return Err(ModelError::Invalid(format!(
                        "transformer `{name}`: encoder categories do not match {} columns",
                        targets.len()
                    )));
                }
                for (target, categories) in targets.iter().zip(p.categories) {
                    let feature = CategoricalFeature::from_name(target).ok_or_else(|| {
                        ModelError::Invalid(format!(
                            "transformer `{name}`: `{target}` is not a categorical feature"
                        ))
                    })?;
                    columns.push(EncodedColumn::OneHot {
                        feature,
                        categories,
                    });
                }
            }
            _ => {
                return Err(ModelError::UnexpectedStage {
                    expected: "transformer",
                    found: node.type_name,
                })
            }
        }
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ChurnClassifier;
    use crate::models::CanonicalFeatureRow;
    use serde_json::json;

    fn legacy_artifact() -> Value {
        json!({
            "type": "sklearn.pipeline.Pipeline",
            "steps": [
                ["mapper", {"type": "__main__.UniversalFeatureMapper"}],
                ["preprocess", {
                    "type": "sklearn.compose._column_transformer.ColumnTransformer",
                    "transformers": [
                        ["num", {"type": "sklearn.preprocessing._data.StandardScaler",
                                 "mean": [12.0], "scale": [6.0]}, ["tenure_months"]],
                        ["cat", {"type": "sklearn.preprocessing._encoders.OneHotEncoder",
                                 "categories": [["No", "Yes"]]}, ["payment_issues"]]
                    ],
                    "remainder": {"type": "sklearn.compose._column_transformer._RemainderColsList",
                                  "columns": []}
                }],
                ["clf", {"type": "sklearn.linear_model._logistic.LogisticRegression",
                         "coef": [[-0.5, -0.2, 0.9]], "intercept": [-0.3]}]
            ]
        })
    }

    fn bytes(v: &Value) -> Vec<u8> {
        serde_json::to_vec(v).unwrap()
    }

    #[test]
    fn test_legacy_artifact_needs_aliases() {
        let err = decode_artifact(&bytes(&legacy_artifact()), &TypeRegistry::new()).unwrap_err();
        assert!(matches!(err, ModelError::UnknownType(name) if name == "sklearn.pipeline.Pipeline"));
    }

    #[test]
    fn test_mapper_alias_alone_is_required() {
        let mut registry = TypeRegistry::with_legacy_aliases();
        registry.kinds.remove("__main__.UniversalFeatureMapper");
        let err = decode_artifact(&bytes(&legacy_artifact()), &registry).unwrap_err();
        assert!(
            matches!(err, ModelError::UnknownType(name) if name == "__main__.UniversalFeatureMapper")
        );
    }

    #[test]
    fn test_legacy_artifact_decodes_with_aliases() {
        let model =
            decode_artifact(&bytes(&legacy_artifact()), &TypeRegistry::with_legacy_aliases()).unwrap();
        assert_eq!(model.width(), 3);

        let row = CanonicalFeatureRow {
            tenure_months: 12.0,
            payment_issues: "Yes".into(),
            ..Default::default()
        };
        // z = -0.3 + 0 + 0.9 = 0.6
        assert!((model.decision(&row) - 0.6).abs() < 1e-12);
        assert_eq!(model.predict_proba(&[row]).len(), 1);
    }

    #[test]
    fn test_canonical_names_decode_without_aliases() {
        let artifact = json!({
            "type": "churnlens.Pipeline",
            "steps": [
                ["preprocess", {
                    "type": "churnlens.ColumnTransformer",
                    "transformers": [
                        ["num", {"type": "churnlens.StandardScaler", "mean": [0.0], "scale": [1.0]},
                         ["engagement_score"]]
                    ],
                    "remainder": "drop"
                }],
                ["clf", {"type": "churnlens.LogisticRegression", "coef": [1.0], "intercept": 0.0}]
            ]
        });
        let model = decode_artifact(&bytes(&artifact), &TypeRegistry::new()).unwrap();
        assert_eq!(model.width(), 1);
    }

    #[test]
    fn test_unknown_feature_column_rejected() {
        let artifact = json!({
            "type": "churnlens.Pipeline",
            "steps": [
                ["preprocess", {
                    "type": "churnlens.ColumnTransformer",
                    "transformers": [
                        ["num", {"type": "churnlens.StandardScaler", "mean": [0.0], "scale": [1.0]},
                         ["contract_type"]]
                    ]
                }],
                ["clf", {"type": "churnlens.LogisticRegression", "coef": [1.0], "intercept": 0.0}]
            ]
        });
        let err = decode_artifact(&bytes(&artifact), &TypeRegistry::new()).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(_)));
    }

    #[test]
    fn test_missing_classifier_rejected() {
        let artifact = json!({
            "type": "churnlens.Pipeline",
            "steps": [
                ["preprocess", {"type": "churnlens.ColumnTransformer", "transformers": []}]
            ]
        });
        let err = decode_artifact(&bytes(&artifact), &TypeRegistry::new()).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(msg) if msg.contains("classifier")));
    }

    #[test]
    fn test_corrupt_bytes_are_decode_errors() {
        let err = decode_artifact(b"\x80\x04\x95pickle", &TypeRegistry::with_legacy_aliases())
            .unwrap_err();
        assert!(matches!(err, ModelError::Decode(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_from_path(
            Path::new("/nonexistent/universal_churn_model.json"),
            &TypeRegistry::with_legacy_aliases(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }
}
