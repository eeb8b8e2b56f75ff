use crate::models::{CanonicalFeatureRow, CategoricalFeature, NumericFeature};

use super::{ChurnClassifier, ModelError};

/// One column of the preprocessing stage, in output order.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedColumn {
    /// Standardised numeric feature: `(x - mean) / scale`.
    Scaled {
        feature: NumericFeature,
        mean: f64,
        scale: f64,
    },
    /// One-hot encoded categorical feature. Unseen categories encode to all zeros.
    OneHot {
        feature: CategoricalFeature,
        categories: Vec<String>,
    },
}

impl EncodedColumn {
    pub fn width(&self) -> usize {
        match self {
            EncodedColumn::Scaled { .. } => 1,
            EncodedColumn::OneHot { categories, .. } => categories.len(),
        }
    }
}

/// Preprocessing + logistic regression, evaluated in one pass per row.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticPipeline {
    columns: Vec<EncodedColumn>,
    coef: Vec<f64>,
    intercept: f64,
}

impl LogisticPipeline {
    pub fn new(
        columns: Vec<EncodedColumn>,
        coef: Vec<f64>,
        intercept: f64,
    ) -> Result<Self, ModelError> {
        let width: usize = columns.iter().map(EncodedColumn::width).sum();
        if width != coef.len() {
            return Err(ModelError::Invalid(format!(
                "classifier has {} coefficients but preprocessing produces {width} features",
                coef.len()
            )));
        }
        if !intercept.is_finite() || coef.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Invalid("non-finite classifier weights".into()));
        }

        Ok(Self {
            columns,
            coef,
            intercept,
        })
    }

    pub fn columns(&self) -> &[EncodedColumn] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.coef.len()
    }

    /// Linear decision value `w·x + b` for one row.
    pub fn decision(&self, row: &CanonicalFeatureRow) -> f64 {
        let mut z = self.intercept;
        let mut offset = 0;

        for column in &self.columns {
            match column {
                EncodedColumn::Scaled {
                    feature,
                    mean,
                    scale,
                } => {
                    let scale = if *scale == 0.0 { 1.0 } else { *scale };
                    z += self.coef[offset] * (row.numeric(*feature) - mean) / scale;
                }
                EncodedColumn::OneHot {
                    feature,
                    categories,
                } => {
                    let value = row.categorical(*feature);
                    if let Some(i) = categories.iter().position(|c| c == value) {
                        z += self.coef[offset + i];
                    }
                }
            }
            offset += column.width();
        }

        z
    }
}

impl ChurnClassifier for LogisticPipeline {
    fn predict_proba(&self, rows: &[CanonicalFeatureRow]) -> Vec<f64> {
        rows.iter().map(|row| sigmoid(self.decision(row))).collect()
    }
}

/// Logistic function without overflow for large |z|.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
