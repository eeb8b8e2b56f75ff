use crate::models::features::UNKNOWN_CATEGORY;
use crate::models::{CanonicalFeatureRow, CategoricalFeature, NumericFeature, RawTable, RawValue};

/// Candidate source columns for a numeric feature, highest priority first.
///
/// The canonical name is always a candidate so canonical tables pass through.
pub fn numeric_aliases(feature: NumericFeature) -> &'static [&'static str] {
    match feature {
        NumericFeature::TenureMonths => &["tenure", "tenure_months", "months_active"],
        NumericFeature::AvgMonthlySpend => &[
            "monthlycharges",
            "monthly_charges",
            "avg_monthly_spend",
            "monthly_fee",
        ],
        NumericFeature::UsageIntensity => &[
            "totalcharges",
            "data_usage",
            "usage_score",
            "usage_intensity",
        ],
        NumericFeature::SupportInteractions => &[
            "support_calls",
            "complaints",
            "tickets",
            "support_interactions",
        ],
        NumericFeature::EngagementScore => &[
            "engagement",
            "activity_score",
            "sessions",
            "engagement_score",
        ],
    }
}

/// Candidate source columns for a categorical feature, highest priority first.
pub fn categorical_aliases(feature: CategoricalFeature) -> &'static [&'static str] {
    match feature {
        CategoricalFeature::ContractType => &["contract", "contract_type", "plan"],
        CategoricalFeature::PaymentIssues => &["payment_issues", "late_payment", "billing_problem"],
    }
}

/// First alias present in the table, as a column index.
fn pick_column(table: &RawTable, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| table.column_index(alias))
}

/// Numeric coercion. Anything that is not a finite number becomes 0.
pub fn coerce_numeric(value: &RawValue) -> f64 {
    let n = match value {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        RawValue::Missing => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Categorical coercion: stringify, trim, blank or missing → "unknown".
pub fn coerce_categorical(value: &RawValue) -> String {
    let text = value.to_string();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        UNKNOWN_CATEGORY.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Map a raw table onto the canonical feature schema.
///
/// Column names are matched exactly; callers normalize names beforehand.
/// Output has one row per input row, in input order. Never fails.
pub fn normalize(table: &RawTable) -> Vec<CanonicalFeatureRow> {
    let mut rows = vec![CanonicalFeatureRow::default(); table.len()];

    for feature in NumericFeature::ALL {
        if let Some(col) = pick_column(table, numeric_aliases(feature)) {
            for (i, row) in rows.iter_mut().enumerate() {
                row.set_numeric(feature, coerce_numeric(table.value(i, col)));
            }
        }
    }

    for feature in CategoricalFeature::ALL {
        if let Some(col) = pick_column(table, categorical_aliases(feature)) {
            for (i, row) in rows.iter_mut().enumerate() {
                row.set_categorical(feature, coerce_categorical(table.value(i, col)));
            }
        }
    }

    rows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
