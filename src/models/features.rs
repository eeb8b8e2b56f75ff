use serde::{Deserialize, Serialize};
use std::fmt;

/// Default for categorical features that are absent or blank.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Numeric columns of the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericFeature {
    TenureMonths,
    AvgMonthlySpend,
    UsageIntensity,
    SupportInteractions,
    EngagementScore,
}

impl NumericFeature {
    pub const ALL: [NumericFeature; 5] = [
        NumericFeature::TenureMonths,
        NumericFeature::AvgMonthlySpend,
        NumericFeature::UsageIntensity,
        NumericFeature::SupportInteractions,
        NumericFeature::EngagementScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NumericFeature::TenureMonths => "tenure_months",
            NumericFeature::AvgMonthlySpend => "avg_monthly_spend",
            NumericFeature::UsageIntensity => "usage_intensity",
            NumericFeature::SupportInteractions => "support_interactions",
            NumericFeature::EngagementScore => "engagement_score",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for NumericFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical columns of the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalFeature {
    ContractType,
    PaymentIssues,
}

impl CategoricalFeature {
    pub const ALL: [CategoricalFeature; 2] =
        [CategoricalFeature::ContractType, CategoricalFeature::PaymentIssues];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoricalFeature::ContractType => "contract_type",
            CategoricalFeature::PaymentIssues => "payment_issues",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for CategoricalFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-schema row consumed by the classifier. Every field is always set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFeatureRow {
    pub tenure_months: f64,
    pub avg_monthly_spend: f64,
    pub usage_intensity: f64,
    pub support_interactions: f64,
    pub engagement_score: f64,
    pub contract_type: String,
    pub payment_issues: String,
}

impl Default for CanonicalFeatureRow {
    fn default() -> Self {
        Self {
            tenure_months: 0.0,
            avg_monthly_spend: 0.0,
            usage_intensity: 0.0,
            support_interactions: 0.0,
            engagement_score: 0.0,
            contract_type: UNKNOWN_CATEGORY.into(),
            payment_issues: UNKNOWN_CATEGORY.into(),
        }
    }
}

impl CanonicalFeatureRow {
    pub fn numeric(&self, feature: NumericFeature) -> f64 {
        match feature {
            NumericFeature::TenureMonths => self.tenure_months,
            NumericFeature::AvgMonthlySpend => self.avg_monthly_spend,
            NumericFeature::UsageIntensity => self.usage_intensity,
            NumericFeature::SupportInteractions => self.support_interactions,
            NumericFeature::EngagementScore => self.engagement_score,
        }
    }

    pub fn set_numeric(&mut self, feature: NumericFeature, value: f64) {
        let slot = match feature {
            NumericFeature::TenureMonths => &mut self.tenure_months,
            NumericFeature::AvgMonthlySpend => &mut self.avg_monthly_spend,
            NumericFeature::UsageIntensity => &mut self.usage_intensity,
            NumericFeature::SupportInteractions => &mut self.support_interactions,
            NumericFeature::EngagementScore => &mut self.engagement_score,
        };
        *slot = value;
    }

    pub fn categorical(&self, feature: CategoricalFeature) -> &str {
        match feature {
            CategoricalFeature::ContractType => &self.contract_type,
            CategoricalFeature::PaymentIssues => &self.payment_issues,
        }
    }

    pub fn set_categorical(&mut self, feature: CategoricalFeature, value: String) {
        match feature {
            CategoricalFeature::ContractType => self.contract_type = value,
            CategoricalFeature::PaymentIssues => self.payment_issues = value,
        }
    }
}
