use std::fmt::Write;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::normalize_column_name;

type Record = Map<String, Value>;

/// Body of `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub user_message: String,
    #[serde(default)]
    pub churn_metrics: Option<Record>,
    #[serde(default)]
    pub top_risks: Option<Vec<Record>>,
}

/// Body of `POST /generate_report`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub churn_metrics: Option<Record>,
    #[serde(default)]
    pub top_risks: Option<Vec<Record>>,
    #[serde(default)]
    pub csv_columns: Option<Vec<String>>,
}

const CHAT_PROFILE_LIMIT: usize = 3;
const REPORT_PROFILE_LIMIT: usize = 10;

const REPORT_INSTRUCTIONS: &str = "Write an **Executive Churn Report** in a **natural, human-written style**.

**Tone Instructions:**
- Write like a thoughtful human consultant, not a robot.
- Use flowing paragraphs and narrative structures rather than just endless bullet points.
- Be direct, professional, yet conversational.
- Avoid generic AI phrases like \"In conclusion\" or \"Based on the data\". Start sentences directly.

**Structure:**
1. **Executive Summary**: A brief, punchy overview of the situation.
2. **Risk & Feature Analysis (SHAP-style)**:
   - Explain the churn prediction using **SHAP value concepts** by identifying key features that increased or decreased churn risk based on the attached profiles.
   - Categorize the risk levels clearly.
   - Suggest targeted retention strategies in business-friendly language.
3. **The \"Why\" (Business Insights)**: tell the story of *why* people are leaving (e.g., \"It appears our newer customers on month-to-month contracts are feeling the pinch...\").
4. **Proposed Solutions**: Concrete advice.
5. **Data Recommendations**: What else do we need?

Format in clean Markdown.";

/// Look a field up by its normalized column name, so `Contract`,
/// `contract` and `CONTRACT` all match `contract`.
fn lookup<'a>(record: &'a Record, key: &str) -> Option<&'a Value> {
    record.get(key).or_else(|| {
        record
            .iter()
            .find(|(k, _)| normalize_column_name(k) == key)
            .map(|(_, v)| v)
    })
}

fn number(record: &Record, key: &str) -> f64 {
    match lookup(record, key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn text(record: &Record, key: &str, default: &str) -> String {
    match lookup(record, key) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

fn percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

fn non_empty<T>(v: &Option<Vec<T>>) -> Option<&[T]> {
    v.as_deref().filter(|v| !v.is_empty())
}

/// Prompt for the conversational advisor.
pub fn chat_prompt(req: &ChatRequest) -> String {
    let mut context = String::new();

    if let Some(m) = req.churn_metrics.as_ref().filter(|m| !m.is_empty()) {
        let _ = write!(
            context,
            "\n[Current Analysis Context]\nChurn Rate: {}\nAt-Risk Customers: {}\nTotal Customers: {}\n",
            percent(number(m, "churn_rate")),
            text(m, "high_risk_count", "0"),
            text(m, "total_customers", "0"),
        );
    }

    if let Some(risks) = non_empty(&req.top_risks) {
        context.push_str("\n[Sample High-Risk Profiles]\n");
        for (idx, risk) in risks.iter().take(CHAT_PROFILE_LIMIT).enumerate() {
            let _ = writeln!(
                context,
                "- Customer {}: {} contract, Tenure: {} months, Prob: {}",
                idx + 1,
                text(risk, "contract", "Unknown"),
                text(risk, "tenure", "0"),
                percent(number(risk, "churn_probability")),
            );
        }
    }

    format!("{context}\nUser Question: {}", req.user_message)
}

/// Prompt for the executive report.
pub fn report_prompt(req: &ReportRequest) -> String {
    let mut context = String::new();

    if let Some(m) = req.churn_metrics.as_ref().filter(|m| !m.is_empty()) {
        let _ = write!(
            context,
            "\n[Analysis Context]\nGlobal Churn Rate: {}\nHigh Risk Volume: {} / {} total customers.\n",
            percent(number(m, "churn_rate")),
            text(m, "high_risk_count", "0"),
            text(m, "total_customers", "0"),
        );
    }

    if let Some(risks) = non_empty(&req.top_risks) {
        context.push_str("\n[Top High-Risk Customer Profiles Pattern]\n");
        for (idx, risk) in risks.iter().take(REPORT_PROFILE_LIMIT).enumerate() {
            let charges = if lookup(risk, "monthlycharges").is_some() {
                text(risk, "monthlycharges", "Unk")
            } else {
                text(risk, "monthly_charges", "Unk")
            };
            let _ = writeln!(
                context,
                "- Customer {}: Contract={}, Tenure={}, Charges={}, Prob={}",
                idx + 1,
                text(risk, "contract", "Unk"),
                text(risk, "tenure", "0"),
                charges,
                percent(number(risk, "churn_probability")),
            );
        }
    }

    if let Some(columns) = non_empty(&req.csv_columns) {
        let _ = writeln!(context, "\n[Available Data Points]: {}", columns.join(", "));
    }

    format!("{context}\n{REPORT_INSTRUCTIONS}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_chat_prompt_without_context() {
        let req = ChatRequest {
            user_message: "Hi".into(),
            churn_metrics: None,
            top_risks: None,
        };
        assert_eq!(chat_prompt(&req), "\nUser Question: Hi");
    }

    #[test]
    fn test_chat_prompt_with_metrics_and_profiles() {
        let req = ChatRequest {
            user_message: "Why are they leaving?".into(),
            churn_metrics: Some(record(json!({
                "churn_rate": 0.2675,
                "high_risk_count": 107,
                "total_customers": 400
            }))),
            top_risks: Some(
                (0..5)
                    .map(|i| {
                        record(json!({
                            "Contract": "Month-to-month",
                            "tenure": i + 1,
                            "churn_probability": 0.8123
                        }))
                    })
                    .collect(),
            ),
        };
        let prompt = chat_prompt(&req);

        assert!(prompt.contains("Churn Rate: 26.75%"));
        assert!(prompt.contains("At-Risk Customers: 107"));
        assert!(prompt.contains("Total Customers: 400"));
        assert!(prompt.contains("- Customer 1: Month-to-month contract, Tenure: 1 months, Prob: 81.23%"));
        assert!(prompt.contains("- Customer 3:"));
        assert!(!prompt.contains("- Customer 4:"));
        assert!(prompt.ends_with("User Question: Why are they leaving?"));
    }

    #[test]
    fn test_empty_metrics_are_skipped() {
        let req = ChatRequest {
            user_message: "q".into(),
            churn_metrics: Some(Map::new()),
            top_risks: Some(vec![]),
        };
        assert!(!chat_prompt(&req).contains("[Current Analysis Context]"));
    }

    #[test]
    fn test_report_prompt_profiles_and_columns() {
        let req = ReportRequest {
            churn_metrics: Some(record(json!({"churn_rate": 0.3, "high_risk_count": 3, "total_customers": 10}))),
            top_risks: Some(
                (0..12)
                    .map(|_| record(json!({"contract": "Two year", "monthly_charges": 42.5})))
                    .collect(),
            ),
            csv_columns: Some(vec!["tenure".into(), "contract".into()]),
        };
        let prompt = report_prompt(&req);

        assert!(prompt.contains("Global Churn Rate: 30.00%"));
        assert!(prompt.contains("High Risk Volume: 3 / 10 total customers."));
        assert!(prompt.contains("- Customer 10: Contract=Two year, Tenure=0, Charges=42.5, Prob=0.00%"));
        assert!(!prompt.contains("- Customer 11:"));
        assert!(prompt.contains("[Available Data Points]: tenure, contract"));
        assert!(prompt.contains("**Executive Churn Report**"));
    }

    #[test]
    fn test_report_charges_default() {
        let req = ReportRequest {
            top_risks: Some(vec![record(json!({"tenure": 4}))]),
            ..Default::default()
        };
        assert!(report_prompt(&req).contains("Contract=Unk, Tenure=4, Charges=Unk"));
    }
}
