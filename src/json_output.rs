//! JSON output format for evaluation reports
//!
//! `--format json` implementation

use crate::report::EvaluationReport;
use serde::Serialize;

/// A selection that could not be evaluated
#[derive(Debug, Clone, Serialize)]
pub struct JsonFailure {
    /// Benchmark ids of the selection
    pub selection: Vec<u64>,
    /// Rendered error message
    pub error: String,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    /// Successful reports, in selection order
    pub reports: Vec<EvaluationReport>,
    /// Failed selections (omitted when every selection succeeded)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<JsonFailure>,
}

impl JsonOutput {
    /// Create a new JSON output structure
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "cyclestat-json-v1".to_string(),
            reports: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn add_report(&mut self, report: EvaluationReport) {
        self.reports.push(report);
    }

    pub fn add_failure(&mut self, selection: &[u64], error: impl ToString) {
        self.failures.push(JsonFailure {
            selection: selection.to_vec(),
            error: error.to_string(),
        });
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}
