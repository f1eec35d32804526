//! Flat key/value export of report figures as `\DefineVar{key}{value}` macros
//!
//! Keys are prefixed with the operation name, `_` replaced by `-`.
//! Category and function names are used as they appear in the report.

use crate::report::EvaluationReport;
use std::fmt::Write as _;

/// Single exported figure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroEntry {
    pub key: String,
    pub value: u64,
}

/// Macro export of one or more reports
#[derive(Debug, Default)]
pub struct MacroExport {
    blocks: Vec<(String, Vec<MacroEntry>)>,
}

/// Operation name as used in macro keys
pub fn macro_prefix(operation: &str) -> String {
    operation.replace('_', "-")
}

impl MacroExport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every figure of `report`
    ///
    /// Functions without a per-call value and a missing standard deviation
    /// produce no entry.
    pub fn add_report(&mut self, report: &EvaluationReport) {
        let op = macro_prefix(&report.operation);
        let mut entries = Vec::new();

        for category in &report.categories {
            entries.push(MacroEntry {
                key: format!("percentage-{}-{}", op, category.category),
                value: category.percentage,
            });
        }
        for function in &report.functions {
            entries.push(MacroEntry {
                key: format!("{}-{}-acc", op, function.function),
                value: function.total,
            });
        }
        for function in &report.functions {
            if let Some(per_call) = function.per_call {
                entries.push(MacroEntry {
                    key: format!("{}-{}", op, function.function),
                    value: per_call,
                });
            }
        }
        entries.push(MacroEntry {
            key: format!("{}-mean", op),
            value: report.cycles.mean,
        });
        entries.push(MacroEntry {
            key: format!("{}-median", op),
            value: report.cycles.median,
        });
        if let Some(stdev) = report.cycles.stdev {
            entries.push(MacroEntry {
                key: format!("{}-stdev", op),
                value: stdev,
            });
        }

        self.blocks.push((report.heading(), entries));
    }

    /// All entries in export order
    pub fn entries(&self) -> Vec<(String, u64)> {
        self.blocks
            .iter()
            .flat_map(|(_, entries)| entries.iter().map(|e| (e.key.clone(), e.value)))
            .collect()
    }

    pub fn to_latex(&self) -> String {
        let mut out = String::new();
        for (heading, entries) in &self.blocks {
            let _ = writeln!(out, "% --- {} ---", heading);
            for entry in entries {
                let _ = writeln!(out, "\\DefineVar{{{}}}{{{}}}", entry.key, entry.value);
            }
            out.push('\n');
        }
        out
    }
}
