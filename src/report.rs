//! Structured evaluation report and its plain-text rendering
//!
//! Every integer in the report has already been rounded half-to-even from
//! the engine's `f64` values. The JSON, CSV and macro renderers all read
//! this one structure.

use crate::grouping::CategoryShare;
use crate::stats::Reducer;
use serde::Serialize;
use std::fmt::Write as _;

/// Top-line cycle statistics over the iteration totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub mean: u64,
    pub median: u64,
    /// `None` when fewer than two iterations were selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdev: Option<u64>,
}

/// Absolute statistic of one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRow {
    pub category: String,
    pub instructions: u64,
    pub stalls: u64,
    pub total: u64,
    pub percentage: u64,
}

/// Accumulated statistic of one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionRow {
    pub function: String,
    pub category: String,
    /// Representative call count, `None` without usable call data
    pub calls: Option<u64>,
    pub instructions: u64,
    pub stalls: u64,
    pub total: u64,
    pub per_call: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramRow {
    pub mnemonic: String,
    pub count: u64,
}

/// Report for one selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationReport {
    pub operation: String,
    pub runs: Vec<u64>,
    pub reducer: Reducer,
    pub scheme: String,
    pub iterations: usize,
    pub cycles: CycleSummary,
    /// Percentage table, categories rounding to 0% left out
    pub percentages: Vec<CategoryShare>,
    /// Every category with its absolute totals, descending
    pub categories: Vec<CategoryRow>,
    /// Every function, descending by total
    pub functions: Vec<FunctionRow>,
    pub histogram: Vec<HistogramRow>,
}

impl EvaluationReport {
    /// Block heading shared by the text and CSV renderers
    pub fn heading(&self) -> String {
        format!("{}: selection {:?}", self.operation, self.runs)
    }

    /// Render as headed, column-aligned text tables
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "--- {} ---", self.heading());

        let _ = writeln!(
            out,
            "\nOverall Stats ({} iterations, scheme {})",
            self.iterations, self.scheme
        );
        let stdev = self
            .cycles
            .stdev
            .map_or_else(|| "n/a".to_string(), |s| s.to_string());
        out.push_str(&render_table(
            &["mean", "median", "stdev"],
            &[vec![
                self.cycles.mean.to_string(),
                self.cycles.median.to_string(),
                stdev,
            ]],
        ));

        let _ = writeln!(out, "\nGroup Percentages ({})", self.reducer);
        if self.percentages.is_empty() {
            out.push_str("  (no cycles attributed)\n");
        }
        for share in &self.percentages {
            let _ = writeln!(out, "  {}", share);
        }

        let _ = writeln!(out, "\nPer Function Statistics (accumulated, {})", self.reducer);
        let rows: Vec<Vec<String>> = self
            .functions
            .iter()
            .map(|f| {
                vec![
                    f.function.clone(),
                    f.category.clone(),
                    optional(f.calls),
                    f.instructions.to_string(),
                    f.stalls.to_string(),
                    f.total.to_string(),
                    optional(f.per_call),
                ]
            })
            .collect();
        out.push_str(&render_table(
            &[
                "function",
                "category",
                "calls",
                "instructions",
                "stalls",
                "total",
                "per_call",
            ],
            &rows,
        ));

        let _ = writeln!(out, "\nInstruction Histogram (median per iteration)");
        let rows: Vec<Vec<String>> = self
            .histogram
            .iter()
            .map(|h| vec![h.mnemonic.clone(), h.count.to_string()])
            .collect();
        out.push_str(&render_table(&["instruction", "count"], &rows));

        out
    }
}

fn optional(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Left-align the first column, right-align the rest
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = render_line(headers.iter().copied(), &widths);
    for row in rows {
        out.push_str(&render_line(row.iter().map(String::as_str), &widths));
    }
    out
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut text = String::from(" ");
    for (idx, (cell, width)) in cells.zip(widths).enumerate() {
        if idx == 0 {
            let _ = write!(text, " {:<width$}", cell, width = width);
        } else {
            let _ = write!(text, "  {:>width$}", cell, width = width);
        }
    }
    text.truncate(text.trim_end().len());
    text.push('\n');
    text
}
