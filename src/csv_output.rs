//! CSV output format for evaluation reports
//!
//! One CSV section per table, each preceded by a `# <heading>` line, for
//! spreadsheet analysis and machine parsing.

use crate::report::EvaluationReport;

/// CSV output formatter
#[derive(Debug, Default)]
pub struct CsvOutput {
    reports: Vec<EvaluationReport>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_report(&mut self, report: EvaluationReport) {
        self.reports.push(report);
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn optional(value: Option<u64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    fn section(output: &mut String, title: &str, header: &str, rows: Vec<String>) {
        output.push_str("# ");
        output.push_str(title);
        output.push('\n');
        output.push_str(header);
        output.push('\n');
        for row in rows {
            output.push_str(&row);
            output.push('\n');
        }
    }

    fn format_report(output: &mut String, report: &EvaluationReport) {
        let heading = report.heading();

        Self::section(
            output,
            &format!("{} cycles", heading),
            "operation,iterations,mean,median,stdev",
            vec![format!(
                "{},{},{},{},{}",
                Self::escape_field(&report.operation),
                report.iterations,
                report.cycles.mean,
                report.cycles.median,
                Self::optional(report.cycles.stdev)
            )],
        );

        Self::section(
            output,
            &format!("{} categories", heading),
            "category,instructions,stalls,total,percentage",
            report
                .categories
                .iter()
                .map(|c| {
                    format!(
                        "{},{},{},{},{}",
                        Self::escape_field(&c.category),
                        c.instructions,
                        c.stalls,
                        c.total,
                        c.percentage
                    )
                })
                .collect(),
        );

        Self::section(
            output,
            &format!("{} functions", heading),
            "function,category,calls,instructions,stalls,total,per_call",
            report
                .functions
                .iter()
                .map(|f| {
                    format!(
                        "{},{},{},{},{},{},{}",
                        Self::escape_field(&f.function),
                        Self::escape_field(&f.category),
                        Self::optional(f.calls),
                        f.instructions,
                        f.stalls,
                        f.total,
                        Self::optional(f.per_call)
                    )
                })
                .collect(),
        );

        Self::section(
            output,
            &format!("{} histogram", heading),
            "instruction,count",
            report
                .histogram
                .iter()
                .map(|h| format!("{},{}", Self::escape_field(&h.mnemonic), h.count))
                .collect(),
        );
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        for (idx, report) in self.reports.iter().enumerate() {
            if idx > 0 {
                output.push('\n');
            }
            Self::format_report(&mut output, report);
        }
        output
    }
}
