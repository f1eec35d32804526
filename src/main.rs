use anyhow::{Context, Result};
use clap::Parser;
use cyclestat::{
    cli::{Cli, OutputFormat},
    config::EvalConfig,
    csv_output::CsvOutput,
    evaluation::evaluate_many,
    grouping::GroupingRegistry,
    json_output::JsonOutput,
    macro_output::MacroExport,
    report::EvaluationReport,
    store::{JsonTraceStore, Selection},
};
use std::fs;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Render successful reports in the requested format
fn render(
    format: OutputFormat,
    reports: &[EvaluationReport],
    failures: &[(Vec<u64>, String)],
) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => reports
            .iter()
            .map(EvaluationReport::to_text)
            .collect::<Vec<_>>()
            .join("\n\n"),
        OutputFormat::Json => {
            let mut output = JsonOutput::new();
            for report in reports {
                output.add_report(report.clone());
            }
            for (selection, error) in failures {
                output.add_failure(selection, error);
            }
            output.to_json()?
        }
        OutputFormat::Csv => {
            let mut output = CsvOutput::new();
            for report in reports {
                output.add_report(report.clone());
            }
            output.to_csv()
        }
    })
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let ids = args.benchmark_ids()?;

    let config = match &args.config {
        Some(path) => EvalConfig::from_toml(path)?,
        None => EvalConfig::default(),
    };

    let registry = match &args.groupings {
        Some(path) => GroupingRegistry::from_toml(path)?,
        None => GroupingRegistry::default_schemes()?,
    };
    let categories = registry.scheme(&args.scheme)?;

    let store = JsonTraceStore::open(&args.trace)
        .with_context(|| format!("Failed to open trace {}", args.trace.display()))?;

    let selections: Vec<Selection> = ids.iter().map(|&id| Selection::single(id)).collect();
    let results = evaluate_many(
        &store,
        &selections,
        args.stat,
        categories,
        &config,
        args.jobs,
    )?;

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (selection, result) in selections.iter().zip(results) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                eprintln!("Selection {:?} failed: {}", selection.runs(), e);
                failures.push((selection.runs().to_vec(), e.to_string()));
            }
        }
    }

    let rendered = render(args.format, &reports, &failures)?;
    match &args.output {
        Some(path) => fs::write(path, &rendered)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => println!("{}", rendered),
    }

    if let Some(path) = &args.macros {
        let mut export = MacroExport::new();
        for report in &reports {
            export.add_report(report);
        }
        fs::write(path, export.to_latex())
            .with_context(|| format!("Failed to write macros to {}", path.display()))?;
    }

    if !failures.is_empty() {
        anyhow::bail!(
            "{} of {} selections failed",
            failures.len(),
            selections.len()
        );
    }

    Ok(())
}
