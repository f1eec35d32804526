//! Evaluation pipeline for one selection of benchmark runs
//!
//! ```text
//! TraceStore::load → reclassify → conservation gate → FunctionSeries
//!                                                   ↘ InstructionHistogram
//! FunctionSeries → StatisticsEngine → GroupBreakdown → EvaluationReport
//! ```
//!
//! An [`Evaluation`] is immutable once loaded. A conservation failure stops
//! the selection before any statistic is computed.

use crate::aggregate::FunctionSeries;
use crate::config::EvalConfig;
use crate::conservation;
use crate::error::{EvalError, Result};
use crate::grouping::{sort_by_total_desc, CategoryMap, GroupBreakdown};
use crate::histogram::InstructionHistogram;
use crate::report::{CategoryRow, CycleSummary, EvaluationReport, FunctionRow, HistogramRow};
use crate::stats::{
    cycle_statistic, round_count, FunctionStat, Normalization, ReducedPair, Reducer,
    StatisticsEngine,
};
use crate::store::{Selection, TraceStore};
use crate::trace::{IterationTrace, OrderedMap};
use tracing::{debug, info, warn};

/// Validated, reclassified and aggregated trace of one selection
#[derive(Debug, Clone)]
pub struct Evaluation {
    operation: String,
    runs: Vec<u64>,
    iterations: Vec<IterationTrace>,
    calls: OrderedMap<Vec<u64>>,
    series: FunctionSeries,
    histogram: InstructionHistogram,
    exempt: Vec<String>,
}

impl Evaluation {
    /// Load, reclassify, validate and aggregate one selection
    ///
    /// # Errors
    /// Any store error, `Conservation` for the first unbalanced iteration,
    /// or `Config` for an invalid configuration.
    pub fn load(store: &dyn TraceStore, selection: &Selection, config: &EvalConfig) -> Result<Self> {
        config.validate()?;
        let table = config.shared_resource_table()?;
        let snapshot = store.load(selection, &config.internal_prefix)?;

        let iterations: Vec<IterationTrace> = snapshot
            .iterations
            .iter()
            .map(|it| table.reclassify(it))
            .collect();
        conservation::validate(&iterations, &snapshot.operation)?;

        let series = FunctionSeries::build(&iterations);
        let histogram = InstructionHistogram::build(&iterations)?;

        info!(
            operation = %snapshot.operation,
            runs = ?snapshot.runs,
            iterations = iterations.len(),
            functions = series.len(),
            "evaluation loaded"
        );

        Ok(Self {
            operation: snapshot.operation,
            runs: snapshot.runs,
            iterations,
            calls: snapshot.calls,
            series,
            histogram,
            exempt: config.exempt_functions()?,
        })
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn runs(&self) -> &[u64] {
        &self.runs
    }

    /// Reclassified iterations in ascending id order
    pub fn iterations(&self) -> &[IterationTrace] {
        &self.iterations
    }

    pub fn series(&self) -> &FunctionSeries {
        &self.series
    }

    pub fn calls(&self) -> &OrderedMap<Vec<u64>> {
        &self.calls
    }

    pub fn histogram(&self) -> &InstructionHistogram {
        &self.histogram
    }

    pub fn engine(&self) -> StatisticsEngine<'_> {
        StatisticsEngine::new(&self.series, &self.calls, self.exempt.iter().cloned())
    }

    /// Whole-run statistic over recorded iteration totals
    pub fn cycles(&self, reducer: Reducer) -> Result<f64> {
        let totals: Vec<u64> = self.iterations.iter().map(|it| it.total_cycles).collect();
        cycle_statistic(&totals, reducer)
    }

    /// Per-function statistics in series order
    pub fn per_function(
        &self,
        reducer: Reducer,
        normalization: Normalization,
    ) -> Result<Vec<FunctionStat>> {
        self.engine().per_function(reducer, normalization)
    }

    /// Build the full report for `reducer`, grouped with `categories`
    pub fn report(&self, reducer: Reducer, categories: &CategoryMap) -> Result<EvaluationReport> {
        let engine = self.engine();
        // category rows are summed from the rounded function rows
        let mut stats: Vec<FunctionStat> = engine
            .per_function(reducer, Normalization::Accumulated)?
            .into_iter()
            .map(|s| FunctionStat {
                function: s.function,
                stat: ReducedPair {
                    instructions: round_count(s.stat.instructions) as f64,
                    stalls: round_count(s.stat.stalls) as f64,
                },
            })
            .collect();
        sort_by_total_desc(&mut stats, |s| s.stat.total());

        let breakdown = GroupBreakdown::build(&stats, categories)?;

        let functions = stats
            .iter()
            .map(|s| self.function_row(&engine, s, reducer, categories))
            .collect::<Result<Vec<_>>>()?;

        let categories_rows = breakdown
            .categories()
            .iter()
            .map(|c| {
                let instructions = round_count(c.stat.instructions);
                let stalls = round_count(c.stat.stalls);
                CategoryRow {
                    category: c.category.clone(),
                    instructions,
                    stalls,
                    total: instructions + stalls,
                    percentage: breakdown.percentage_of(&c.category).unwrap_or(0),
                }
            })
            .collect();

        let histogram = self
            .histogram
            .entries()
            .iter()
            .map(|e| HistogramRow {
                mnemonic: e.mnemonic.clone(),
                count: round_count(e.median),
            })
            .collect();

        let stdev = match self.cycles(Reducer::Stdev) {
            Ok(value) => Some(round_count(value)),
            Err(EvalError::InsufficientSamples { .. }) => None,
            Err(e) => return Err(e),
        };

        debug!(operation = %self.operation, %reducer, "report built");

        Ok(EvaluationReport {
            operation: self.operation.clone(),
            runs: self.runs.clone(),
            reducer,
            scheme: categories.scheme().to_string(),
            iterations: self.iterations.len(),
            cycles: CycleSummary {
                mean: round_count(self.cycles(Reducer::Mean)?),
                median: round_count(self.cycles(Reducer::Median)?),
                stdev,
            },
            percentages: breakdown.percentages(),
            categories: categories_rows,
            functions,
            histogram,
        })
    }

    fn function_row(
        &self,
        engine: &StatisticsEngine<'_>,
        stat: &FunctionStat,
        reducer: Reducer,
        categories: &CategoryMap,
    ) -> Result<FunctionRow> {
        let instructions = round_count(stat.stat.instructions);
        let stalls = round_count(stat.stat.stalls);
        let total = instructions + stalls;

        let calls = match engine.representative_calls(&stat.function, reducer) {
            Ok(calls) => Some(round_count(calls)),
            Err(EvalError::DivisionByZero { .. }) | Err(EvalError::InsufficientSamples { .. }) => {
                warn!(
                    operation = %self.operation,
                    function = %stat.function,
                    "no usable call count, per-call value omitted"
                );
                None
            }
            Err(e) => return Err(e),
        };
        let per_call = calls
            .filter(|&c| c > 0)
            .map(|c| round_count(total as f64 / c as f64));

        Ok(FunctionRow {
            function: stat.function.clone(),
            category: categories.category_of(&stat.function)?.to_string(),
            calls,
            instructions,
            stalls,
            total,
            per_call,
        })
    }
}

/// Load and report one selection
pub fn evaluate(
    store: &dyn TraceStore,
    selection: &Selection,
    reducer: Reducer,
    categories: &CategoryMap,
    config: &EvalConfig,
) -> Result<EvaluationReport> {
    Evaluation::load(store, selection, config)?.report(reducer, categories)
}

/// Evaluate independent selections on up to `jobs` worker threads
///
/// Results keep the order of `selections`; one failing selection does not
/// affect the others.
///
/// # Errors
/// `Worker` if a worker thread panicked.
pub fn evaluate_many(
    store: &(dyn TraceStore + Sync),
    selections: &[Selection],
    reducer: Reducer,
    categories: &CategoryMap,
    config: &EvalConfig,
    jobs: usize,
) -> Result<Vec<Result<EvaluationReport>>> {
    if selections.is_empty() {
        return Ok(Vec::new());
    }
    let jobs = jobs.clamp(1, selections.len());
    debug!(selections = selections.len(), jobs, "evaluating selections");

    let collected = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = (0..jobs)
            .map(|worker| {
                scope.spawn(move |_| {
                    selections
                        .iter()
                        .enumerate()
                        .skip(worker)
                        .step_by(jobs)
                        .map(|(idx, selection)| {
                            (idx, evaluate(store, selection, reducer, categories, config))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    })
    .map_err(|_| EvalError::Worker("evaluation scope panicked".to_string()))?;

    let mut slots: Vec<Option<Result<EvaluationReport>>> =
        (0..selections.len()).map(|_| None).collect();
    for joined in collected {
        let results = joined.map_err(|_| EvalError::Worker("worker thread panicked".to_string()))?;
        for (idx, result) in results {
            slots[idx] = Some(result);
        }
    }

    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| EvalError::Worker("selection left unevaluated".to_string())))
        .collect()
}
