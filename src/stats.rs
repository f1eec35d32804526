//! Statistics engine for per-function and whole-run cycle figures
//!
//! Reducers are applied independently to the instruction sequence and the
//! stall sequence of a function. The reducer is always an explicit argument;
//! there is no process-wide default.

use crate::aggregate::FunctionSeries;
use crate::error::{EvalError, Result};
use crate::trace::{OrderedMap, PerfPair};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Aggregate statistic applied across iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    /// Arithmetic mean
    Mean,
    /// Middle value (average of the two middle values for even counts)
    Median,
    /// Sample standard deviation (n - 1 denominator)
    Stdev,
}

impl Reducer {
    pub const ALL: [Reducer; 3] = [Reducer::Mean, Reducer::Median, Reducer::Stdev];

    pub fn name(self) -> &'static str {
        match self {
            Reducer::Mean => "mean",
            Reducer::Median => "median",
            Reducer::Stdev => "stdev",
        }
    }

    /// Reduce `samples` to one value
    ///
    /// # Errors
    /// `InsufficientSamples` for an empty input, or fewer than two samples
    /// with [`Reducer::Stdev`].
    pub fn apply(self, samples: &[f64]) -> Result<f64> {
        let required = match self {
            Reducer::Mean | Reducer::Median => 1,
            Reducer::Stdev => 2,
        };
        if samples.len() < required {
            return Err(EvalError::InsufficientSamples {
                required,
                actual: samples.len(),
            });
        }

        Ok(match self {
            Reducer::Mean => mean(samples),
            Reducer::Median => median(samples),
            Reducer::Stdev => {
                let m = mean(samples);
                let ss: f64 = samples.iter().map(|x| (x - m) * (x - m)).sum();
                (ss / (samples.len() - 1) as f64).sqrt()
            }
        })
    }

    /// Reduce integer counters
    pub fn apply_counts(self, samples: &[u64]) -> Result<f64> {
        let values: Vec<f64> = samples.iter().map(|&v| v as f64).collect();
        self.apply(&values)
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn median(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Presentation rounding used everywhere a statistic is shown as an integer
///
/// Ties go to the even neighbour (2.5 → 2, 3.5 → 4); negative values clamp
/// to zero since every reported quantity is a count.
pub fn round_count(value: f64) -> u64 {
    value.round_ties_even().max(0.0) as u64
}

/// How per-function statistics are normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// Contribution summed over the whole run
    Accumulated,
    /// Contribution divided by a representative call count
    PerCall,
}

/// Reduced (instructions, stalls) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReducedPair {
    pub instructions: f64,
    pub stalls: f64,
}

impl ReducedPair {
    pub fn total(&self) -> f64 {
        self.instructions + self.stalls
    }
}

impl std::ops::AddAssign for ReducedPair {
    fn add_assign(&mut self, rhs: ReducedPair) {
        self.instructions += rhs.instructions;
        self.stalls += rhs.stalls;
    }
}

/// Reduced statistic of one function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionStat {
    pub function: String,
    pub stat: ReducedPair,
}

/// Reduce a pair series, dividing every sample by `divisor` first
pub fn reduce_pairs(pairs: &[PerfPair], reducer: Reducer, divisor: f64) -> Result<ReducedPair> {
    let instructions: Vec<f64> = pairs
        .iter()
        .map(|p| p.instructions as f64 / divisor)
        .collect();
    let stalls: Vec<f64> = pairs.iter().map(|p| p.stalls as f64 / divisor).collect();
    Ok(ReducedPair {
        instructions: reducer.apply(&instructions)?,
        stalls: reducer.apply(&stalls)?,
    })
}

/// Whole-run statistic over per-iteration cycle totals
pub fn cycle_statistic(totals: &[u64], reducer: Reducer) -> Result<f64> {
    reducer.apply_counts(totals)
}

/// Per-function statistics over an aggregated series
#[derive(Debug)]
pub struct StatisticsEngine<'a> {
    series: &'a FunctionSeries,
    calls: &'a OrderedMap<Vec<u64>>,
    /// Functions treated as called exactly once per iteration
    exempt: HashSet<String>,
}

impl<'a> StatisticsEngine<'a> {
    pub fn new<I, S>(series: &'a FunctionSeries, calls: &'a OrderedMap<Vec<u64>>, exempt: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            series,
            calls,
            exempt: exempt.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_exempt(&self, function: &str) -> bool {
        self.exempt.contains(function)
    }

    /// Call-count samples recorded for `function`
    pub fn call_samples(&self, function: &str) -> Option<&[u64]> {
        self.calls.get(function).map(Vec::as_slice)
    }

    /// Representative call count: `reducer` over the call samples
    ///
    /// Exempt functions always count as one call.
    ///
    /// # Errors
    /// `DivisionByZero` if the function has no call samples or the reduced
    /// count is zero.
    pub fn representative_calls(&self, function: &str, reducer: Reducer) -> Result<f64> {
        if self.is_exempt(function) {
            return Ok(1.0);
        }
        let samples = match self.call_samples(function) {
            Some(samples) if !samples.is_empty() => samples,
            _ => {
                return Err(EvalError::DivisionByZero {
                    function: function.to_string(),
                })
            }
        };
        let calls = reducer.apply_counts(samples)?;
        if calls == 0.0 {
            return Err(EvalError::DivisionByZero {
                function: function.to_string(),
            });
        }
        Ok(calls)
    }

    /// Statistic for a single function
    pub fn function_stat(
        &self,
        function: &str,
        reducer: Reducer,
        normalization: Normalization,
    ) -> Result<Option<ReducedPair>> {
        let Some(pairs) = self.series.get(function) else {
            return Ok(None);
        };
        let divisor = match normalization {
            Normalization::Accumulated => 1.0,
            Normalization::PerCall => self.representative_calls(function, reducer)?,
        };
        reduce_pairs(pairs, reducer, divisor).map(Some)
    }

    /// Statistic for every function, in series order
    pub fn per_function(
        &self,
        reducer: Reducer,
        normalization: Normalization,
    ) -> Result<Vec<FunctionStat>> {
        self.series
            .iter()
            .map(|(function, pairs)| {
                let divisor = match normalization {
                    Normalization::Accumulated => 1.0,
                    Normalization::PerCall => self.representative_calls(function, reducer)?,
                };
                Ok(FunctionStat {
                    function: function.to_string(),
                    stat: reduce_pairs(pairs, reducer, divisor)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::IterationTrace;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn series_of(rows: &[(&str, &[(u64, u64)])]) -> FunctionSeries {
        let n = rows.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
        let iterations: Vec<IterationTrace> = (0..n)
            .map(|i| {
                let mut it = IterationTrace::new(i as u64 + 1, 0);
                for (function, samples) in rows {
                    let (instr, stall) = samples[i];
                    *it.functions
                        .get_or_default(function)
                        .get_or_default("bn.add") += PerfPair::new(instr, stall);
                }
                it
            })
            .collect();
        FunctionSeries::build(&iterations)
    }

    fn calls_of(rows: &[(&str, &[u64])]) -> OrderedMap<Vec<u64>> {
        let mut calls = OrderedMap::new();
        for (function, samples) in rows {
            *calls.get_or_default(function) = samples.to_vec();
        }
        calls
    }

    #[test]
    fn test_mean() {
        assert!(approx(Reducer::Mean.apply(&[1.0, 2.0, 6.0]).unwrap(), 3.0));
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(Reducer::Median.apply(&[9.0, 1.0, 5.0]).unwrap(), 5.0);
        assert_eq!(Reducer::Median.apply(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_sample_stdev() {
        // mean 5, squared deviations 9+1+1+9 = 20, / (n-1) = 20/3
        let sd = Reducer::Stdev.apply(&[2.0, 4.0, 6.0, 8.0]).unwrap();
        assert!(approx(sd, (20.0_f64 / 3.0).sqrt()));
    }

    #[test]
    fn test_stdev_needs_two_samples() {
        assert_eq!(
            Reducer::Stdev.apply(&[3.0]),
            Err(EvalError::InsufficientSamples {
                required: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_empty_samples_rejected() {
        for reducer in [Reducer::Mean, Reducer::Median] {
            assert_eq!(
                reducer.apply(&[]).unwrap_err(),
                EvalError::InsufficientSamples {
                    required: 1,
                    actual: 0
                }
            );
        }
    }

    #[test]
    fn test_round_count_ties_to_even() {
        assert_eq!(round_count(2.5), 2);
        assert_eq!(round_count(3.5), 4);
        assert_eq!(round_count(12.857), 13);
        assert_eq!(round_count(-0.4), 0);
    }

    #[test]
    fn test_reducer_display_and_names() {
        assert_eq!(Reducer::Stdev.to_string(), "stdev");
        let names: Vec<_> = Reducer::ALL.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["mean", "median", "stdev"]);
    }

    #[test]
    fn test_accumulated_mean_of_pairs() {
        let series = series_of(&[("ntt", &[(100, 10), (110, 20)])]);
        let calls = calls_of(&[]);
        let engine = StatisticsEngine::new(&series, &calls, ["main"]);
        let stats = engine
            .per_function(Reducer::Mean, Normalization::Accumulated)
            .unwrap();
        assert_eq!(stats.len(), 1);
        assert!(approx(stats[0].stat.instructions, 105.0));
        assert!(approx(stats[0].stat.stalls, 15.0));
    }

    #[test]
    fn test_per_call_uses_reduced_call_count() {
        // calls [2, 2, 3] → mean 7/3; accumulated instructions mean 30
        let series = series_of(&[("foo", &[(20, 0), (30, 0), (40, 0)])]);
        let calls = calls_of(&[("foo", &[2, 2, 3])]);
        let engine = StatisticsEngine::new(&series, &calls, ["main"]);

        let per_call = engine
            .function_stat("foo", Reducer::Mean, Normalization::PerCall)
            .unwrap()
            .unwrap();
        assert!(approx(per_call.instructions, 30.0 / (7.0 / 3.0)));
        assert_eq!(round_count(per_call.instructions), 13);
    }

    #[test]
    fn test_per_call_matches_accumulated_divided() {
        let series = series_of(&[("foo", &[(20, 4), (31, 6), (47, 9), (12, 1)])]);
        let calls = calls_of(&[("foo", &[2, 3, 3, 5])]);
        let engine = StatisticsEngine::new(&series, &calls, Vec::<String>::new());

        for reducer in Reducer::ALL {
            let acc = engine
                .function_stat("foo", reducer, Normalization::Accumulated)
                .unwrap()
                .unwrap();
            let per_call = engine
                .function_stat("foo", reducer, Normalization::PerCall)
                .unwrap()
                .unwrap();
            let div = engine.representative_calls("foo", reducer).unwrap();
            assert!(approx(acc.instructions / div, per_call.instructions));
            assert!(approx(acc.stalls / div, per_call.stalls));
        }
    }

    #[test]
    fn test_exempt_functions_not_divided() {
        let series = series_of(&[("main", &[(500, 50)]), ("SHAKE", &[(40, 0)])]);
        let calls = calls_of(&[]);
        let engine = StatisticsEngine::new(&series, &calls, ["main", "SHAKE"]);
        let stats = engine
            .per_function(Reducer::Median, Normalization::PerCall)
            .unwrap();
        assert!(approx(stats[0].stat.instructions, 500.0));
        assert!(approx(stats[1].stat.instructions, 40.0));
    }

    #[test]
    fn test_missing_call_data_is_division_by_zero() {
        let series = series_of(&[("foo", &[(20, 0)])]);
        let calls = calls_of(&[]);
        let engine = StatisticsEngine::new(&series, &calls, ["main"]);
        assert_eq!(
            engine.per_function(Reducer::Mean, Normalization::PerCall),
            Err(EvalError::DivisionByZero {
                function: "foo".to_string()
            })
        );
    }

    #[test]
    fn test_zero_calls_is_division_by_zero() {
        let series = series_of(&[("foo", &[(20, 0), (20, 0)])]);
        let calls = calls_of(&[("foo", &[0, 0])]);
        let engine = StatisticsEngine::new(&series, &calls, ["main"]);
        assert!(matches!(
            engine.representative_calls("foo", Reducer::Median),
            Err(EvalError::DivisionByZero { .. })
        ));
        // accumulated mode never divides
        assert!(engine
            .per_function(Reducer::Median, Normalization::Accumulated)
            .is_ok());
    }

    #[test]
    fn test_unknown_function_stat_is_none() {
        let series = series_of(&[("foo", &[(20, 0)])]);
        let calls = calls_of(&[]);
        let engine = StatisticsEngine::new(&series, &calls, ["main"]);
        assert_eq!(
            engine
                .function_stat("bar", Reducer::Mean, Normalization::Accumulated)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_cycle_statistic() {
        let totals = [100, 110, 120];
        assert!(approx(cycle_statistic(&totals, Reducer::Mean).unwrap(), 110.0));
        assert!(approx(cycle_statistic(&totals, Reducer::Median).unwrap(), 110.0));
        assert!(approx(cycle_statistic(&totals, Reducer::Stdev).unwrap(), 10.0));
    }
}
