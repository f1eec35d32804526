//! Per-function aggregation across iterations
//!
//! Collapses each function's mnemonic breakdown into one (instructions,
//! stalls) pair per iteration. Every series is indexed by the same iteration
//! order so that element-wise statistics line up across functions.

use crate::trace::{IterationTrace, OrderedMap, PerfPair};

/// Per-function time series, one pair per iteration
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSeries {
    iterations: Vec<u64>,
    series: OrderedMap<Vec<PerfPair>>,
}

impl FunctionSeries {
    /// Aggregate reclassified iterations
    ///
    /// Function order is that of the first iteration, followed by functions
    /// first seen later. A function absent from an iteration contributes
    /// `(0, 0)` there.
    pub fn build(iterations: &[IterationTrace]) -> Self {
        let n = iterations.len();
        let mut series: OrderedMap<Vec<PerfPair>> = OrderedMap::new();

        for (idx, iteration) in iterations.iter().enumerate() {
            for (function, instrs) in iteration.functions.iter() {
                let sum = instrs.values().fold(PerfPair::ZERO, |acc, p| acc + *p);
                series.get_or_insert_with(function, || vec![PerfPair::ZERO; n])[idx] = sum;
            }
        }

        Self {
            iterations: iterations.iter().map(|it| it.id).collect(),
            series,
        }
    }

    /// Iteration ids in series order
    pub fn iteration_ids(&self) -> &[u64] {
        &self.iterations
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.series.keys()
    }

    pub fn get(&self, function: &str) -> Option<&[PerfPair]> {
        self.series.get(function).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PerfPair])> {
        self.series.iter().map(|(name, pairs)| (name, pairs.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Sum of instructions plus stalls over every function and iteration
    pub fn grand_total(&self) -> u64 {
        self.series
            .values()
            .flat_map(|pairs| pairs.iter())
            .map(PerfPair::total)
            .fold(0, u64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iteration(id: u64, pairs: &[(&str, &str, u64, u64)]) -> IterationTrace {
        let mut it = IterationTrace::new(id, 0);
        for (function, mnemonic, instr, stall) in pairs {
            *it.functions
                .get_or_default(function)
                .get_or_default(mnemonic) += PerfPair::new(*instr, *stall);
        }
        it.total_cycles = it.attributed_cycles();
        it
    }

    #[test]
    fn test_sums_instructions_per_function() {
        let iterations = vec![iteration(
            1,
            &[("ntt", "bn.mulv", 100, 10), ("ntt", "bn.addm", 20, 2)],
        )];
        let series = FunctionSeries::build(&iterations);
        assert_eq!(series.get("ntt"), Some(&[PerfPair::new(120, 12)][..]));
    }

    #[test]
    fn test_series_aligned_across_iterations() {
        let iterations = vec![
            iteration(5, &[("ntt", "bn.mulv", 100, 10), ("intt", "bn.mulv", 50, 5)]),
            iteration(6, &[("ntt", "bn.mulv", 102, 8), ("intt", "bn.mulv", 52, 4)]),
        ];
        let series = FunctionSeries::build(&iterations);
        assert_eq!(series.iteration_ids(), &[5, 6]);
        assert_eq!(
            series.get("ntt").unwrap(),
            &[PerfPair::new(100, 10), PerfPair::new(102, 8)]
        );
        assert_eq!(
            series.get("intt").unwrap(),
            &[PerfPair::new(50, 5), PerfPair::new(52, 4)]
        );
    }

    #[test]
    fn test_missing_function_contributes_zero() {
        let iterations = vec![
            iteration(1, &[("ntt", "bn.mulv", 100, 10), ("poly_add", "bn.addm", 3, 0)]),
            iteration(2, &[("ntt", "bn.mulv", 100, 10)]),
        ];
        let series = FunctionSeries::build(&iterations);
        assert_eq!(
            series.get("poly_add").unwrap(),
            &[PerfPair::new(3, 0), PerfPair::ZERO]
        );
    }

    #[test]
    fn test_late_function_is_kept_and_zero_filled() {
        let iterations = vec![
            iteration(1, &[("ntt", "bn.mulv", 100, 10)]),
            iteration(2, &[("ntt", "bn.mulv", 100, 10), ("poly_sub", "bn.subm", 4, 1)]),
        ];
        let series = FunctionSeries::build(&iterations);
        let names: Vec<_> = series.function_names().collect();
        assert_eq!(names, vec!["ntt", "poly_sub"]);
        assert_eq!(
            series.get("poly_sub").unwrap(),
            &[PerfPair::ZERO, PerfPair::new(4, 1)]
        );
    }

    #[test]
    fn test_grand_total_matches_iteration_totals() {
        let iterations = vec![
            iteration(1, &[("ntt", "bn.mulv", 100, 10), ("SHAKE", "bn.wsrr", 5, 0)]),
            iteration(2, &[("ntt", "bn.mulv", 90, 10)]),
        ];
        let series = FunctionSeries::build(&iterations);
        let expected: u64 = iterations.iter().map(|it| it.total_cycles).sum();
        assert_eq!(series.grand_total(), expected);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let series = FunctionSeries::build(&[]);
        assert!(series.is_empty());
        assert_eq!(series.grand_total(), 0);
    }
}
