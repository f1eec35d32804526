//! Instruction histogram
//!
//! Answers "how many times was instruction X executed in a typical
//! iteration", independent of which function issued it.

use crate::error::Result;
use crate::grouping::sort_by_total_desc;
use crate::stats::Reducer;
use crate::trace::{IterationTrace, OrderedMap};
use serde::Serialize;

/// Median per-iteration count of one mnemonic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstructionCount {
    pub mnemonic: String,
    pub median: f64,
}

/// Mnemonics sorted by descending median count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstructionHistogram {
    entries: Vec<InstructionCount>,
}

impl InstructionHistogram {
    /// Build the histogram over all iterations
    ///
    /// Only instruction counts are used, stalls are ignored. A mnemonic that
    /// does not occur in an iteration counts as zero there, unlike the capture
    /// tooling, which takes the median only over iterations where the mnemonic
    /// occurs. Equal medians keep the order in which mnemonics first appear.
    pub fn build(iterations: &[IterationTrace]) -> Result<Self> {
        let n = iterations.len();
        let mut counts: OrderedMap<Vec<f64>> = OrderedMap::new();

        for (idx, iteration) in iterations.iter().enumerate() {
            for instrs in iteration.functions.values() {
                for (mnemonic, perf) in instrs.iter() {
                    counts.get_or_insert_with(mnemonic, || vec![0.0; n])[idx] +=
                        perf.instructions as f64;
                }
            }
        }

        let mut entries = counts
            .iter()
            .map(|(mnemonic, per_iteration)| {
                Ok(InstructionCount {
                    mnemonic: mnemonic.to_string(),
                    median: Reducer::Median.apply(per_iteration)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        sort_by_total_desc(&mut entries, |e| e.median);

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[InstructionCount] {
        &self.entries
    }

    pub fn get(&self, mnemonic: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.mnemonic == mnemonic)
            .map(|e| e.median)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::PerfPair;

    fn iteration(id: u64, pairs: &[(&str, &str, u64)]) -> IterationTrace {
        let mut it = IterationTrace::new(id, 0);
        for (function, mnemonic, count) in pairs {
            *it.functions
                .get_or_default(function)
                .get_or_default(mnemonic) += PerfPair::new(*count, 99);
        }
        it
    }

    #[test]
    fn test_counts_summed_across_functions() {
        let iterations = vec![iteration(
            1,
            &[("ntt", "bn.mulv", 10), ("intt", "bn.mulv", 6), ("ntt", "bn.addm", 3)],
        )];
        let hist = InstructionHistogram::build(&iterations).unwrap();
        assert_eq!(hist.get("bn.mulv"), Some(16.0));
        assert_eq!(hist.get("bn.addm"), Some(3.0));
    }

    #[test]
    fn test_median_across_iterations() {
        let iterations = vec![
            iteration(1, &[("ntt", "bn.mulv", 10)]),
            iteration(2, &[("ntt", "bn.mulv", 30)]),
            iteration(3, &[("ntt", "bn.mulv", 12)]),
        ];
        let hist = InstructionHistogram::build(&iterations).unwrap();
        assert_eq!(hist.get("bn.mulv"), Some(12.0));
    }

    #[test]
    fn test_absent_mnemonic_counts_zero() {
        let iterations = vec![
            iteration(1, &[("ntt", "bn.mulv", 10), ("ntt", "bn.sid", 4)]),
            iteration(2, &[("ntt", "bn.mulv", 10)]),
            iteration(3, &[("ntt", "bn.mulv", 10)]),
        ];
        let hist = InstructionHistogram::build(&iterations).unwrap();
        assert_eq!(hist.get("bn.sid"), Some(0.0));
    }

    #[test]
    fn test_sorted_descending_with_stable_ties() {
        let iterations = vec![iteration(
            1,
            &[
                ("ntt", "bn.addm", 5),
                ("ntt", "bn.mulv", 50),
                ("ntt", "bn.subm", 5),
                ("ntt", "bn.lid", 20),
            ],
        )];
        let hist = InstructionHistogram::build(&iterations).unwrap();
        let order: Vec<_> = hist.entries().iter().map(|e| e.mnemonic.as_str()).collect();
        assert_eq!(order, vec!["bn.mulv", "bn.lid", "bn.addm", "bn.subm"]);
    }

    #[test]
    fn test_deterministic() {
        let iterations = vec![
            iteration(1, &[("a", "x", 3), ("b", "y", 3), ("c", "z", 7)]),
            iteration(2, &[("a", "x", 5), ("b", "y", 1), ("c", "z", 7)]),
        ];
        let first = InstructionHistogram::build(&iterations).unwrap();
        let second = InstructionHistogram::build(&iterations).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_empty() {
        let hist = InstructionHistogram::build(&[]).unwrap();
        assert!(hist.is_empty());
    }
}
