//! Cycle conservation check
//!
//! The cycle counter and the per-instruction trace are captured independently.
//! For a sound trace, instructions plus stalls over every (function, mnemonic)
//! pair add up to the measured cycle count of the iteration, exactly.

use crate::error::{EvalError, Result};
use crate::trace::IterationTrace;
use tracing::{debug, error};

/// Check one iteration
pub fn check_iteration(iteration: &IterationTrace, operation: &str) -> Result<()> {
    let attributed = iteration.attributed_cycles();
    if attributed != iteration.total_cycles {
        error!(
            iteration = iteration.id,
            operation,
            expected = iteration.total_cycles,
            attributed,
            "cycle conservation violated"
        );
        return Err(EvalError::Conservation {
            iteration: iteration.id,
            operation: operation.to_string(),
            expected: iteration.total_cycles,
            attributed,
        });
    }
    Ok(())
}

/// Check every iteration, stopping at the first violation
pub fn validate(iterations: &[IterationTrace], operation: &str) -> Result<()> {
    for iteration in iterations {
        check_iteration(iteration, operation)?;
    }
    debug!(
        operation,
        iterations = iterations.len(),
        "cycle conservation holds"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::PerfPair;

    fn iteration(id: u64, total: u64, pairs: &[(&str, &str, u64, u64)]) -> IterationTrace {
        let mut it = IterationTrace::new(id, total);
        for (function, mnemonic, instr, stall) in pairs {
            *it.functions
                .get_or_default(function)
                .get_or_default(mnemonic) += PerfPair::new(*instr, *stall);
        }
        it
    }

    #[test]
    fn test_balanced_iteration_passes() {
        let it = iteration(1, 115, &[("ntt", "bn.mulv", 100, 10), ("SHAKE", "bn.wsrr", 5, 0)]);
        assert!(check_iteration(&it, "ntt").is_ok());
    }

    #[test]
    fn test_missing_cycles_fail() {
        let it = iteration(7, 120, &[("ntt", "bn.mulv", 100, 10)]);
        let err = check_iteration(&it, "ntt").unwrap_err();
        assert_eq!(
            err,
            EvalError::Conservation {
                iteration: 7,
                operation: "ntt".to_string(),
                expected: 120,
                attributed: 110,
            }
        );
    }

    #[test]
    fn test_extra_cycles_fail() {
        let it = iteration(2, 100, &[("ntt", "bn.mulv", 100, 10)]);
        assert!(check_iteration(&it, "ntt").is_err());
    }

    #[test]
    fn test_empty_iteration_with_zero_total_passes() {
        let it = IterationTrace::new(3, 0);
        assert!(check_iteration(&it, "noop").is_ok());
    }

    #[test]
    fn test_validate_reports_first_offender() {
        let iterations = vec![
            iteration(1, 110, &[("ntt", "bn.mulv", 100, 10)]),
            iteration(2, 999, &[("ntt", "bn.mulv", 100, 10)]),
            iteration(3, 0, &[("ntt", "bn.mulv", 100, 10)]),
        ];
        match validate(&iterations, "ntt") {
            Err(EvalError::Conservation { iteration, .. }) => assert_eq!(iteration, 2),
            other => panic!("expected conservation error, got {:?}", other),
        }
    }
}
