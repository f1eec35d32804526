//! Typed trace records for benchmark evaluation
//!
//! Raw capture rows arrive with signed integers; the constructors here are the
//! only way to build records and they reject negative counts, so every value
//! downstream of the store is a valid `u64`.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Add, AddAssign};

/// (instruction-count, stall-count) pair attributed to a function or mnemonic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerfPair {
    /// Number of retired instructions
    pub instructions: u64,
    /// Number of stall cycles
    pub stalls: u64,
}

impl PerfPair {
    pub const ZERO: PerfPair = PerfPair {
        instructions: 0,
        stalls: 0,
    };

    pub fn new(instructions: u64, stalls: u64) -> Self {
        Self {
            instructions,
            stalls,
        }
    }

    /// Cycles consumed: instructions plus stalls
    ///
    /// Counter arithmetic saturates at `u64::MAX`; such a value can never
    /// balance a recorded iteration total and fails conservation instead.
    pub fn total(&self) -> u64 {
        self.instructions.saturating_add(self.stalls)
    }
}

impl Add for PerfPair {
    type Output = PerfPair;

    fn add(self, rhs: PerfPair) -> PerfPair {
        PerfPair {
            instructions: self.instructions.saturating_add(rhs.instructions),
            stalls: self.stalls.saturating_add(rhs.stalls),
        }
    }
}

impl AddAssign for PerfPair {
    fn add_assign(&mut self, rhs: PerfPair) {
        *self = *self + rhs;
    }
}

/// Convert a raw signed counter into `u64`, rejecting negatives
fn non_negative(value: i64, what: &str, context: impl FnOnce() -> String) -> Result<u64> {
    u64::try_from(value).map_err(|_| EvalError::InvalidRecord {
        reason: format!("negative {} ({}) for {}", what, value, context()),
    })
}

/// A logical benchmark operation (e.g. "ntt", "crypto_kem_keypair")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: u64,
    pub operation: String,
}

impl Run {
    pub fn new(id: u64, operation: impl Into<String>) -> Result<Self> {
        let operation = operation.into();
        if operation.is_empty() {
            return Err(EvalError::InvalidRecord {
                reason: format!("benchmark {} has an empty operation name", id),
            });
        }
        Ok(Self { id, operation })
    }
}

/// One timed execution of a benchmarked operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iteration {
    pub id: u64,
    pub run_id: u64,
    /// Cycle count measured independently of the per-instruction trace
    pub total_cycles: u64,
}

impl Iteration {
    pub fn new(id: u64, run_id: u64, total_cycles: i64) -> Result<Self> {
        let total_cycles = non_negative(total_cycles, "cycle count", || {
            format!("iteration {}", id)
        })?;
        Ok(Self {
            id,
            run_id,
            total_cycles,
        })
    }
}

/// Counters for one (iteration, function, mnemonic) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRecord {
    pub iteration: u64,
    pub function: String,
    pub mnemonic: String,
    pub perf: PerfPair,
}

impl InstructionRecord {
    pub fn new(
        iteration: u64,
        function: impl Into<String>,
        mnemonic: impl Into<String>,
        instr_count: i64,
        stall_count: i64,
    ) -> Result<Self> {
        let function = function.into();
        let mnemonic = mnemonic.into();
        let context = || format!("{}/{} in iteration {}", function, mnemonic, iteration);
        let instructions = non_negative(instr_count, "instruction count", context)?;
        let stalls = non_negative(stall_count, "stall count", context)?;

        Ok(Self {
            iteration,
            function,
            mnemonic,
            perf: PerfPair::new(instructions, stalls),
        })
    }
}

/// Number of times `function` was invoked during one iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSample {
    pub iteration: u64,
    pub function: String,
    pub count: u64,
}

impl CallSample {
    pub fn new(iteration: u64, function: impl Into<String>, count: i64) -> Result<Self> {
        let function = function.into();
        let count = non_negative(count, "call count", || {
            format!("{} in iteration {}", function, iteration)
        })?;
        Ok(Self {
            iteration,
            function,
            count,
        })
    }
}

/// Insertion-ordered string-keyed map
///
/// Row order in every report is "first appearance in the trace", so the
/// aggregation structures need a map that remembers insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// Value for `key`, inserting `make()` at the end if absent
    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let i = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.entries.push((key.to_string(), make()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[i].1
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<V: Default> OrderedMap<V> {
    pub fn get_or_default(&mut self, key: &str) -> &mut V {
        self.get_or_insert_with(key, V::default)
    }
}

/// function → mnemonic → counters, for one iteration
pub type FunctionInstructions = OrderedMap<OrderedMap<PerfPair>>;

/// Everything recorded for one iteration of the selection
#[derive(Debug, Clone, PartialEq)]
pub struct IterationTrace {
    pub id: u64,
    pub total_cycles: u64,
    pub functions: FunctionInstructions,
}

impl IterationTrace {
    pub fn new(id: u64, total_cycles: u64) -> Self {
        Self {
            id,
            total_cycles,
            functions: OrderedMap::new(),
        }
    }

    /// Sum of instructions plus stalls over every (function, mnemonic) pair
    pub fn attributed_cycles(&self) -> u64 {
        self.functions
            .values()
            .flat_map(|instrs| instrs.values())
            .map(PerfPair::total)
            .fold(0, u64::saturating_add)
    }
}

/// Immutable view of one selection, as returned by a trace store
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSnapshot {
    /// Operation shared by every selected run
    pub operation: String,
    /// Selected run ids
    pub runs: Vec<u64>,
    /// Iterations in ascending id order
    pub iterations: Vec<IterationTrace>,
    /// function → per-iteration call counts
    pub calls: OrderedMap<Vec<u64>>,
}

impl TraceSnapshot {
    /// Recorded total cycles, one per iteration, in iteration order
    pub fn iteration_cycles(&self) -> Vec<u64> {
        self.iterations.iter().map(|it| it.total_cycles).collect()
    }
}
