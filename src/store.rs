//! Trace store adapters
//!
//! The evaluation engine only sees traces through [`TraceStore`]: given a
//! selection of benchmark runs it returns one immutable [`TraceSnapshot`].
//! [`JsonTraceStore`] reads a JSON dump laid out like the capture database
//! (one array per table); [`MemoryTraceStore`] is built in code.

use crate::error::{EvalError, Result};
use crate::trace::{
    CallSample, InstructionRecord, Iteration, IterationTrace, OrderedMap, Run, TraceSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// Benchmark runs to evaluate together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    runs: Vec<u64>,
}

impl Selection {
    pub fn new(runs: Vec<u64>) -> Result<Self> {
        if runs.is_empty() {
            return Err(EvalError::EmptySelection { selection: runs });
        }
        Ok(Self { runs })
    }

    pub fn single(run: u64) -> Self {
        Self { runs: vec![run] }
    }

    pub fn runs(&self) -> &[u64] {
        &self.runs
    }
}

/// Read contract consumed by the evaluation pipeline
pub trait TraceStore {
    /// Load every iteration owned by the selected runs
    ///
    /// Call counts of functions whose name starts with `internal_prefix` are
    /// not collected.
    ///
    /// # Errors
    /// `MixedOperation` if the runs disagree on their operation name,
    /// `EmptySelection` if no iteration belongs to the selected runs.
    fn load(&self, selection: &Selection, internal_prefix: &str) -> Result<TraceSnapshot>;
}

/// In-memory trace store with validated records
#[derive(Debug, Default, Clone)]
pub struct MemoryTraceStore {
    runs: BTreeMap<u64, Run>,
    iterations: BTreeMap<u64, Iteration>,
    records: Vec<InstructionRecord>,
    record_keys: HashSet<(u64, String, String)>,
    calls: Vec<CallSample>,
}

impl MemoryTraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_run(&mut self, id: u64, operation: &str) -> Result<()> {
        if self.runs.contains_key(&id) {
            return Err(EvalError::InvalidRecord {
                reason: format!("duplicate benchmark id {}", id),
            });
        }
        self.runs.insert(id, Run::new(id, operation)?);
        Ok(())
    }

    pub fn add_iteration(&mut self, id: u64, run_id: u64, total_cycles: i64) -> Result<()> {
        if !self.runs.contains_key(&run_id) {
            return Err(EvalError::InvalidRecord {
                reason: format!("iteration {} belongs to unknown benchmark {}", id, run_id),
            });
        }
        if self.iterations.contains_key(&id) {
            return Err(EvalError::InvalidRecord {
                reason: format!("duplicate iteration id {}", id),
            });
        }
        self.iterations
            .insert(id, Iteration::new(id, run_id, total_cycles)?);
        Ok(())
    }

    pub fn add_instruction(
        &mut self,
        iteration: u64,
        function: &str,
        mnemonic: &str,
        instr_count: i64,
        stall_count: i64,
    ) -> Result<()> {
        self.require_iteration(iteration)?;
        let record = InstructionRecord::new(iteration, function, mnemonic, instr_count, stall_count)?;
        let key = (iteration, record.function.clone(), record.mnemonic.clone());
        if !self.record_keys.insert(key) {
            return Err(EvalError::InvalidRecord {
                reason: format!(
                    "duplicate record {}/{} in iteration {}",
                    function, mnemonic, iteration
                ),
            });
        }
        self.records.push(record);
        Ok(())
    }

    pub fn add_calls(&mut self, iteration: u64, function: &str, count: i64) -> Result<()> {
        self.require_iteration(iteration)?;
        self.calls.push(CallSample::new(iteration, function, count)?);
        Ok(())
    }

    fn require_iteration(&self, iteration: u64) -> Result<()> {
        if self.iterations.contains_key(&iteration) {
            Ok(())
        } else {
            Err(EvalError::InvalidRecord {
                reason: format!("record refers to unknown iteration {}", iteration),
            })
        }
    }
}

impl TraceStore for MemoryTraceStore {
    fn load(&self, selection: &Selection, internal_prefix: &str) -> Result<TraceSnapshot> {
        let mut runs = Vec::new();
        for id in selection.runs() {
            match self.runs.get(id) {
                Some(run) => runs.push(run),
                None => warn!(benchmark = id, "selected benchmark not present in trace"),
            }
        }

        let mut operations: Vec<String> = runs.iter().map(|r| r.operation.clone()).collect();
        operations.sort();
        operations.dedup();
        if operations.len() > 1 {
            return Err(EvalError::MixedOperation { operations });
        }

        let run_ids: HashSet<u64> = runs.iter().map(|r| r.id).collect();
        let mut iterations: Vec<IterationTrace> = self
            .iterations
            .values()
            .filter(|it| run_ids.contains(&it.run_id))
            .map(|it| IterationTrace::new(it.id, it.total_cycles))
            .collect();

        let operation = match (operations.pop(), iterations.is_empty()) {
            (Some(operation), false) => operation,
            _ => {
                return Err(EvalError::EmptySelection {
                    selection: selection.runs().to_vec(),
                })
            }
        };

        let position: HashMap<u64, usize> = iterations
            .iter()
            .enumerate()
            .map(|(i, it)| (it.id, i))
            .collect();

        for record in &self.records {
            if let Some(&i) = position.get(&record.iteration) {
                *iterations[i]
                    .functions
                    .get_or_default(&record.function)
                    .get_or_default(&record.mnemonic) += record.perf;
            }
        }

        let mut samples: Vec<(usize, &CallSample)> = self
            .calls
            .iter()
            .filter(|s| !s.function.starts_with(internal_prefix))
            .filter_map(|s| position.get(&s.iteration).map(|&i| (i, s)))
            .collect();
        samples.sort_by_key(|(i, _)| *i);

        let mut calls: OrderedMap<Vec<u64>> = OrderedMap::new();
        for (_, sample) in samples {
            calls.get_or_default(&sample.function).push(sample.count);
        }

        debug!(
            operation = %operation,
            iterations = iterations.len(),
            functions_with_calls = calls.len(),
            "loaded trace selection"
        );

        Ok(TraceSnapshot {
            operation,
            runs: selection.runs().to_vec(),
            iterations,
            calls,
        })
    }
}

/// `benchmark` table row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub id: u64,
    pub operation: String,
}

/// `benchmark_iteration` table row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRow {
    pub id: u64,
    pub benchmark_id: u64,
}

/// `cycles` table row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyclesRow {
    pub benchmark_iteration_id: u64,
    pub cycles: i64,
}

/// `func_instrs` table row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncInstrRow {
    pub benchmark_iteration_id: u64,
    pub func_name: String,
    pub instr_name: String,
    pub instr_count: i64,
    pub stall_count: i64,
}

/// `func_calls` table row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncCallRow {
    pub benchmark_iteration_id: u64,
    pub callee_func_name: String,
    pub call_count: i64,
}

/// Raw JSON trace dump, one array per capture table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceDump {
    #[serde(default)]
    pub benchmark: Vec<BenchmarkRow>,
    #[serde(default)]
    pub benchmark_iteration: Vec<IterationRow>,
    #[serde(default)]
    pub cycles: Vec<CyclesRow>,
    #[serde(default)]
    pub func_instrs: Vec<FuncInstrRow>,
    #[serde(default)]
    pub func_calls: Vec<FuncCallRow>,
}

impl TraceDump {
    /// Validate every row and build an in-memory store
    ///
    /// # Errors
    /// `InvalidRecord` for negative counters, duplicate keys, dangling
    /// references, or an iteration without a recorded cycle count.
    pub fn into_store(self) -> Result<MemoryTraceStore> {
        let mut store = MemoryTraceStore::new();
        for row in &self.benchmark {
            store.add_run(row.id, &row.operation)?;
        }

        let mut cycles: HashMap<u64, i64> = HashMap::new();
        for row in &self.cycles {
            if cycles.insert(row.benchmark_iteration_id, row.cycles).is_some() {
                return Err(EvalError::InvalidRecord {
                    reason: format!(
                        "duplicate cycle count for iteration {}",
                        row.benchmark_iteration_id
                    ),
                });
            }
        }

        for row in &self.benchmark_iteration {
            let total = cycles.remove(&row.id).ok_or_else(|| EvalError::InvalidRecord {
                reason: format!("iteration {} has no recorded cycle count", row.id),
            })?;
            store.add_iteration(row.id, row.benchmark_id, total)?;
        }
        if let Some(orphan) = cycles.keys().min() {
            return Err(EvalError::InvalidRecord {
                reason: format!("cycle count recorded for unknown iteration {}", orphan),
            });
        }

        for row in &self.func_instrs {
            store.add_instruction(
                row.benchmark_iteration_id,
                &row.func_name,
                &row.instr_name,
                row.instr_count,
                row.stall_count,
            )?;
        }
        for row in &self.func_calls {
            store.add_calls(
                row.benchmark_iteration_id,
                &row.callee_func_name,
                row.call_count,
            )?;
        }

        Ok(store)
    }
}

/// Trace store backed by a JSON dump file
#[derive(Debug, Clone)]
pub struct JsonTraceStore {
    inner: MemoryTraceStore,
}

impl JsonTraceStore {
    /// Parse and validate a JSON trace dump
    pub fn from_json_str(json: &str) -> Result<Self> {
        let dump: TraceDump = serde_json::from_str(json)
            .map_err(|e| EvalError::Store(format!("malformed trace dump: {}", e)))?;
        Ok(Self {
            inner: dump.into_store()?,
        })
    }

    /// Read a JSON trace dump from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EvalError::Store(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }
}

impl TraceStore for JsonTraceStore {
    fn load(&self, selection: &Selection, internal_prefix: &str) -> Result<TraceSnapshot> {
        self.inner.load(selection, internal_prefix)
    }
}
