//! Shared-resource reclassification
//!
//! Some mnemonics drive a hardware engine that many functions share (the
//! Keccak/SHAKE core behind the wide special registers on OTBN). Counting
//! those cycles against whichever function issued them hides where the time
//! goes, so they are moved to a synthetic function named after the engine.
//! Cycles are only ever moved: the per-iteration total is unchanged.

use crate::error::{EvalError, Result};
use crate::trace::{IterationTrace, OrderedMap};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One "mnemonic → synthetic function" rule
///
/// # Example TOML
/// ```toml
/// [[shared_resource]]
/// mnemonic = "bn.wsrr"
/// function = "SHAKE"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedResource {
    pub mnemonic: String,
    pub function: String,
}

impl SharedResource {
    pub fn new(mnemonic: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            function: function.into(),
        }
    }
}

/// WSR reads and writes feed the KMAC/SHAKE interface
pub fn default_shared_resources() -> Vec<SharedResource> {
    vec![
        SharedResource::new("bn.wsrr", "SHAKE"),
        SharedResource::new("bn.wsrw", "SHAKE"),
    ]
}

/// Lookup table built from [`SharedResource`] rules
#[derive(Debug, Clone, Default)]
pub struct SharedResourceTable {
    targets: HashMap<String, String>,
    synthetic: Vec<String>,
}

impl SharedResourceTable {
    /// Build the table, rejecting one mnemonic mapped to two functions
    pub fn new(rules: &[SharedResource]) -> Result<Self> {
        let mut table = Self::default();
        for rule in rules {
            if rule.mnemonic.is_empty() || rule.function.is_empty() {
                return Err(EvalError::Config(
                    "shared_resource entries need a mnemonic and a function".to_string(),
                ));
            }
            if let Some(existing) = table.targets.get(&rule.mnemonic) {
                if existing != &rule.function {
                    return Err(EvalError::Config(format!(
                        "mnemonic '{}' reclassified to both '{}' and '{}'",
                        rule.mnemonic, existing, rule.function
                    )));
                }
                continue;
            }
            table
                .targets
                .insert(rule.mnemonic.clone(), rule.function.clone());
            if !table.synthetic.contains(&rule.function) {
                table.synthetic.push(rule.function.clone());
            }
        }
        Ok(table)
    }

    /// Synthetic function receiving `mnemonic`, if any
    pub fn target(&self, mnemonic: &str) -> Option<&str> {
        self.targets.get(mnemonic).map(String::as_str)
    }

    pub fn is_synthetic(&self, function: &str) -> bool {
        self.synthetic.iter().any(|f| f == function)
    }

    /// Names of all synthetic functions, in rule order
    pub fn synthetic_functions(&self) -> &[String] {
        &self.synthetic
    }

    /// Move shared-resource counters of one iteration to their synthetic functions
    ///
    /// Every issuing function stays present, even when all of its
    /// instructions were moved away.
    pub fn reclassify(&self, iteration: &IterationTrace) -> IterationTrace {
        let mut functions = OrderedMap::new();
        for (function, instrs) in iteration.functions.iter() {
            functions.get_or_insert_with(function, OrderedMap::new);
            for (mnemonic, perf) in instrs.iter() {
                let owner = self.target(mnemonic).unwrap_or(function);
                *functions
                    .get_or_insert_with(owner, OrderedMap::new)
                    .get_or_default(mnemonic) += *perf;
            }
        }

        IterationTrace {
            id: iteration.id,
            total_cycles: iteration.total_cycles,
            functions,
        }
    }
}
