// Evaluation configuration
//
// Everything the aggregation pipeline needs besides the reducer and the
// grouping scheme: which function is the whole-program entry, which callee
// names are internal labels, and which mnemonics belong to a shared engine.

use crate::error::{EvalError, Result};
use crate::reclassify::{default_shared_resources, SharedResource, SharedResourceTable};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for trace evaluation
///
/// # Example
/// ```
/// use cyclestat::config::EvalConfig;
///
/// let config = EvalConfig::default();
/// assert_eq!(config.entry_function, "main");
/// assert!(config.validate().is_ok());
/// ```
///
/// # Example TOML
/// ```toml
/// entry_function = "main"
/// internal_prefix = "_"
///
/// [[shared_resource]]
/// mnemonic = "bn.wsrr"
/// function = "SHAKE"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Whole-program entry, never divided by a call count
    #[serde(default = "default_entry_function")]
    pub entry_function: String,

    /// Callees starting with this prefix are assembler labels, not functions
    #[serde(default = "default_internal_prefix")]
    pub internal_prefix: String,

    /// Mnemonics whose cycles belong to a shared hardware engine
    #[serde(default = "default_shared_resources", rename = "shared_resource")]
    pub shared_resources: Vec<SharedResource>,
}

fn default_entry_function() -> String {
    "main".to_string()
}

fn default_internal_prefix() -> String {
    "_".to_string()
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            entry_function: default_entry_function(),
            internal_prefix: default_internal_prefix(),
            shared_resources: default_shared_resources(),
        }
    }
}

impl EvalConfig {
    /// Load configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EvalConfig = toml::from_str(content)
            .map_err(|e| EvalError::Config(format!("invalid config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.entry_function.is_empty() {
            return Err(EvalError::Config(
                "entry_function must not be empty".to_string(),
            ));
        }
        if self.internal_prefix.is_empty() {
            return Err(EvalError::Config(
                "internal_prefix must not be empty (it would exclude every callee)".to_string(),
            ));
        }
        SharedResourceTable::new(&self.shared_resources)?;
        Ok(())
    }

    pub fn shared_resource_table(&self) -> Result<SharedResourceTable> {
        SharedResourceTable::new(&self.shared_resources)
    }

    /// Functions exempt from per-call division: the entry and every synthetic engine
    pub fn exempt_functions(&self) -> Result<Vec<String>> {
        let table = self.shared_resource_table()?;
        let mut exempt = vec![self.entry_function.clone()];
        exempt.extend(table.synthetic_functions().iter().cloned());
        Ok(exempt)
    }
}
