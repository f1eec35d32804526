//! Error taxonomy for trace evaluation
//!
//! Every error carries enough context (iteration id, function name, operation)
//! to locate the instrumentation bug that produced it. Nothing here is
//! retryable: trace data is static once read.

use thiserror::Error;

/// Errors raised while loading, validating or aggregating a trace selection
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Selected runs do not share one operation: found {operations:?}")]
    MixedOperation { operations: Vec<String> },

    #[error(
        "Cycle conservation violated for iteration {iteration} ({operation}): \
         recorded {expected} cycles, attributed {attributed}"
    )]
    Conservation {
        iteration: u64,
        operation: String,
        expected: u64,
        attributed: u64,
    },

    #[error("Function '{function}' has no category in grouping scheme '{scheme}'")]
    UnknownCategory { function: String, scheme: String },

    #[error("Cannot normalize '{function}' per call: representative call count is zero")]
    DivisionByZero { function: String },

    #[error("No iterations matched selection {selection:?}")]
    EmptySelection { selection: Vec<u64> },

    #[error("Unknown grouping scheme '{scheme}'")]
    UnknownScheme { scheme: String },

    #[error("Invalid trace record: {reason}")]
    InvalidRecord { reason: String },

    #[error("Insufficient samples: need at least {required}, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Trace store error: {0}")]
    Store(String),

    #[error("Evaluation worker panicked: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;
