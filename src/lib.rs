//! cyclestat - statistics over cycle-accurate benchmark traces
//!
//! This library loads per-iteration instruction and stall counts recorded by
//! a cycle-accurate simulator, checks that every cycle is attributed, moves
//! shared-engine instructions onto synthetic functions, and reduces the
//! result into per-function, per-category and per-instruction statistics.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod conservation;
pub mod csv_output;
pub mod error;
pub mod evaluation;
pub mod grouping;
pub mod histogram;
pub mod json_output;
pub mod macro_output;
pub mod reclassify;
pub mod report;
pub mod stats;
pub mod store;
pub mod trace;

pub use error::{EvalError, Result};
