#![no_main]

use cyclestat::config::EvalConfig;
use cyclestat::evaluation::Evaluation;
use cyclestat::store::{JsonTraceStore, Selection};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed dumps must be rejected with an error, never a panic
        if let Ok(store) = JsonTraceStore::from_json_str(input) {
            let _ = Evaluation::load(&store, &Selection::single(1), &EvalConfig::default());
        }
    }
});
