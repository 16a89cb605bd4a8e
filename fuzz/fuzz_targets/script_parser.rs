//! Fuzz target for the script splitter and statement parser.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_script_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use strata_sql::{Schema, parse_script, split_script};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Errors are fine, panics are not.
        let _ = split_script(input);
        if let Ok(nodes) = parse_script(input) {
            let schema: Schema = nodes.iter().map(|n| &n.statement).collect();
            let _ = schema.equal(&schema);
            for node in &nodes {
                let _ = node.statement.to_string();
            }
        }
    }
});
