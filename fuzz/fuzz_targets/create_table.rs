//! Fuzz target checking that rendered CREATE TABLE statements parse back.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_create_table
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use strata_sql::parse_create_table;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(create) = parse_create_table(input) {
        let rendered = create.to_string();
        let reparsed = parse_create_table(&rendered).expect("rendered CREATE TABLE must parse");
        assert_eq!(reparsed, create);
    }
});
