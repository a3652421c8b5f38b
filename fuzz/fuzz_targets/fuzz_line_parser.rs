#![no_main]
use irrigator_core::ingest::{Line, parse_line};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Weights that come out of the parser are always finite.
    if let Line::Weight(w) = parse_line(data) {
        assert!(w.is_finite());
    }
});
