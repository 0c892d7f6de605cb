#![no_main]

use libfuzzer_sys::fuzz_target;
use typex_extract::enums::{parse_int_literal, parse_items};

fuzz_target!(|data: &[u8]| {
    if let Ok(body) = std::str::from_utf8(data) {
        // Enumerator expressions: literals, references, shifts, `|`.
        for item in parse_items(body) {
            assert!(!item.name.is_empty());
        }
        let _ = parse_int_literal(body.trim());
    }
});
