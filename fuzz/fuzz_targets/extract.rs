#![no_main]

use libfuzzer_sys::fuzz_target;
use typex_extract::{extract, OutputFormat, TypeDatabase};

fuzz_target!(|data: &[u8]| {
    // Same lossy decoding as the file reader.
    let text = String::from_utf8_lossy(data);

    for format in [OutputFormat::Json, OutputFormat::Text] {
        let found = extract("fuzz.h", &text, format);

        for func in found.functions.values() {
            let _ = func.format();
            assert!(!func.name.is_empty());
        }
        for info in found.structs.values().chain(found.unions.values()) {
            assert!(info.key().is_some());
        }

        let mut db = TypeDatabase::new();
        db.merge(found);
        let _ = db.stats();
    }
});
