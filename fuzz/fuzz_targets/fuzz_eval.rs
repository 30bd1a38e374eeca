#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(query) = memquery::parse_query_json(s) {
            // A few shapes to reach the path, comparison and membership branches
            let engine = memquery::QueryEngine::new(vec![
                bson::doc!{"a": 1, "b": 2, "name": "x"},
                bson::doc!{"a": 10, "b": -5, "name": "y", "nested": {"z": 3}},
                bson::doc!{"tags": ["p", "q"], "active": true},
            ]);
            let _ = engine.find(&query);
        }
    }
});
