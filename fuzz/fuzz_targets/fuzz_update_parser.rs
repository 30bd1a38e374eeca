#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(update) = memquery::parse_update_json(s) {
            let mut engine = memquery::QueryEngine::new(vec![
                bson::doc!{"a": 1, "list": [1, 2], "nested": {"z": 3}},
                bson::doc!{"a": "text"},
            ]);
            let _ = engine.update(&memquery::Query::new(), &update);
        }
    }
});
