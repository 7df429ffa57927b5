#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::json;
use vellum_engine::{Context, Template};

fuzz_target!(|data: &[u8]| {
    let source = match std::str::from_utf8(data) {
        Ok(src) => src,
        Err(_) => return,
    };

    if let Ok(template) = Template::parse_str("fuzz-template-render", source) {
        let mut context = Context::from_value(json!({
            "name": "fuzz",
            "items": [1, 2, 3],
            "nested": {"inner": "value"},
        }));
        let _ = template.render(&mut context);
    }
});
