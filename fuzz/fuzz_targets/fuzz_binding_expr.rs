#![no_main]

use libfuzzer_sys::fuzz_target;
use vbind_core::BindingKind;
use vbind_core::expr;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(parsed) = expr::parse(text) else {
        return;
    };
    assert!(!parsed.sources.is_empty() || parsed.kind == BindingKind::MultiTransform);
    for source in &parsed.sources {
        assert!(!source.path.is_empty());
    }
    match parsed.kind {
        BindingKind::Single => assert_eq!(parsed.sources.len(), 1),
        BindingKind::MultiFormatString => {
            let template = parsed.template.as_ref().expect("format bindings carry a template");
            assert_eq!(template.arg_count(), parsed.sources.len());
        }
        BindingKind::MultiTransform => assert!(parsed.transform.is_some()),
    }
});
