#![no_main]

use libfuzzer_sys::fuzz_target;
use vbind_core::{
    ConverterRegistry, PathResolver, TypeDescriptor, TypeRegistry, Value, ValueType,
};

fn registry() -> TypeRegistry {
    let mut types = TypeRegistry::new();
    let descriptors = [
        TypeDescriptor::record("Name")
            .member("First", ValueType::Str)
            .member("Last", ValueType::Str),
        TypeDescriptor::owner("Node")
            .member("Name", ValueType::Record("Name".into()))
            .member("Next", ValueType::Owner("Node".into()))
            .member("Any", ValueType::Any)
            .container("Width", ValueType::Int, Value::Int(0))
            .calculated("Label", ValueType::Str),
    ];
    for descriptor in descriptors {
        types.register(descriptor).expect("fixture types register cleanly");
    }
    types
}

fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };
    let types = registry();
    let converters = ConverterRegistry::default();
    let resolver = PathResolver::new();
    let probe = |_: &[vbind_core::MemberAccess]| Value::Null;

    let first = resolver.resolve(&types, &converters, "Node", path, &probe);
    let second = resolver.resolve(&types, &converters, "Node", path, &probe);
    match (first, second) {
        (Ok(a), Ok(b)) => {
            assert_eq!(a.path, b.path);
            assert!(!a.members.is_empty());
        }
        (Err(a), Err(b)) => assert_eq!(a.severity, b.severity),
        _ => panic!("resolution of {path:?} is not deterministic"),
    }
});
