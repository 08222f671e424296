#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vbind_core::{BindingConfig, ValueType};
use vbind_runtime::{BindingContext, ViewClass, flush_tree, initialize_tree};

#[derive(Arbitrary, Debug)]
enum Op {
    SetA(i64),
    SetB(i64),
    SetText(String),
    State(bool),
    Flush,
}

const PATHS: [&str; 3] = ["A", "B", "Text"];

#[derive(Arbitrary, Debug)]
struct Input {
    bindings: Vec<(u8, u8, bool)>,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let Ok(ctx) = BindingContext::builder()
        .config(BindingConfig::new().with_flush_pass_cap(16))
        .register_view(
            ViewClass::new("Node")
                .member("A", ValueType::Int)
                .member("B", ValueType::Int)
                .member("Text", ValueType::Str)
                .change_handler("OnA", |_| Ok(())),
        )
        .build()
    else {
        return;
    };
    let Ok(root) = ctx.create_view("Node", "root", None) else {
        return;
    };
    let Ok(child) = ctx.create_view("Node", "child", Some(&root)) else {
        return;
    };
    for (target, source, one_way) in input.bindings.iter().take(8) {
        let target = PATHS[usize::from(*target) % PATHS.len()];
        let source = PATHS[usize::from(*source) % PATHS.len()];
        let text = if *one_way { format!("{{={source}}}") } else { format!("{{{source}}}") };
        let _ = child.add_binding(target, &text);
    }
    let _ = child.add_change_handler("A", "OnA", false);
    root.add_state_value("Busy", "Text", "busy");
    let _ = initialize_tree(&root);

    for op in input.ops.into_iter().take(64) {
        match op {
            Op::SetA(v) => {
                root.set_value("A", v);
            }
            Op::SetB(v) => {
                child.set_value("B", v);
            }
            Op::SetText(s) => {
                root.set_value("Text", s);
            }
            Op::State(busy) => root.set_state(if busy { "Busy" } else { "Default" }),
            Op::Flush => {
                let _ = flush_tree(&root);
            }
        }
    }
    if flush_tree(&root).is_ok() {
        assert_eq!(flush_tree(&root).ok(), Some(0));
    }
});
