#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vbind_core::{FormatTemplate, Value};

#[derive(Arbitrary, Debug)]
enum Arg {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<Arg> for Value {
    fn from(arg: Arg) -> Self {
        match arg {
            Arg::Null => Value::Null,
            Arg::Bool(b) => Value::Bool(b),
            Arg::Int(i) => Value::Int(i),
            Arg::Float(f) => Value::Float(f),
            Arg::Str(s) => Value::from(s),
        }
    }
}

#[derive(Arbitrary, Debug)]
struct Input {
    template: String,
    args: Vec<Arg>,
}

fuzz_target!(|input: Input| {
    let Ok(template) = FormatTemplate::parse(&input.template) else {
        return;
    };
    let args: Vec<Value> = input.args.into_iter().map(Value::from).collect();
    let _ = template.render(&args);
    let _ = template.render(&[]);
});
