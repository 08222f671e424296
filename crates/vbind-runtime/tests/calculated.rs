//! Calculated members: lazy evaluation, dependency discovery and
//! propagation into bindings.

use vbind_core::{Value, ValueType};
use vbind_runtime::{BindingContext, View, ViewClass, initialize_tree};

fn int(view: &View, path: &str) -> i64 {
    view.get_value(path).and_then(|v| v.as_int()).unwrap_or(0)
}

fn context() -> BindingContext {
    BindingContext::builder()
        .register_view(
            ViewClass::new("Rect")
                .member("Width", ValueType::Int)
                .member("Height", ValueType::Int)
                .calculated("Area", ValueType::Int, |view| {
                    Value::Int(int(view, "Width") * int(view, "Height"))
                }, None)
                .calculated("Summary", ValueType::Str, |view| {
                    Value::from(format!("{} sq", int(view, "Area")))
                }, None)
                .calculated(
                    "Doubled",
                    ValueType::Int,
                    |view| Value::Int(int(view, "Width") * 2),
                    Some(Box::new(|view: &View, value: Value| {
                        let half = value.as_int().unwrap_or(0) / 2;
                        view.set_value("Width", half);
                    })),
                ),
        )
        .register_view(ViewClass::new("Label").member("Number", ValueType::Int))
        .build()
        .unwrap()
}

#[test]
fn nothing_is_computed_until_read() {
    let ctx = context();
    let rect = ctx.create_view("Rect", "rect", None).unwrap();
    let area = rect.calculated_field("Area").unwrap();

    rect.set_value("Width", 3);
    rect.set_value("Height", 4);
    assert_eq!(area.recomputes(), 0);
    assert!(area.is_dirty());

    assert_eq!(rect.get_value("Area"), Some(Value::Int(12)));
    assert_eq!(area.recomputes(), 1);
    assert_eq!(area.dependency_count(), 2);

    assert_eq!(rect.get_value("Area"), Some(Value::Int(12)));
    assert_eq!(area.recomputes(), 1);
}

#[test]
fn a_changed_dependency_recomputes_once() {
    let ctx = context();
    let rect = ctx.create_view("Rect", "rect", None).unwrap();
    let area = rect.calculated_field("Area").unwrap();
    rect.set_value("Width", 3);
    rect.set_value("Height", 4);
    assert_eq!(rect.get_value("Area"), Some(Value::Int(12)));

    rect.set_value("Width", 5);
    assert_eq!(area.recomputes(), 2);
    assert_eq!(rect.get_value("Area"), Some(Value::Int(20)));
    assert_eq!(area.recomputes(), 2);

    rect.set_value("Width", 5);
    assert_eq!(area.recomputes(), 2);
}

#[test]
fn calculated_fields_can_depend_on_each_other() {
    let ctx = context();
    let rect = ctx.create_view("Rect", "rect", None).unwrap();
    let summary = rect.calculated_field("Summary").unwrap();
    rect.set_value("Width", 2);
    rect.set_value("Height", 2);

    assert_eq!(rect.get_value("Summary"), Some(Value::from("4 sq")));
    assert_eq!(summary.dependency_count(), 1);
    assert!(ctx.computations().is_empty());

    rect.set_value("Height", 5);
    assert_eq!(rect.get_value("Summary"), Some(Value::from("10 sq")));
    assert_eq!(summary.recomputes(), 2);
}

#[test]
fn bindings_follow_calculated_sources() {
    let ctx = context();
    let rect = ctx.create_view("Rect", "rect", None).unwrap();
    let label = ctx.create_view("Label", "label", Some(&rect)).unwrap();
    label.add_binding("Number", "{=Area}").unwrap();
    initialize_tree(&rect).unwrap();
    assert_eq!(label.get_value("Number"), Some(Value::Int(0)));

    rect.set_value("Width", 2);
    rect.set_value("Height", 3);
    assert_eq!(label.get_value("Number"), Some(Value::Int(6)));
}

#[test]
fn writes_push_back_into_dependencies() {
    let ctx = context();
    let rect = ctx.create_view("Rect", "rect", None).unwrap();
    rect.set_value("Width", 1);
    assert_eq!(rect.get_value("Doubled"), Some(Value::Int(2)));

    rect.set_value("Doubled", 10);
    assert_eq!(rect.get_value("Width"), Some(Value::Int(5)));
    assert_eq!(rect.get_value("Doubled"), Some(Value::Int(10)));
    assert!(rect.is_set("Doubled"));
}

#[test]
fn writes_without_push_back_only_invalidate() {
    let ctx = context();
    let rect = ctx.create_view("Rect", "rect", None).unwrap();
    rect.set_value("Width", 2);
    rect.set_value("Height", 2);
    assert_eq!(rect.get_value("Area"), Some(Value::Int(4)));

    rect.set_value("Area", 99);
    assert_eq!(rect.get_value("Area"), Some(Value::Int(4)));
}
