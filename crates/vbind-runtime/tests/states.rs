//! Named states and their default-state snapshots.

use std::cell::Cell;

use vbind_core::{Value, ValueType};
use vbind_runtime::{BindingContext, View, ViewClass, initialize_tree};

thread_local! {
    static STATE_CHANGES: Cell<usize> = const { Cell::new(0) };
}

fn context() -> BindingContext {
    BindingContext::builder()
        .register_view(
            ViewClass::new("Button")
                .member("Color", ValueType::Str)
                .member("Border", ValueType::Int)
                .change_handler("OnStateChanged", |_| {
                    STATE_CHANGES.with(|c| c.set(c.get() + 1));
                    Ok(())
                }),
        )
        .build()
        .unwrap()
}

fn button(ctx: &BindingContext) -> View {
    ctx.create_view("Button", "button", None).unwrap()
}

fn color(view: &View) -> Option<Value> {
    view.get_value("Color")
}

#[test]
fn views_start_in_the_default_state() {
    let ctx = context();
    let button = button(&ctx);
    assert_eq!(button.state(), ctx.config().default_state);
    assert_eq!(button.get_value("State"), Some(Value::from("Default")));
}

#[test]
fn switching_back_restores_the_value_before_the_override() {
    let ctx = context();
    let button = button(&ctx);
    initialize_tree(&button).unwrap();
    button.set_value("Color", "blue");
    button.add_state_value("Hover", "Color", "red");

    button.set_state("Hover");
    assert_eq!(color(&button), Some(Value::from("red")));
    button.set_state("Default");
    assert_eq!(color(&button), Some(Value::from("blue")));
}

#[test]
fn default_writes_after_the_override_refresh_the_snapshot() {
    let ctx = context();
    let button = button(&ctx);
    button.add_value("Color", "black");
    button.add_state_value("Hover", "Color", "red");
    initialize_tree(&button).unwrap();
    assert_eq!(color(&button), Some(Value::from("black")));

    button.set_value("Color", "blue");
    button.set_state("Hover");
    assert_eq!(color(&button), Some(Value::from("red")));
    button.set_state("Default");
    assert_eq!(color(&button), Some(Value::from("blue")));
}

#[test]
fn writes_in_other_states_leave_the_snapshot_alone() {
    let ctx = context();
    let button = button(&ctx);
    button.add_value("Color", "black");
    button.add_state_value("Hover", "Color", "red");
    initialize_tree(&button).unwrap();

    button.set_state("Hover");
    button.set_value("Color", "green");
    assert_eq!(color(&button), Some(Value::from("green")));
    button.set_state("Default");
    assert_eq!(color(&button), Some(Value::from("black")));
}

#[test]
fn paths_not_overridden_in_a_state_fall_back_to_default() {
    let ctx = context();
    let button = button(&ctx);
    button.add_value("Color", "black");
    button.add_value("Border", 1);
    button.add_state_value("Hover", "Color", "red");
    button.add_state_value("Pressed", "Border", 3);
    initialize_tree(&button).unwrap();

    button.set_state("Hover");
    assert_eq!(color(&button), Some(Value::from("red")));
    assert_eq!(button.get_value("Border"), Some(Value::Int(1)));

    button.set_state("Pressed");
    assert_eq!(color(&button), Some(Value::from("black")));
    assert_eq!(button.get_value("Border"), Some(Value::Int(3)));

    let defaults = button
        .state_values()
        .into_iter()
        .filter(|v| &*v.state == "Default")
        .count();
    assert_eq!(defaults, 2);
}

#[test]
fn state_changes_are_observable() {
    let ctx = context();
    let button = button(&ctx);
    button
        .add_change_handler("State", "OnStateChanged", true)
        .unwrap();
    initialize_tree(&button).unwrap();
    let before = STATE_CHANGES.with(Cell::get);

    button.set_state("Hover");
    button.set_state("Hover");
    button.set_state("Default");
    assert_eq!(STATE_CHANGES.with(Cell::get) - before, 2);
    assert!(!button.has_pending_handlers());
}

#[test]
fn overrides_declared_for_the_active_state_apply_immediately() {
    let ctx = context();
    let button = button(&ctx);
    initialize_tree(&button).unwrap();
    button.set_state("Hover");
    button.add_state_value("Hover", "Color", "red");
    assert_eq!(color(&button), Some(Value::from("red")));

    button.set_state("Default");
    assert_eq!(color(&button), Some(Value::Null));
}
