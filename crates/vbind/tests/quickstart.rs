use vbind::prelude::*;

#[test]
fn form_and_label_through_the_prelude() -> Result<(), BindingError> {
    let ctx = BindingContext::builder()
        .register_view(ViewClass::new("Form").member("First", ValueType::Str))
        .register_view(ViewClass::new("Label").member("Text", ValueType::Str))
        .build()?;
    let form = ctx.create_view("Form", "form", None)?;
    let label = ctx.create_view("Label", "label", Some(&form))?;
    label.add_binding("Text", "Hello {First}")?;

    let report = initialize_tree(&form)?;
    assert_eq!(report.views, 2);
    assert!(report.markup_errors.is_empty());

    form.set_value("First", "Ada");
    assert_eq!(label.get_value("Text"), Some(Value::from("Hello Ada")));
    assert_eq!(flush_tree(&form)?, 0);
    Ok(())
}

#[test]
fn typed_fields_through_the_prelude() {
    let ctx = BindingContext::builder()
        .register_view(ViewClass::new("Counter").member_with_default("Count", ValueType::Int, 3))
        .build()
        .unwrap();
    let counter = ctx.create_view("Counter", "counter", None).unwrap();
    let count: Field<i64> = counter.field("Count").unwrap();
    assert_eq!(count.get(), Some(3));
    count.set(count.get().unwrap_or(0) + 1);
    assert_eq!(counter.get_value("Count"), Some(Value::Int(4)));
}
