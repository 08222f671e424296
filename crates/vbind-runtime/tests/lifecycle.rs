//! Destruction, owner-typed members, typed handles and resources.

use std::cell::Cell;
use std::rc::Rc;

use vbind_core::{BindingConfig, Value, ValueType};
use vbind_runtime::{
    BindingContext, Resource, ValueObserver, ViewClass, Visited, initialize_tree,
};

struct Hits(Cell<usize>);

impl ValueObserver for Hits {
    fn notify(&self, _visited: &mut Visited) -> bool {
        self.0.set(self.0.get() + 1);
        true
    }
}

fn context() -> BindingContext {
    BindingContext::builder()
        .config(BindingConfig::new().with_language("en"))
        .register_view(
            ViewClass::new("Person")
                .member("FirstName", ValueType::Str)
                .member("Age", ValueType::Int)
                .member("Friend", ValueType::Owner("Person".into())),
        )
        .register_view(ViewClass::new("Label").member("Text", ValueType::Str))
        .resource("Strings", Resource::new("Greeting", "Hi"))
        .resource("Strings", Resource::new("Greeting", "Hello").with_language("en"))
        .resource("Strings", Resource::new("Greeting", "Bonjour").with_language("fr"))
        .build()
        .unwrap()
}

#[test]
fn destroying_a_subtree_detaches_it() {
    let ctx = context();
    let root = ctx.create_view("Person", "root", None).unwrap();
    let label = ctx.create_view("Label", "label", Some(&root)).unwrap();
    let nested = ctx.create_view("Label", "nested", Some(&label)).unwrap();
    label.add_binding("Text", "{FirstName}").unwrap();
    initialize_tree(&root).unwrap();

    label.destroy();
    assert!(label.is_destroyed());
    assert!(nested.is_destroyed());
    assert!(root.children().is_empty());
    assert_eq!(label.binding_count(), 0);

    assert!(root.set_value("FirstName", "Ada").is_some());
    assert!(label.set_value("Text", "ignored").is_none());
    assert!(!label.is_set("Text"));
}

#[test]
fn bindings_targeting_a_destroyed_view_are_dropped() {
    let ctx = context();
    let root = ctx.create_view("Person", "root", None).unwrap();
    let label = ctx.create_view("Label", "label", Some(&root)).unwrap();
    label.add_binding("Text", "{=FirstName}").unwrap();
    initialize_tree(&root).unwrap();

    let hits = Rc::new(Hits(Cell::new(0)));
    let _sub = root.observe("FirstName", hits.clone()).unwrap();
    label.destroy();
    root.set_value("FirstName", "Ada");
    root.set_value("FirstName", "Grace");
    assert_eq!(hits.0.get(), 2);
    assert_eq!(root.get_value("FirstName"), Some(Value::from("Grace")));
}

#[test]
fn mapped_paths_follow_reassigned_owners() {
    let ctx = context();
    let ada = ctx.create_view("Person", "ada", None).unwrap();
    let bob = ctx.create_view("Person", "bob", None).unwrap();
    let carl = ctx.create_view("Person", "carl", None).unwrap();
    bob.set_value("Age", 30);
    carl.set_value("Age", 50);

    let hits = Rc::new(Hits(Cell::new(0)));
    let _sub = ada.observe("Friend.Age", hits.clone()).unwrap();
    assert_eq!(ada.get_value("Friend.Age"), None);

    ada.set_value("Friend", bob.to_value());
    assert_eq!(ada.get_value("Friend.Age"), Some(Value::Int(30)));
    ada.set_value("Friend", carl.to_value());
    assert_eq!(ada.get_value("Friend.Age"), Some(Value::Int(50)));
    assert_eq!(hits.0.get(), 2);

    bob.set_value("Age", 31);
    assert_eq!(hits.0.get(), 2);
    carl.set_value("Age", 51);
    assert_eq!(hits.0.get(), 3);

    carl.destroy();
    assert_eq!(ada.get_value("Friend.Age"), None);
    assert!(ada.set_value("Friend.Age", 60).is_none());
}

#[test]
fn bindings_reach_through_owner_members() {
    let ctx = context();
    let ada = ctx.create_view("Person", "ada", None).unwrap();
    let label = ctx.create_view("Label", "label", Some(&ada)).unwrap();
    let bob = ctx.create_view("Person", "bob", None).unwrap();
    bob.set_value("FirstName", "Bob");
    label.add_binding("Text", "{Friend.FirstName}").unwrap();
    initialize_tree(&ada).unwrap();
    assert_eq!(label.get_value("Text"), Some(Value::Null));

    ada.set_value("Friend", bob.to_value());
    assert_eq!(label.get_value("Text"), Some(Value::from("Bob")));
    label.set_value("Text", "Robert");
    assert_eq!(bob.get_value("FirstName"), Some(Value::from("Robert")));
}

#[test]
fn typed_handles_read_and_write() {
    let ctx = context();
    let person = ctx.create_view("Person", "ada", None).unwrap();
    let age = person.field::<i64>("Age").unwrap();
    assert!(person.field::<i64>("Nope").is_none());

    assert_eq!(age.get(), None);
    assert!(age.set_direct(36));
    assert_eq!(age.get(), Some(36));
    assert!(!age.is_set());

    assert!(age.set(37));
    assert!(age.is_set());
    assert_eq!(person.field::<i64>("Age").unwrap().get(), Some(37));
    assert_eq!(age.path(), "Age");
}

#[test]
fn direct_writes_do_not_propagate() {
    let ctx = context();
    let person = ctx.create_view("Person", "ada", None).unwrap();
    let label = ctx.create_view("Label", "label", Some(&person)).unwrap();
    label.add_binding("Text", "{=FirstName}").unwrap();
    initialize_tree(&person).unwrap();

    let name = person.field::<String>("FirstName").unwrap();
    name.set_direct("Ada".to_owned());
    assert_eq!(label.get_value("Text"), Some(Value::Null));
    name.set("Grace".to_owned());
    assert_eq!(label.get_value("Text"), Some(Value::from("Grace")));
}

#[test]
fn resource_bindings_follow_the_active_language() {
    let ctx = context();
    let label = ctx.create_view("Label", "label", None).unwrap();
    label.add_binding("Text", "{@Strings.Greeting}").unwrap();
    initialize_tree(&label).unwrap();
    assert_eq!(label.get_value("Text"), Some(Value::from("Hello")));

    ctx.resources().set_language(Some("fr".to_owned()));
    assert_eq!(label.get_value("Text"), Some(Value::from("Bonjour")));
    ctx.resources().set_language(Some("de".to_owned()));
    assert_eq!(label.get_value("Text"), Some(Value::from("Hi")));

    ctx.resources().set_value("Strings", "Greeting", "Hey");
    assert_eq!(label.get_value("Text"), Some(Value::from("Hey")));
}

#[test]
fn resource_bindings_are_one_way() {
    let ctx = context();
    let label = ctx.create_view("Label", "label", None).unwrap();
    label.add_binding("Text", "{@Strings.Greeting}").unwrap();
    initialize_tree(&label).unwrap();

    label.set_value("Text", "local");
    assert_eq!(ctx.resources().get_value("Strings", "Greeting"), Some(Value::from("Hello")));
    assert_eq!(label.binding_count(), 1);
}
