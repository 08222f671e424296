//! The driver's span structure, captured with a registry layer.

use std::sync::{Arc, Mutex};

use tracing::span::{Attributes, Id};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use vbind_core::ValueType;
use vbind_runtime::{BindingContext, ViewClass, initialize_tree};

#[derive(Clone, Default)]
struct SpanNames(Arc<Mutex<Vec<String>>>);

impl SpanNames {
    fn count(&self, name: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|n| *n == name).count()
    }
}

impl<S: tracing::Subscriber> Layer<S> for SpanNames {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        self.0.lock().unwrap().push(attrs.metadata().name().to_owned());
    }
}

#[test]
fn each_flush_pass_gets_its_own_span() {
    let names = SpanNames::default();
    let subscriber = tracing_subscriber::registry().with(names.clone());

    let report = tracing::subscriber::with_default(subscriber, || {
        let ctx = BindingContext::builder()
            .register_view(
                ViewClass::new("Chain")
                    .member("A", ValueType::Int)
                    .member("B", ValueType::Int)
                    .change_handler("OnA", |view| {
                        view.set_value("B", 1);
                        Ok(())
                    })
                    .change_handler("OnB", |_| Ok(())),
            )
            .build()
            .unwrap();
        let root = ctx.create_view("Chain", "root", None).unwrap();
        ctx.create_view("Chain", "leaf", Some(&root)).unwrap();
        root.add_value("A", 1);
        root.add_change_handler("A", "OnA", false).unwrap();
        root.add_change_handler("B", "OnB", false).unwrap();
        initialize_tree(&root).unwrap()
    });

    assert_eq!(report.views, 2);
    assert_eq!(report.flush_passes, 2);
    assert_eq!(names.count("initialize_tree"), 1);
    assert_eq!(names.count("flush_pass"), 2);
}
