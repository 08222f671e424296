#![forbid(unsafe_code)]

//! The propagation driver.
//!
//! Brings a freshly built view tree to a consistent state:
//!
//! 1. depth-first: apply literal values declared in markup;
//! 2. depth-first: wire bindings, state values and change handlers
//!    (parents before children, since bindings read parent fields);
//! 3. reverse breadth-first: run initialization hooks, leaves first;
//! 4. breadth-first: propagate every binding once, root to leaves;
//! 5. reverse breadth-first: queue the handlers of every set field;
//! 6. flush pending handlers, reverse breadth-first, until no view has
//!    anything pending or the pass cap trips.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Markup declaration rejected | logged, collected in [`InitReport::markup_errors`] |
//! | Handlers keep re-queuing each other | `error!` with every pending handler, `Err(ChangeHandlerOverflow)` |

use vbind_core::BindingError;

use crate::tree;
use crate::view::View;

/// Outcome of [`initialize_tree`].
#[derive(Debug, Default)]
pub struct InitReport {
    /// Views initialized.
    pub views: usize,
    /// Flush passes until the tree went quiet.
    pub flush_passes: usize,
    /// Declarations that could not be wired.
    pub markup_errors: Vec<BindingError>,
}

/// Run the full initialization sequence over the tree rooted at `root`.
pub fn initialize_tree(root: &View) -> Result<InitReport, BindingError> {
    let _span = tracing::debug_span!("initialize_tree", root = %root).entered();
    let mut report = InitReport::default();

    let depth_first = tree::depth_first(root);
    report.views = depth_first.len();
    for view in &depth_first {
        report.markup_errors.extend(view.initialize_defaults());
    }
    for view in &depth_first {
        report.markup_errors.extend(view.initialize_internal());
    }

    for view in tree::reverse_breadth_first(root) {
        view.run_initialize_hook();
    }
    for view in tree::breadth_first(root) {
        view.propagate_bindings();
    }
    for view in tree::reverse_breadth_first(root) {
        view.queue_all_change_handlers();
    }

    report.flush_passes = flush_tree(root)?;
    tracing::debug!(
        views = report.views,
        passes = report.flush_passes,
        errors = report.markup_errors.len(),
        "tree initialized"
    );
    Ok(report)
}

/// Flush pending change handlers until the tree is quiet.
///
/// Returns the number of passes run. Handlers queued by other handlers run
/// in a later pass, never in the middle of one.
pub fn flush_tree(root: &View) -> Result<usize, BindingError> {
    let cap = root.context().config().flush_pass_cap;
    let mut passes = 0;
    loop {
        let order = tree::reverse_breadth_first(root);
        if !order.iter().any(View::has_pending_handlers) {
            return Ok(passes);
        }
        if passes >= cap {
            let pending = pending_dump(&order);
            let err = BindingError::ChangeHandlerOverflow { passes, pending };
            tracing::error!(passes, error = %err, "change handlers did not settle");
            return Err(err);
        }

        passes += 1;
        let _span = tracing::debug_span!("flush_pass", pass = passes).entered();
        let mut ran = 0;
        for view in &order {
            ran += view.trigger_change_handlers();
        }
        tracing::trace!(handlers = ran, "flush pass done");
    }
}

fn pending_dump(order: &[View]) -> Vec<(String, String)> {
    order
        .iter()
        .flat_map(|view| {
            view.pending_handlers()
                .into_iter()
                .map(move |handler| (view.to_string(), handler))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ViewClass;
    use crate::context::BindingContext;
    use vbind_core::{BindingConfig, Value, ValueType};

    #[test]
    fn empty_tree_settles_without_passes() {
        let ctx = BindingContext::builder()
            .register_view(ViewClass::new("Node"))
            .build()
            .unwrap();
        let root = ctx.create_view("Node", "root", None).unwrap();
        let report = initialize_tree(&root).unwrap();
        assert_eq!(report.views, 1);
        assert_eq!(report.flush_passes, 0);
        assert!(report.markup_errors.is_empty());
        assert!(root.is_initialized());
    }

    #[test]
    fn markup_errors_are_collected_not_fatal() {
        let ctx = BindingContext::builder()
            .register_view(ViewClass::new("Node").member("Text", ValueType::Str))
            .build()
            .unwrap();
        let root = ctx.create_view("Node", "root", None).unwrap();
        root.add_value("Txet", "typo");
        root.add_binding("Text", "{Missing}").unwrap();
        let report = initialize_tree(&root).unwrap();
        assert_eq!(report.markup_errors.len(), 2);
    }

    #[test]
    fn handler_chain_runs_in_later_passes() {
        let ctx = BindingContext::builder()
            .config(BindingConfig::new().with_flush_pass_cap(10))
            .register_view(
                ViewClass::new("Chain")
                    .member("A", ValueType::Int)
                    .member("B", ValueType::Int)
                    .change_handler("OnA", |view| {
                        let a = view.get_value("A").and_then(|v| v.as_int()).unwrap_or(0);
                        view.set_value("B", a * 2);
                        Ok(())
                    })
                    .change_handler("OnB", |_| Ok(())),
            )
            .build()
            .unwrap();
        let root = ctx.create_view("Chain", "root", None).unwrap();
        root.add_value("A", 4);
        root.add_change_handler("A", "OnA", false).unwrap();
        root.add_change_handler("B", "OnB", false).unwrap();

        let report = initialize_tree(&root).unwrap();
        assert_eq!(report.flush_passes, 2);
        assert_eq!(root.get_value("B"), Some(Value::Int(8)));
        assert_eq!(flush_tree(&root).unwrap(), 0);
    }
}
