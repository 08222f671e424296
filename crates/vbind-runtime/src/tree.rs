#![forbid(unsafe_code)]

//! Traversal orders over a view tree.
//!
//! All traversals snapshot the tree up front, so callbacks run over the
//! result may add or destroy views without invalidating the walk. Destroyed
//! views are skipped.

use std::collections::VecDeque;

use crate::view::View;

/// Parents before children, siblings in insertion order.
#[must_use]
pub fn depth_first(root: &View) -> Vec<View> {
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(view) = stack.pop() {
        if view.is_destroyed() {
            continue;
        }
        stack.extend(view.children().into_iter().rev());
        out.push(view);
    }
    out
}

/// Level by level, root first.
#[must_use]
pub fn breadth_first(root: &View) -> Vec<View> {
    let mut out = Vec::new();
    let mut queue = VecDeque::from([root.clone()]);
    while let Some(view) = queue.pop_front() {
        if view.is_destroyed() {
            continue;
        }
        queue.extend(view.children());
        out.push(view);
    }
    out
}

/// Deepest level first, root last.
#[must_use]
pub fn reverse_breadth_first(root: &View) -> Vec<View> {
    let mut out = breadth_first(root);
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ViewClass;
    use crate::context::BindingContext;

    fn names(views: &[View]) -> Vec<&str> {
        views.iter().map(View::name).collect()
    }

    #[test]
    fn orders() {
        let ctx = BindingContext::builder()
            .register_view(ViewClass::new("Node"))
            .build()
            .unwrap();
        let root = ctx.create_view("Node", "root", None).unwrap();
        let a = ctx.create_view("Node", "a", Some(&root)).unwrap();
        let _b = ctx.create_view("Node", "b", Some(&root)).unwrap();
        let _a1 = ctx.create_view("Node", "a1", Some(&a)).unwrap();

        assert_eq!(names(&depth_first(&root)), ["root", "a", "a1", "b"]);
        assert_eq!(names(&breadth_first(&root)), ["root", "a", "b", "a1"]);
        assert_eq!(names(&reverse_breadth_first(&root)), ["a1", "b", "a", "root"]);

        a.destroy();
        assert_eq!(names(&breadth_first(&root)), ["root", "b"]);
    }
}
