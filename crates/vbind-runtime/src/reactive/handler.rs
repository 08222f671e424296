#![forbid(unsafe_code)]

//! Change-handler observers.
//!
//! Registered on a field by [`View::add_change_handler`]. A deferred
//! observer only queues the handler name on its view; the queue is a set,
//! so any number of notifications before the next flush collapse into one
//! invocation. An immediate observer runs the handler inside the
//! notification; its callback is resolved once when the observer is
//! created.

use std::fmt;
use std::rc::{Rc, Weak};

use super::observer::{ValueObserver, Visited};
use crate::class::HandlerFn;
use crate::view::{View, ViewInner};

pub struct ChangeHandlerObserver {
    view: Weak<ViewInner>,
    handler: Rc<str>,
    immediate: bool,
    callback: Option<HandlerFn>,
}

impl ChangeHandlerObserver {
    pub(crate) fn new(view: &View, handler: Rc<str>, immediate: bool) -> Self {
        let callback = if immediate { view.handler_fn(&handler) } else { None };
        Self {
            view: view.downgrade(),
            handler,
            immediate,
            callback,
        }
    }

    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }

    #[must_use]
    pub fn is_immediate(&self) -> bool {
        self.immediate
    }
}

impl ValueObserver for ChangeHandlerObserver {
    /// Never asks to be removed; the subscription lives and dies with the
    /// view that declared the handler.
    fn notify(&self, _visited: &mut Visited) -> bool {
        let Some(view) = self.view.upgrade().map(View::from_inner) else {
            return true;
        };
        if let Some(callback) = &self.callback {
            view.run_handler(&self.handler, callback);
        } else if self.immediate {
            view.invoke_handler(&self.handler);
        } else {
            view.queue_handler(&self.handler);
        }
        true
    }
}

impl fmt::Debug for ChangeHandlerObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeHandlerObserver")
            .field("handler", &self.handler)
            .field("immediate", &self.immediate)
            .finish()
    }
}
