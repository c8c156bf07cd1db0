//! Per-host configuration: blank node allocation and error reporting.

use crate::node::Node;
use crate::status::{Cursor, Error, Status};
use std::cell::{Cell, RefCell};

type ErrorSink = Box<dyn FnMut(&Error)>;

/// The shared context readers and writers are created from.
///
/// A world owns the blank node counter and the error sink; it holds no
/// other global state. It is single-threaded: create one world per thread.
pub struct World {
    next_blank_id: Cell<u32>,
    error_sink: RefCell<Option<ErrorSink>>,
}

impl World {
    pub fn new() -> Self {
        Self {
            next_blank_id: Cell::new(0),
            error_sink: RefCell::new(None),
        }
    }

    /// Returns a fresh blank node: `b1`, `b2`, … in allocation order.
    pub fn blank(&self) -> Node {
        let id = self.next_blank_id.get() + 1;
        self.next_blank_id.set(id);
        Node::new_blank(format!("b{id}"))
    }

    /// Routes error reports through `sink` instead of standard error.
    pub fn set_error_sink(&mut self, sink: impl FnMut(&Error) + 'static) {
        *self.error_sink.get_mut() = Some(Box::new(sink));
    }

    /// Reports an error and returns its status, for use in tail position.
    pub(crate) fn error(
        &self,
        status: Status,
        cursor: Option<&Cursor>,
        message: impl Into<String>,
    ) -> Status {
        let error = Error::new(status, cursor.cloned(), message);
        if let Some(sink) = self.error_sink.borrow_mut().as_mut() {
            sink(&error);
        } else {
            eprintln!("error: {error}");
        }
        status
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
