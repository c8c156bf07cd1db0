//! The event sink fed by the reader.

use crate::node::Node;
use crate::statement::{Statement, StatementFlags};
use crate::status::Status;

/// A bundle of callbacks receiving parsed events.
///
/// Every method has a no-op default so implementors only handle the events
/// they care about. Returning an error from any callback aborts the current
/// read operation, which surfaces that status to the caller.
///
/// Callbacks observe nodes and statements by reference and must clone
/// anything they want to keep.
pub trait Sink {
    /// A new base URI was declared.
    fn base(&mut self, uri: &Node) -> Result<(), Status> {
        let _ = uri;
        Ok(())
    }

    /// A prefix was bound to a URI.
    fn prefix(&mut self, name: &Node, value: &Node) -> Result<(), Status> {
        let _ = (name, value);
        Ok(())
    }

    /// A complete statement, with the flags describing its surface form.
    fn statement(&mut self, flags: StatementFlags, statement: &Statement) -> Result<(), Status> {
        let _ = (flags, statement);
        Ok(())
    }

    /// The inline anonymous node `node` will receive no further
    /// statements.
    fn end(&mut self, node: &Node) -> Result<(), Status> {
        let _ = node;
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn base(&mut self, uri: &Node) -> Result<(), Status> {
        (**self).base(uri)
    }

    fn prefix(&mut self, name: &Node, value: &Node) -> Result<(), Status> {
        (**self).prefix(name, value)
    }

    fn statement(&mut self, flags: StatementFlags, statement: &Statement) -> Result<(), Status> {
        (**self).statement(flags, statement)
    }

    fn end(&mut self, node: &Node) -> Result<(), Status> {
        (**self).end(node)
    }
}
