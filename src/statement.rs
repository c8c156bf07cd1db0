//! Statements and the flags that describe their syntactic context.

use crate::node::{Node, NodeKind};
use crate::status::{Cursor, Status};
use std::ops::{BitOr, BitOrAssign};

/// Context of a statement within the surface syntax it was read from,
/// used by the writer to reproduce anonymous and collection forms.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct StatementFlags(u8);

impl StatementFlags {
    /// The subject is an empty anonymous node (`[]`).
    pub const EMPTY_S: Self = Self(1);
    /// The object is an empty anonymous node (`[]`).
    pub const EMPTY_O: Self = Self(2);
    /// The subject starts an inline anonymous node (`[ … ]`).
    pub const ANON_S: Self = Self(4);
    /// The object starts an inline anonymous node (`[ … ]`).
    pub const ANON_O: Self = Self(8);
    /// The subject starts a collection (`( … )`).
    pub const LIST_S: Self = Self(16);
    /// The object starts a collection (`( … )`).
    pub const LIST_O: Self = Self(32);

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for StatementFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for StatementFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A subject–predicate–object triple, optionally in a named graph, with
/// the cursor where it was read for diagnostics.
///
/// The fields are public so hosts can build statements directly; kind
/// legality is enforced where it matters, at the writer boundary
/// ([`check`](Statement::check)).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Statement {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
    pub graph: Option<Node>,
    pub cursor: Option<Cursor>,
}

impl Statement {
    pub fn new(subject: Node, predicate: Node, object: Node) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph: None,
            cursor: None,
        }
    }

    pub fn with_graph(mut self, graph: Option<Node>) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    #[inline]
    pub fn subject(&self) -> &Node {
        &self.subject
    }

    #[inline]
    pub fn predicate(&self) -> &Node {
        &self.predicate
    }

    #[inline]
    pub fn object(&self) -> &Node {
        &self.object
    }

    #[inline]
    pub fn graph(&self) -> Option<&Node> {
        self.graph.as_ref()
    }

    #[inline]
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Verifies kind legality: subjects and graphs must be URIs, CURIEs or
    /// blanks, predicates URIs or CURIEs, and variables may appear nowhere.
    pub fn check(&self) -> Result<(), Status> {
        if !matches!(
            self.subject.kind(),
            NodeKind::Uri | NodeKind::Curie | NodeKind::Blank
        ) || !matches!(self.predicate.kind(), NodeKind::Uri | NodeKind::Curie)
            || self.object.kind() == NodeKind::Variable
        {
            return Err(Status::BadArg);
        }
        if let Some(graph) = &self.graph {
            if !matches!(
                graph.kind(),
                NodeKind::Uri | NodeKind::Curie | NodeKind::Blank
            ) {
                return Err(Status::BadArg);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let flags = StatementFlags::ANON_O | StatementFlags::LIST_S;
        assert!(flags.contains(StatementFlags::ANON_O));
        assert!(!flags.contains(StatementFlags::EMPTY_S));
        assert_eq!(StatementFlags::LIST_O.bits(), 32);
    }

    #[test]
    fn kind_legality() {
        let s = Node::new_uri("http://example.org/s");
        let p = Node::new_uri("http://example.org/p");
        let o = Node::new_string("hello");

        assert!(Statement::new(s.clone(), p.clone(), o.clone()).check().is_ok());
        assert_eq!(
            Statement::new(o.clone(), p.clone(), o.clone()).check(),
            Err(Status::BadArg)
        );
        assert_eq!(
            Statement::new(s.clone(), o.clone(), s.clone()).check(),
            Err(Status::BadArg)
        );
        assert_eq!(
            Statement::new(s.clone(), p.clone(), Node::new_variable("v"))
                .check(),
            Err(Status::BadArg)
        );
        assert_eq!(
            Statement::new(s.clone(), p.clone(), o.clone())
                .with_graph(Some(Node::new_string("g")))
                .check(),
            Err(Status::BadArg)
        );
        assert!(Statement::new(s, p, o)
            .with_graph(Some(Node::new_blank("g")))
            .check()
            .is_ok());
    }
}
