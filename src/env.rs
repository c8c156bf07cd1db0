//! The prefixing environment mediating CURIE expansion and qualification.

use crate::node::{Node, NodeKind};
use crate::sink::Sink;
use crate::status::Status;
use crate::uri;

/// A base URI plus an ordered `prefix → URI` map.
///
/// Bindings iterate in insertion order so that serialization output is
/// reproducible; re-binding a name keeps its original position.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Env {
    base: Option<Node>,
    prefixes: Vec<(Node, Node)>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current base URI, if one is set.
    #[inline]
    pub fn base(&self) -> Option<&Node> {
        self.base.as_ref()
    }

    /// Sets the base URI. The node must be an absolute URI.
    pub fn set_base(&mut self, base: &Node) -> Result<(), Status> {
        if base.kind() != NodeKind::Uri
            || base.is_empty()
            || !uri::parse_uri(base.as_str()).is_absolute()
        {
            return Err(Status::BadArg);
        }
        self.base = Some(base.clone());
        Ok(())
    }

    /// Binds `name` to `value`, which must be a URI node.
    pub fn set_prefix(&mut self, name: &Node, value: &Node) -> Result<(), Status> {
        if value.kind() != NodeKind::Uri {
            return Err(Status::BadArg);
        }
        if let Some((_, bound)) = self
            .prefixes
            .iter_mut()
            .find(|(n, _)| n.as_str() == name.as_str())
        {
            *bound = value.clone();
        } else {
            self.prefixes.push((name.clone(), value.clone()));
        }
        Ok(())
    }

    /// Binds `name` to `value` given as plain strings.
    pub fn set_prefix_from_strings(&mut self, name: &str, value: &str) -> Result<(), Status> {
        self.set_prefix(&Node::new_curie(name), &Node::new_uri(value))
    }

    /// The URI bound to `name`, if any.
    pub fn prefix_value(&self, name: &str) -> Option<&Node> {
        self.prefixes
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, value)| value)
    }

    /// Expands `node` to a URI: a CURIE through the prefix map, a relative
    /// URI against the base. Returns `None` for unbound prefixes, other
    /// node kinds, or when no base is set.
    pub fn expand(&self, node: &Node) -> Option<Node> {
        match node.kind() {
            NodeKind::Curie => {
                let (prefix, local) = node.as_str().split_once(':')?;
                let bound = self.prefix_value(prefix)?;
                Some(Node::new_uri(format!("{}{local}", bound.as_str())))
            }
            NodeKind::Uri => node.resolve(self.base.as_ref()?),
            _ => None,
        }
    }

    /// Abbreviates a URI node into a CURIE using the longest matching
    /// binding; among equal-length matches the first inserted wins.
    pub fn qualify(&self, node: &Node) -> Option<Node> {
        if node.kind() != NodeKind::Uri {
            return None;
        }
        let mut best: Option<(&Node, &str)> = None;
        for (name, value) in &self.prefixes {
            if let Some(local) = node.as_str().strip_prefix(value.as_str()) {
                if best.map_or(true, |(_, l)| local.len() < l.len()) {
                    best = Some((name, local));
                }
            }
        }
        let (name, local) = best?;
        Some(Node::new_curie(format!("{}:{local}", name.as_str())))
    }

    /// The bindings in insertion order.
    pub fn prefixes(&self) -> impl Iterator<Item = (&Node, &Node)> {
        self.prefixes.iter().map(|(name, value)| (name, value))
    }

    /// Replays every binding into `sink` in insertion order.
    pub fn write_prefixes(&self, sink: &mut impl Sink) -> Result<(), Status> {
        for (name, value) in &self.prefixes {
            sink.prefix(name, value)?;
        }
        Ok(())
    }
}
