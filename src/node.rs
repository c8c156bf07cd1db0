//! The node value model shared by the reader and the writer.

use crate::text;
use crate::uri;
use crate::vocab::xsd;
use memchr::memchr3_iter;
use oxilangtag::LanguageTag;
use std::fmt::Write as _;
use std::ops::{BitOr, BitOrAssign};

/// The kind of a [`Node`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum NodeKind {
    /// An absolute or relative URI.
    Uri,
    /// A compact URI `prefix:local`, expanded through an [`Env`](crate::Env).
    Curie,
    /// A literal value, optionally carrying a datatype or a language tag.
    Literal,
    /// A blank node label (without the `_:` sigil).
    Blank,
    /// A named variable, for pattern-like data. Not writable.
    Variable,
}

/// Properties of a node's body, computed at construction.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct NodeFlags(u8);

impl NodeFlags {
    /// The body contains a line feed.
    pub const HAS_NEWLINE: Self = Self(1);
    /// The body contains a double quote.
    pub const HAS_QUOTE: Self = Self(2);
    /// The body contains a backslash.
    pub const HAS_ESCAPE: Self = Self(4);

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

impl BitOr for NodeFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for NodeFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Returns the byte length of `s` together with its [`NodeFlags`].
pub fn strlen(s: &str) -> (usize, NodeFlags) {
    let mut flags = NodeFlags::empty();
    for i in memchr3_iter(b'\n', b'"', b'\\', s.as_bytes()) {
        flags |= match s.as_bytes()[i] {
            b'\n' => NodeFlags::HAS_NEWLINE,
            b'"' => NodeFlags::HAS_QUOTE,
            _ => NodeFlags::HAS_ESCAPE,
        };
    }
    (s.len(), flags)
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
enum LiteralMeta {
    Datatype(Node),
    Language(String),
}

/// An owned RDF node: a string body tagged with a [`NodeKind`].
///
/// Only literals may carry a datatype or a language tag, and never both;
/// the fallible constructors return `None` when that invariant (or another
/// argument check) is violated. Nodes are immutable once built and
/// [`Clone`] makes a deep copy.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Node {
    value: String,
    kind: NodeKind,
    flags: NodeFlags,
    meta: Option<Box<LiteralMeta>>,
}

impl Node {
    fn new(value: impl Into<String>, kind: NodeKind) -> Self {
        let value = value.into();
        let (_, flags) = strlen(&value);
        Self {
            value,
            kind,
            flags,
            meta: None,
        }
    }

    /// Builds a plain string literal.
    pub fn new_string(s: impl Into<String>) -> Self {
        Self::new(s, NodeKind::Literal)
    }

    /// Builds a string literal from at most `max_len` bytes of `s`,
    /// clamped down to a character boundary.
    pub fn new_substring(s: &str, max_len: usize) -> Self {
        let mut end = s.len().min(max_len);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        Self::new_string(&s[..end])
    }

    /// Builds a URI node. The value is not validated: resolution happens
    /// lazily against a base.
    pub fn new_uri(uri: impl Into<String>) -> Self {
        Self::new(uri, NodeKind::Uri)
    }

    /// Builds a CURIE node like `eg:name`.
    pub fn new_curie(curie: impl Into<String>) -> Self {
        Self::new(curie, NodeKind::Curie)
    }

    /// Builds a blank node from a label (without the `_:` sigil).
    pub fn new_blank(label: impl Into<String>) -> Self {
        Self::new(label, NodeKind::Blank)
    }

    /// Builds a variable node from a name (without the `?` sigil).
    pub fn new_variable(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Variable)
    }

    /// Builds a literal with an optional datatype or language tag.
    ///
    /// Returns `None` when both are supplied, when the datatype is not a
    /// URI or CURIE node, or when the language tag is not well-formed.
    pub fn new_literal(
        body: impl Into<String>,
        datatype: Option<Node>,
        language: Option<&str>,
    ) -> Option<Self> {
        let mut node = Self::new(body, NodeKind::Literal);
        match (datatype, language) {
            (Some(_), Some(_)) => return None,
            (Some(datatype), None) => {
                if !matches!(datatype.kind, NodeKind::Uri | NodeKind::Curie) {
                    return None;
                }
                node.meta = Some(Box::new(LiteralMeta::Datatype(datatype)));
            }
            (None, Some(language)) => {
                let tag = LanguageTag::parse(language).ok()?;
                node.meta = Some(Box::new(LiteralMeta::Language(
                    tag.as_str().to_ascii_lowercase(),
                )));
            }
            (None, None) => (),
        }
        Some(node)
    }

    /// Builds a literal with a datatype, which must be a URI or CURIE node.
    pub fn new_typed_literal(body: impl Into<String>, datatype: Node) -> Option<Self> {
        Self::new_literal(body, Some(datatype), None)
    }

    /// Builds a language-tagged literal like `"bonjour"@fr`.
    pub fn new_plain_literal(body: impl Into<String>, language: &str) -> Option<Self> {
        Self::new_literal(body, None, Some(language))
    }

    /// Builds an `xsd:integer` literal in canonical form.
    pub fn new_integer(value: i64) -> Self {
        let mut node = Self::new(value.to_string(), NodeKind::Literal);
        node.meta = Some(Box::new(LiteralMeta::Datatype(Self::new_uri(xsd::INTEGER))));
        node
    }

    /// Builds an `xsd:boolean` literal.
    pub fn new_boolean(value: bool) -> Self {
        let mut node = Self::new(if value { "true" } else { "false" }, NodeKind::Literal);
        node.meta = Some(Box::new(LiteralMeta::Datatype(Self::new_uri(xsd::BOOLEAN))));
        node
    }

    /// Builds an `xsd:decimal` literal with at most `frac_digits` digits
    /// after the point. Trailing zeros are stripped but one digit is always
    /// kept, so zero renders as `0.0`. NaN and ±Inf have no decimal form
    /// and yield `None`.
    pub fn new_decimal(value: f64, frac_digits: u32) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        // f64 carries no more than 17 significant decimal digits
        let frac_digits = frac_digits.min(17);
        let abs = value.abs();
        let mut int_part = abs.trunc();
        let scale = 10_f64.powi(frac_digits as i32);
        let mut scaled = ((abs - int_part) * scale).round();
        if scaled >= scale {
            int_part += 1.0;
            scaled = 0.0;
        }

        let mut body = String::new();
        if value.is_sign_negative() && (int_part != 0.0 || scaled != 0.0) {
            body.push('-');
        }
        let _ = write!(body, "{int_part:.0}.");
        let mut frac = format!("{:0width$}", scaled as u64, width = frac_digits as usize);
        while frac.len() > 1 && frac.ends_with('0') {
            frac.pop();
        }
        if frac.is_empty() {
            frac.push('0');
        }
        body.push_str(&frac);

        let mut node = Self::new(body, NodeKind::Literal);
        node.meta = Some(Box::new(LiteralMeta::Datatype(Self::new_uri(xsd::DECIMAL))));
        Some(node)
    }

    /// Builds an `xsd:base64Binary` literal from raw bytes, breaking the
    /// body into lines when `wrap_lines` is set. Empty input yields `None`.
    pub fn new_blob(data: &[u8], wrap_lines: bool) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        let mut node = Self::new(text::base64_encode(data, wrap_lines), NodeKind::Literal);
        node.meta = Some(Box::new(LiteralMeta::Datatype(Self::new_uri(
            xsd::BASE_64_BINARY,
        ))));
        Some(node)
    }

    /// Builds a `file://` URI node from a filesystem path and an optional
    /// hostname. See [`uri::file_uri_encode`] for the escaping rules.
    pub fn new_file_uri(path: &str, hostname: Option<&str>) -> Self {
        Self::new_uri(uri::file_uri_encode(path, hostname))
    }

    /// Builds a URI node by resolving `reference` against `base`, which
    /// must be an absolute URI node.
    pub fn new_resolved_uri(reference: &str, base: &Self) -> Option<Self> {
        if base.kind != NodeKind::Uri {
            return None;
        }
        Some(Self::new_uri(uri::resolve(reference, &base.value)?))
    }

    /// Builds a URI node holding the shortest reference to `uri` relative
    /// to `base`, never ascending above `root` when one is given.
    pub fn new_relative_uri(uri: &str, base: &Self, root: Option<&Self>) -> Option<Self> {
        if base.kind != NodeKind::Uri || root.is_some_and(|r| r.kind != NodeKind::Uri) {
            return None;
        }
        Some(Self::new_uri(uri::relativize(
            uri,
            &base.value,
            root.map(|r| r.value.as_str()),
        )))
    }

    /// Resolves this URI node against `base`, returning a new node.
    pub fn resolve(&self, base: &Self) -> Option<Self> {
        if self.kind != NodeKind::Uri || base.kind != NodeKind::Uri {
            return None;
        }
        Self::new_resolved_uri(&self.value, base)
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The body length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    #[inline]
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// The datatype of a typed literal.
    pub fn datatype(&self) -> Option<&Node> {
        match self.meta.as_deref() {
            Some(LiteralMeta::Datatype(datatype)) => Some(datatype),
            _ => None,
        }
    }

    /// The language tag of a plain literal, lowercased.
    pub fn language(&self) -> Option<&str> {
        match self.meta.as_deref() {
            Some(LiteralMeta::Language(language)) => Some(language),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::xsd;

    #[test]
    fn string_nodes() {
        let hello = Node::new_string("hello\"");
        assert_eq!(hello.len(), 6);
        assert_eq!(hello.flags(), NodeFlags::HAS_QUOTE);
        assert_eq!(hello.as_str(), "hello\"");
        assert_eq!(hello.kind(), NodeKind::Literal);
        assert!(hello.datatype().is_none());
        assert!(hello.language().is_none());
    }

    #[test]
    fn substring_nodes() {
        let a_b = Node::new_substring("a\"bc", 3);
        assert_eq!(a_b.as_str(), "a\"b");
        assert_eq!(a_b.flags(), NodeFlags::HAS_QUOTE);

        let all = Node::new_substring("a\"bc", 10);
        assert_eq!(all.as_str(), "a\"bc");

        // Clamp must not split a multi-byte character
        let cut = Node::new_substring("5€", 2);
        assert_eq!(cut.as_str(), "5");
    }

    #[test]
    fn strlen_flags() {
        let (len, flags) = strlen("\"5€\"\n");
        assert_eq!(len, 7);
        assert_eq!(flags, NodeFlags::HAS_QUOTE | NodeFlags::HAS_NEWLINE);
        assert!(flags.contains(NodeFlags::HAS_QUOTE));
        assert!(!flags.contains(NodeFlags::HAS_ESCAPE));
    }

    #[test]
    fn blank_nodes() {
        let blank = Node::new_blank("b0");
        assert_eq!(blank.len(), 2);
        assert_eq!(blank.flags(), NodeFlags::empty());
        assert_eq!(blank.as_str(), "b0");
        assert_eq!(blank.kind(), NodeKind::Blank);
    }

    #[test]
    fn node_equality() {
        let lhs = Node::new_string("\u{FFFD}");
        let rhs = Node::new_string("123");
        assert_ne!(lhs, rhs);
        assert_ne!(lhs, Node::new_curie("foo:bar"));
        assert_eq!(lhs.clone(), lhs);
    }

    #[test]
    fn literals() {
        // A literal is not a valid datatype
        assert!(Node::new_typed_literal("bad type", Node::new_string("hello\"")).is_none());
        // Datatype and language are mutually exclusive
        assert!(Node::new_literal(
            "x",
            Some(Node::new_uri("http://example.org/t")),
            Some("en")
        )
        .is_none());
        assert!(Node::new_plain_literal("x", "not a language tag!").is_none());

        let greeting = Node::new_typed_literal("Hallo", Node::new_uri("http://example.org/Greeting"))
            .unwrap();
        assert_eq!(greeting.as_str(), "Hallo");
        assert_eq!(
            greeting.datatype().unwrap().as_str(),
            "http://example.org/Greeting"
        );

        let tagged = Node::new_plain_literal("Hello", "en").unwrap();
        assert_eq!(tagged.language(), Some("en"));
        assert!(tagged.datatype().is_none());

        let plain = Node::new_literal("Plain", None, None).unwrap();
        assert_eq!(plain.as_str(), "Plain");
    }

    #[test]
    fn integers() {
        let cases: [(i64, &str); 6] = [
            (0, "0"),
            (-23, "-23"),
            (23, "23"),
            (-12340, "-12340"),
            (1000, "1000"),
            (-1000, "-1000"),
        ];
        for (value, expected) in cases {
            let node = Node::new_integer(value);
            assert_eq!(node.as_str(), expected);
            assert_eq!(node.datatype().unwrap().as_str(), xsd::INTEGER);
        }
    }

    #[test]
    fn decimals() {
        let cases: [(f64, &str); 8] = [
            (0.0, "0.0"),
            (9.0, "9.0"),
            (10.0, "10.0"),
            (0.01, "0.01"),
            (2.05, "2.05"),
            (-16.00001, "-16.00001"),
            (5.000000005, "5.00000001"),
            (0.0000000001, "0.0"),
        ];
        for (value, expected) in cases {
            let node = Node::new_decimal(value, 8).unwrap();
            assert_eq!(node.as_str(), expected);
            assert_eq!(node.len(), expected.len());
            assert_eq!(node.datatype().unwrap().as_str(), xsd::DECIMAL);
        }
        assert!(Node::new_decimal(f64::NAN, 8).is_none());
        assert!(Node::new_decimal(f64::INFINITY, 8).is_none());
    }

    #[test]
    fn booleans() {
        let node = Node::new_boolean(true);
        assert_eq!(node.as_str(), "true");
        assert_eq!(node.datatype().unwrap().as_str(), xsd::BOOLEAN);
        assert_eq!(Node::new_boolean(false).as_str(), "false");
    }

    #[test]
    fn blobs() {
        assert!(Node::new_blob(&[], true).is_none());

        for size in 1_usize..64 {
            let data: Vec<u8> = (0..size).map(|i| (i * 41 % 256) as u8).collect();
            let blob = Node::new_blob(&data, size % 5 == 0).unwrap();
            let decoded = text::base64_decode(blob.as_str()).unwrap();
            assert_eq!(decoded, data);
            assert_eq!(blob.datatype().unwrap().as_str(), xsd::BASE_64_BINARY);
        }
    }

    #[test]
    fn resolved_uris() {
        let base = Node::new_uri("http://example.org/a/b/c/");
        let not_a_uri = Node::new_string("hello");

        let nil = Node::new_resolved_uri("", &base).unwrap();
        assert_eq!(nil.kind(), NodeKind::Uri);
        assert_eq!(nil.as_str(), base.as_str());
        assert!(Node::new_resolved_uri("", &not_a_uri).is_none());

        let rel = Node::new_relative_uri("http://example.org/a/b/c/foo", &base, None).unwrap();
        assert_eq!(rel.as_str(), "foo");
        let abs = rel.resolve(&base).unwrap();
        assert_eq!(abs.as_str(), "http://example.org/a/b/c/foo");

        assert!(not_a_uri.resolve(&base).is_none());
        assert!(nil.resolve(&not_a_uri).is_none());
    }

    #[test]
    fn relative_uris_honor_the_root() {
        let root = Node::new_uri("http://example.org/a/b/ignored");
        let base = Node::new_uri("http://example.org/a/b/c/");

        let up = Node::new_relative_uri("http://example.org/a/", &base, None).unwrap();
        assert_eq!(up.as_str(), "../../");

        let constrained =
            Node::new_relative_uri("http://example.org/a/", &base, Some(&root)).unwrap();
        assert_eq!(constrained.as_str(), "http://example.org/a/");

        let inside = Node::new_relative_uri("http://example.org/a/b/x", &root, Some(&root)).unwrap();
        assert_eq!(inside.as_str(), "x");
    }

    #[test]
    fn file_uris() {
        let node = Node::new_file_uri("C:/My 100%", None);
        assert_eq!(node.as_str(), "file:///C:/My%20100%%");
        let (path, hostname) = uri::file_uri_decode(node.as_str());
        assert_eq!(path, "C:/My 100%");
        assert!(hostname.is_none());
    }
}
