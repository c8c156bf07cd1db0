#![doc = include_str!("../README.md")]
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_qualifications
)]

mod env;
mod node;
mod reader;
mod sink;
mod source;
mod statement;
mod status;
mod text;
mod uri;
pub mod vocab;
mod world;
mod writer;

pub use crate::env::Env;
pub use crate::node::{strlen, Node, NodeFlags, NodeKind};
pub use crate::reader::Reader;
pub use crate::sink::Sink;
pub use crate::source::ByteSource;
pub use crate::statement::{Statement, StatementFlags};
pub use crate::status::{Cursor, Error, Status};
pub use crate::text::{base64_decode, base64_decoded_size, base64_encode, strtod};
pub use crate::uri::{file_uri_decode, file_uri_encode, parse_uri, relativize, resolve, UriParts};
pub use crate::world::World;
pub use crate::writer::Writer;

/// The concrete grammars of the Turtle family.
///
/// The discriminants are stable and may be exchanged with hosts in other
/// languages.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Syntax {
    /// [Turtle](https://www.w3.org/TR/turtle/).
    Turtle = 1,
    /// [N-Triples](https://www.w3.org/TR/n-triples/), one triple per line.
    NTriples = 2,
    /// [N-Quads](https://www.w3.org/TR/n-quads/), N-Triples plus graphs.
    NQuads = 3,
    /// [TriG](https://www.w3.org/TR/trig/), Turtle plus graph blocks.
    Trig = 4,
}

impl Syntax {
    /// True for the syntaxes with directives, prefixed names and
    /// abbreviated statement forms.
    #[inline]
    pub fn is_abbreviated(self) -> bool {
        matches!(self, Self::Turtle | Self::Trig)
    }

    /// True for the syntaxes that can name graphs.
    #[inline]
    pub fn has_graphs(self) -> bool {
        matches!(self, Self::NQuads | Self::Trig)
    }
}
