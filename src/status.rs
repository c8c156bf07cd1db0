use crate::node::Node;
use std::fmt;

/// A status code returned by most operations.
///
/// The discriminants are stable and may be exchanged with hosts in other
/// languages. [`Status::Success`] and [`Status::Failure`] are not errors:
/// `Failure` reports a non-fatal outcome such as a chunk terminator or an
/// unbound prefix lookup.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, thiserror::Error)]
pub enum Status {
    /// Operation completed successfully.
    #[error("Success")]
    Success = 0,
    /// Non-fatal failure (not found, end of data, chunk terminator).
    #[error("Non-fatal failure")]
    Failure = 1,
    #[error("Unknown error")]
    Unknown = 2,
    #[error("Invalid syntax")]
    BadSyntax = 3,
    #[error("Invalid argument")]
    BadArg = 4,
    #[error("Invalid IRI")]
    BadIri = 5,
    #[error("Not found")]
    NotFound = 6,
    #[error("Blank node ID clash")]
    IdClash = 7,
    #[error("Invalid CURIE")]
    BadCurie = 8,
    #[error("Internal error")]
    Internal = 9,
    #[error("Stack overflow")]
    Overflow = 10,
    #[error("Invalid text encoding")]
    BadText = 11,
    #[error("Unexpected end of input")]
    NoData = 12,
    #[error("Error reading from stream")]
    BadStream = 13,
}

impl Status {
    /// True for every status except [`Status::Success`] and [`Status::Failure`].
    #[inline]
    pub fn is_error(self) -> bool {
        self as u8 > Self::Failure as u8
    }
}

impl From<Result<(), Status>> for Status {
    #[inline]
    fn from(result: Result<(), Status>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(status) => status,
        }
    }
}

/// A position in a document: the file (or stream name) node plus a `line`
/// and `column`, both starting from 1.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Cursor {
    file: Node,
    line: u32,
    col: u32,
}

impl Cursor {
    #[inline]
    pub fn new(file: Node, line: u32, col: u32) -> Self {
        Self { file, line, col }
    }

    /// The node naming the document, usually a file URI.
    #[inline]
    pub fn file(&self) -> &Node {
        &self.file
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    pub fn column(&self) -> u32 {
        self.col
    }

    pub(crate) fn advance(&mut self, byte: u8) {
        if byte == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.as_str(), self.line, self.col)
    }
}

/// An error report routed through the world's error sink.
///
/// It is composed of a status code, the cursor where the error was detected
/// (when one is available) and a message.
#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    status: Status,
    cursor: Option<Cursor>,
    message: String,
}

impl Error {
    pub(crate) fn new(status: Status, cursor: Option<Cursor>, message: impl Into<String>) -> Self {
        Self {
            status,
            cursor,
            message: message.into(),
        }
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// The position of the error inside the document, if known.
    #[inline]
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cursor) = &self.cursor {
            write!(f, "{cursor}: {}", self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_discriminants() {
        assert_eq!(Status::Success as u8, 0);
        assert_eq!(Status::Failure as u8, 1);
        assert_eq!(Status::BadSyntax as u8, 3);
        assert_eq!(Status::BadStream as u8, 13);
    }

    #[test]
    fn strerror_messages_are_distinct() {
        let all = [
            Status::Failure,
            Status::Unknown,
            Status::BadSyntax,
            Status::BadArg,
            Status::BadIri,
            Status::NotFound,
            Status::IdClash,
            Status::BadCurie,
            Status::Internal,
            Status::Overflow,
            Status::BadText,
            Status::NoData,
            Status::BadStream,
        ];
        for status in all {
            assert_ne!(status.to_string(), "Success");
            assert!(status != Status::Success);
        }
        assert_eq!(Status::Success.to_string(), "Success");
    }
}
