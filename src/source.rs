//! The pull byte source feeding the reader.

use crate::node::Node;
use crate::status::{Cursor, Status};
use std::io::Read;

/// A buffered byte stream with one byte of lookahead.
///
/// The source reads through an [`io::Read`](std::io::Read) in pages of a
/// configured size (at least one byte). `Ok(0)` from the stream is a
/// *temporary* end of file: it stays sticky until a later
/// [`try_resume`](ByteSource::try_resume) obtains more data, which supports
/// socket-like streams. An I/O error poisons the source permanently.
pub struct ByteSource<R: Read> {
    read: R,
    buf: Vec<u8>,
    head: usize,
    len: usize,
    eof: bool,
    poisoned: bool,
    cursor: Cursor,
}

impl<R: Read> ByteSource<R> {
    /// Wraps `read`, naming the stream `name` for diagnostics.
    /// `page_size` is clamped up to 1; 1 selects byte-wise reading.
    pub fn new(read: R, name: Node, page_size: usize) -> Self {
        Self {
            read,
            buf: vec![0; page_size.max(1)],
            head: 0,
            len: 0,
            eof: false,
            poisoned: false,
            cursor: Cursor::new(name, 1, 1),
        }
    }

    /// The position of the byte [`peek`](ByteSource::peek) returns.
    #[inline]
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// True once the stream has reported end of file (possibly
    /// temporarily).
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof && self.head >= self.len
    }

    fn page(&mut self) -> Result<(), Status> {
        if self.poisoned {
            return Err(Status::BadStream);
        }
        self.head = 0;
        self.len = 0;
        match self.read.read(&mut self.buf) {
            Ok(0) => self.eof = true,
            Ok(n) => {
                self.len = n;
                self.eof = false;
            }
            Err(_) => {
                self.poisoned = true;
                return Err(Status::BadStream);
            }
        }
        Ok(())
    }

    /// The current byte, or `None` at (temporary) end of file.
    pub fn peek(&mut self) -> Result<Option<u8>, Status> {
        if self.poisoned {
            return Err(Status::BadStream);
        }
        if self.head < self.len {
            return Ok(Some(self.buf[self.head]));
        }
        if self.eof {
            return Ok(None);
        }
        self.page()?;
        Ok((self.head < self.len).then(|| self.buf[self.head]))
    }

    /// Consumes the current byte, advancing the cursor.
    pub fn advance(&mut self) -> Result<(), Status> {
        if let Some(byte) = self.peek()? {
            self.cursor.advance(byte);
            self.head += 1;
        }
        Ok(())
    }

    /// At a temporary end of file, polls the stream once more and clears
    /// the EOF state if data arrived. Returns whether a byte is available.
    pub fn try_resume(&mut self) -> Result<bool, Status> {
        if self.head < self.len {
            return Ok(true);
        }
        if self.eof {
            self.eof = false;
        }
        self.page()?;
        Ok(self.head < self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Serves one byte at a time, reporting EOF between the two halves.
    struct Intermittent {
        data: &'static [u8],
        pos: usize,
        stalled: bool,
    }

    impl Read for Intermittent {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos == self.data.len() / 2 && !self.stalled {
                self.stalled = true;
                return Ok(0);
            }
            if self.pos == self.data.len() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    fn name() -> Node {
        Node::new_uri("file:///test")
    }

    #[test]
    fn peek_does_not_consume() {
        let mut source = ByteSource::new(&b"ab"[..], name(), 4096);
        assert_eq!(source.peek().unwrap(), Some(b'a'));
        assert_eq!(source.peek().unwrap(), Some(b'a'));
        source.advance().unwrap();
        assert_eq!(source.peek().unwrap(), Some(b'b'));
        source.advance().unwrap();
        assert_eq!(source.peek().unwrap(), None);
        assert!(source.is_eof());
    }

    #[test]
    fn cursor_tracks_lines_and_columns() {
        let mut source = ByteSource::new(&b"a\nbc"[..], name(), 2);
        assert_eq!((source.cursor().line(), source.cursor().column()), (1, 1));
        source.advance().unwrap(); // a
        assert_eq!((source.cursor().line(), source.cursor().column()), (1, 2));
        source.advance().unwrap(); // \n
        assert_eq!((source.cursor().line(), source.cursor().column()), (2, 1));
        source.peek().unwrap();
        source.advance().unwrap(); // b
        assert_eq!((source.cursor().line(), source.cursor().column()), (2, 2));
    }

    #[test]
    fn temporary_eof_resumes() {
        let mut source = ByteSource::new(
            Intermittent {
                data: b"abcd",
                pos: 0,
                stalled: false,
            },
            name(),
            1,
        );
        source.advance().unwrap();
        source.advance().unwrap();
        // The stream stalls half way
        assert_eq!(source.peek().unwrap(), None);
        assert!(source.is_eof());
        // …but serves the rest after a resume
        assert!(source.try_resume().unwrap());
        assert_eq!(source.peek().unwrap(), Some(b'c'));
        source.advance().unwrap();
        source.advance().unwrap();
        assert_eq!(source.peek().unwrap(), None);
        assert!(!source.try_resume().unwrap());
    }

    #[test]
    fn io_errors_poison_the_source() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "boom"))
            }
        }

        let mut source = ByteSource::new(Broken, name(), 16);
        assert_eq!(source.peek(), Err(Status::BadStream));
        assert_eq!(source.peek(), Err(Status::BadStream));
        assert_eq!(source.try_resume(), Err(Status::BadStream));
    }
}
