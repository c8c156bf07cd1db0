//! The streaming reader: a recursive-descent parser for the Turtle family
//! of grammars, driven by one byte of lookahead and emitting events into a
//! [`Sink`].

use crate::env::Env;
use crate::node::Node;
use crate::sink::Sink;
use crate::source::ByteSource;
use crate::statement::{Statement, StatementFlags};
use crate::status::Status;
use crate::vocab::{rdf, xsd};
use crate::world::World;
use crate::Syntax;
use std::collections::HashMap;
use std::io::Read;
use std::mem;

type ReadResult<T> = Result<T, Status>;

/// Reads a document in one of the [`Syntax`]es, pushing events into a
/// [`Sink`].
///
/// The reader owns its [`Env`]: `@prefix` and `@base` directives update it
/// and all later CURIEs and relative URIs are expanded through it, so the
/// sink observes resolved URIs.
pub struct Reader<'w, R: Read, S: Sink> {
    world: &'w World,
    source: ByteSource<R>,
    sink: S,
    syntax: Syntax,
    env: Env,
    next_id: u32,
    blank_prefix: String,
    labels: HashMap<String, String>,
    pending_dots: u32,
    status: Status,
    abort: Option<Status>,
}

impl<'w, R: Read, S: Sink> Reader<'w, R, S> {
    pub fn new(world: &'w World, syntax: Syntax, sink: S, source: ByteSource<R>) -> Self {
        Self {
            world,
            source,
            sink,
            syntax,
            env: Env::new(),
            next_id: 0,
            blank_prefix: String::new(),
            labels: HashMap::new(),
            pending_dots: 0,
            status: Status::Success,
            abort: None,
        }
    }

    /// Sets a prefix prepended to every blank node identifier, so that
    /// several documents can be merged into one graph without clashes.
    pub fn add_blank_prefix(&mut self, prefix: impl Into<String>) {
        self.blank_prefix = prefix.into();
    }

    /// The environment accumulated from the directives read so far.
    #[inline]
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Returns the sink, consuming the reader.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Reads the whole document, recovering from syntax errors by skipping
    /// to the next statement. Returns the first error reported, or
    /// `Success`; sink and stream errors abort immediately.
    pub fn read_document(&mut self) -> Status {
        if self.status.is_error() {
            return self.status;
        }
        let mut first_error = Status::Success;
        loop {
            match self.read_top() {
                Ok(()) => (),
                Err(Status::Failure) => {
                    if self.source.is_eof() {
                        break;
                    }
                }
                Err(st) => {
                    if self.status.is_error() {
                        return self.status;
                    }
                    if let Some(st) = self.abort.take() {
                        return st;
                    }
                    if first_error == Status::Success {
                        first_error = st;
                    }
                    if self.source.is_eof() {
                        break;
                    }
                }
            }
        }
        first_error
    }

    /// Reads up to the next statement boundary.
    ///
    /// Returns `Success` after a statement or directive was consumed, and
    /// `Failure` on a top-level null byte (a framing terminator: the next
    /// call may resume) or at end of input. A temporary end of file also
    /// yields `Failure` until the stream serves more data.
    pub fn read_chunk(&mut self) -> Status {
        if self.status.is_error() {
            return self.status;
        }
        match self.read_top() {
            Ok(()) => Status::Success,
            Err(st) => {
                self.abort = None;
                st
            }
        }
    }

    fn read_top(&mut self) -> ReadResult<()> {
        loop {
            self.skip_ws()?;
            let Some(byte) = self.peek()? else {
                if self.try_resume()? {
                    continue;
                }
                return Err(Status::Failure);
            };
            return match byte {
                0 => {
                    self.advance()?;
                    Err(Status::Failure)
                }
                _ if matches!(self.syntax, Syntax::NTriples | Syntax::NQuads) => {
                    self.read_line_statement()
                }
                b'@' => self.read_at_directive(),
                b'{' if self.syntax == Syntax::Trig => self.read_graph_block(None),
                _ => self.read_turtle_statement(),
            };
        }
    }

    // Byte plumbing

    fn peek(&mut self) -> ReadResult<Option<u8>> {
        self.source.peek().map_err(|st| self.stream_error(st))
    }

    fn advance(&mut self) -> ReadResult<()> {
        self.source.advance().map_err(|st| self.stream_error(st))
    }

    fn eat(&mut self) -> ReadResult<Option<u8>> {
        let byte = self.peek()?;
        self.advance()?;
        Ok(byte)
    }

    fn try_resume(&mut self) -> ReadResult<bool> {
        self.source.try_resume().map_err(|st| self.stream_error(st))
    }

    fn stream_error(&mut self, status: Status) -> Status {
        self.status = status;
        self.world
            .error(status, Some(self.source.cursor()), "error reading from stream")
    }

    fn eat_expecting(&mut self, byte: u8, what: &str) -> ReadResult<()> {
        match self.peek()? {
            Some(b) if b == byte => self.advance(),
            _ => Err(self.syntax_error(&format!("expected `{}`{what}", char::from(byte)))),
        }
    }

    fn skip_ws(&mut self) -> ReadResult<()> {
        loop {
            match self.peek()? {
                Some(b' ' | b'\t' | b'\r' | b'\n') => self.advance()?,
                Some(b'#') => {
                    while !matches!(self.peek()?, None | Some(b'\n' | b'\r')) {
                        self.advance()?;
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Reports an unexpected end of input.
    fn no_data_error(&mut self, message: &str) -> Status {
        self.world
            .error(Status::NoData, Some(self.source.cursor()), message)
    }

    /// Reports a recoverable syntax error and skips to the next likely
    /// statement boundary.
    fn syntax_error(&mut self, message: &str) -> Status {
        let status = self
            .world
            .error(Status::BadSyntax, Some(self.source.cursor()), message);
        let _ = self.recover();
        status
    }

    fn recover(&mut self) -> ReadResult<()> {
        self.pending_dots = 0;
        loop {
            match self.peek()? {
                None => return Ok(()),
                Some(b'.' | b'\n') => {
                    self.advance()?;
                    return Ok(());
                }
                _ => self.advance()?,
            }
        }
    }

    fn expect_dot(&mut self, in_graph: bool) -> ReadResult<()> {
        if self.pending_dots > 0 {
            self.pending_dots -= 1;
            return Ok(());
        }
        self.skip_ws()?;
        match self.peek()? {
            Some(b'.') => self.advance(),
            Some(b'}') if in_graph => Ok(()),
            _ => Err(self.syntax_error("expected `.` at end of statement")),
        }
    }

    // Event emission. Sink errors abort the current operation.

    fn emit_statement(
        &mut self,
        flags: StatementFlags,
        subject: Node,
        predicate: Node,
        object: Node,
        graph: Option<&Node>,
    ) -> ReadResult<()> {
        let statement = Statement::new(subject, predicate, object)
            .with_graph(graph.cloned())
            .with_cursor(Some(self.source.cursor().clone()));
        self.sink.statement(flags, &statement).map_err(|st| {
            self.abort = Some(st);
            st
        })
    }

    fn emit_end(&mut self, node: &Node) -> ReadResult<()> {
        self.sink.end(node).map_err(|st| {
            self.abort = Some(st);
            st
        })
    }

    // Directives

    fn read_at_directive(&mut self) -> ReadResult<()> {
        self.advance()?; // @
        let word = self.read_bare_word()?;
        if word.eq_ignore_ascii_case("prefix") {
            self.read_prefix_directive(true)
        } else if word.eq_ignore_ascii_case("base") {
            self.read_base_directive(true)
        } else {
            Err(self.syntax_error(&format!("unknown directive `@{word}`")))
        }
    }

    fn read_prefix_directive(&mut self, at_form: bool) -> ReadResult<()> {
        self.skip_ws()?;
        let name = self.read_bare_word()?;
        self.eat_expecting(b':', " after prefix name")?;
        self.skip_ws()?;
        let uri = self.read_iri()?;
        if at_form {
            self.expect_dot(false)?;
        }
        let name = Node::new_curie(name);
        if let Err(st) = self.env.set_prefix(&name, &uri) {
            return Err(self.world.error(
                st,
                Some(self.source.cursor()),
                "invalid prefix binding",
            ));
        }
        self.sink.prefix(&name, &uri).map_err(|st| {
            self.abort = Some(st);
            st
        })
    }

    fn read_base_directive(&mut self, at_form: bool) -> ReadResult<()> {
        self.skip_ws()?;
        let uri = self.read_iri()?;
        if at_form {
            self.expect_dot(false)?;
        }
        if let Err(st) = self.env.set_base(&uri) {
            return Err(self
                .world
                .error(st, Some(self.source.cursor()), "base URI is not absolute"));
        }
        self.sink.base(&uri).map_err(|st| {
            self.abort = Some(st);
            st
        })
    }

    // Turtle and TriG statements

    fn read_turtle_statement(&mut self) -> ReadResult<()> {
        self.read_triples(None, false)
    }

    fn read_triples(&mut self, graph: Option<&Node>, in_graph: bool) -> ReadResult<()> {
        match self.peek()? {
            Some(b'[') => {
                let (node, first_flags) = self.read_anon_subject(graph)?;
                self.skip_ws()?;
                if !matches!(self.peek()?, Some(b'.' | b'}')) {
                    self.read_predicate_object_list(&node, graph, first_flags)?;
                } else if first_flags.contains(StatementFlags::EMPTY_S) {
                    return Err(self.syntax_error("`[]` needs a predicate and an object"));
                }
                self.expect_dot(in_graph)
            }
            Some(b'(') => {
                let subject = self.read_subject_collection(graph)?;
                self.read_predicate_object_list(&subject, graph, StatementFlags::empty())?;
                self.expect_dot(in_graph)
            }
            Some(b'<') | Some(b'_') => {
                let subject = self.read_term(TermPos::Subject)?;
                if self.syntax == Syntax::Trig && graph.is_none() {
                    self.skip_ws()?;
                    if self.peek()? == Some(b'{') {
                        return self.read_graph_block(Some(subject));
                    }
                }
                self.read_predicate_object_list(&subject, graph, StatementFlags::empty())?;
                self.expect_dot(in_graph)
            }
            _ => {
                let word = self.read_bare_word()?;
                if self.peek()? == Some(b':') {
                    let subject = self.read_pname_after(word)?;
                    if self.syntax == Syntax::Trig && graph.is_none() {
                        self.skip_ws()?;
                        if self.peek()? == Some(b'{') {
                            return self.read_graph_block(Some(subject));
                        }
                    }
                    self.read_predicate_object_list(&subject, graph, StatementFlags::empty())?;
                    return self.expect_dot(in_graph);
                }
                // SPARQL-style directives have no terminating dot
                if graph.is_none() && word.eq_ignore_ascii_case("prefix") {
                    self.read_prefix_directive(false)
                } else if graph.is_none() && word.eq_ignore_ascii_case("base") {
                    self.read_base_directive(false)
                } else if self.syntax == Syntax::Trig
                    && graph.is_none()
                    && word.eq_ignore_ascii_case("graph")
                {
                    self.skip_ws()?;
                    let label = self.read_term(TermPos::Graph)?;
                    self.skip_ws()?;
                    self.read_graph_block(Some(label))
                } else {
                    Err(self.syntax_error(&format!("`{word}` is not a valid subject")))
                }
            }
        }
    }

    fn read_graph_block(&mut self, label: Option<Node>) -> ReadResult<()> {
        let graph = label;
        self.eat_expecting(b'{', " to open a graph block")?;
        loop {
            self.skip_ws()?;
            match self.peek()? {
                Some(b'}') => {
                    self.advance()?;
                    return Ok(());
                }
                None => return Err(self.no_data_error("unclosed graph block")),
                _ => self.read_triples(graph.as_ref(), true)?,
            }
        }
    }

    fn read_predicate_object_list(
        &mut self,
        subject: &Node,
        graph: Option<&Node>,
        first_flags: StatementFlags,
    ) -> ReadResult<()> {
        let mut flags = first_flags;
        loop {
            self.skip_ws()?;
            let predicate = self.read_verb()?;
            self.read_object_list(subject, &predicate, graph, &mut flags)?;
            self.skip_ws()?;
            if self.peek()? != Some(b';') || self.pending_dots > 0 {
                return Ok(());
            }
            while self.peek()? == Some(b';') {
                self.advance()?;
                self.skip_ws()?;
            }
            if matches!(self.peek()?, Some(b'.' | b']' | b'}') | None) {
                return Ok(());
            }
        }
    }

    fn read_object_list(
        &mut self,
        subject: &Node,
        predicate: &Node,
        graph: Option<&Node>,
        flags: &mut StatementFlags,
    ) -> ReadResult<()> {
        loop {
            self.skip_ws()?;
            self.read_object(subject, predicate, graph, mem::take(flags))?;
            self.skip_ws()?;
            if self.peek()? != Some(b',') || self.pending_dots > 0 {
                return Ok(());
            }
            self.advance()?;
        }
    }

    fn read_verb(&mut self) -> ReadResult<Node> {
        if self.peek()? == Some(b'<') {
            return self.read_iri();
        }
        let word = self.read_bare_word()?;
        if self.peek()? == Some(b':') {
            return self.read_pname_after(word);
        }
        if word == "a" {
            Ok(Node::new_uri(rdf::TYPE))
        } else {
            Err(self.syntax_error(&format!("`{word}` is not a valid predicate")))
        }
    }

    fn read_object(
        &mut self,
        subject: &Node,
        predicate: &Node,
        graph: Option<&Node>,
        flags: StatementFlags,
    ) -> ReadResult<()> {
        let object = match self.peek()? {
            Some(b'<') => self.read_iri()?,
            Some(b'_') => self.read_blank_label()?,
            Some(b'"' | b'\'') => self.read_literal()?,
            Some(b'[') => {
                self.advance()?;
                self.skip_ws()?;
                let node = self.genid();
                if self.peek()? == Some(b']') {
                    self.advance()?;
                    return self.emit_statement(
                        flags | StatementFlags::EMPTY_O,
                        subject.clone(),
                        predicate.clone(),
                        node,
                        graph,
                    );
                }
                self.emit_statement(
                    flags | StatementFlags::ANON_O,
                    subject.clone(),
                    predicate.clone(),
                    node.clone(),
                    graph,
                )?;
                self.read_predicate_object_list(&node, graph, StatementFlags::empty())?;
                self.skip_ws()?;
                self.eat_expecting(b']', " to close a blank node")?;
                return self.emit_end(&node);
            }
            Some(b'(') => {
                self.advance()?;
                self.skip_ws()?;
                if self.peek()? == Some(b')') {
                    self.advance()?;
                    Node::new_uri(rdf::NIL)
                } else {
                    let head = self.genid();
                    self.emit_statement(
                        flags | StatementFlags::LIST_O,
                        subject.clone(),
                        predicate.clone(),
                        head.clone(),
                        graph,
                    )?;
                    return self.read_collection_items(head, graph, StatementFlags::empty());
                }
            }
            Some(b) if b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.') => {
                self.read_number()?
            }
            Some(_) => {
                let word = self.read_bare_word()?;
                if self.peek()? == Some(b':') {
                    self.read_pname_after(word)?
                } else if word == "true" || word == "false" {
                    Node::new_typed_literal(word, Node::new_uri(xsd::BOOLEAN))
                        .expect("xsd:boolean is a valid datatype")
                } else {
                    return Err(
                        self.syntax_error(&format!("`{word}` is not a valid object"))
                    );
                }
            }
            None => return Err(self.no_data_error("unexpected end of input in object")),
        };
        self.emit_statement(flags, subject.clone(), predicate.clone(), object, graph)
    }

    /// Reads `[ … ]` or `[]` in subject position. Statements inside the
    /// brackets are emitted here; the returned flags belong on the first
    /// statement *about* the node.
    fn read_anon_subject(&mut self, graph: Option<&Node>) -> ReadResult<(Node, StatementFlags)> {
        self.advance()?; // [
        self.skip_ws()?;
        let node = self.genid();
        if self.peek()? == Some(b']') {
            self.advance()?;
            return Ok((node, StatementFlags::EMPTY_S));
        }
        self.read_predicate_object_list(&node, graph, StatementFlags::ANON_S)?;
        self.skip_ws()?;
        self.eat_expecting(b']', " to close a blank node")?;
        self.emit_end(&node)?;
        Ok((node, StatementFlags::empty()))
    }

    /// Reads `( … )` in subject position, expanding it to `rdf:first` /
    /// `rdf:rest` statements, and returns the head of the list.
    fn read_subject_collection(&mut self, graph: Option<&Node>) -> ReadResult<Node> {
        self.advance()?; // (
        self.skip_ws()?;
        if self.peek()? == Some(b')') {
            self.advance()?;
            return Ok(Node::new_uri(rdf::NIL));
        }
        let head = self.genid();
        self.read_collection_items(head.clone(), graph, StatementFlags::LIST_S)?;
        Ok(head)
    }

    fn read_collection_items(
        &mut self,
        head: Node,
        graph: Option<&Node>,
        first_flags: StatementFlags,
    ) -> ReadResult<()> {
        let first = Node::new_uri(rdf::FIRST);
        let rest = Node::new_uri(rdf::REST);
        let mut current = head;
        let mut flags = first_flags;
        loop {
            self.skip_ws()?;
            self.read_object(&current, &first, graph, mem::take(&mut flags))?;
            self.skip_ws()?;
            if self.peek()? == Some(b')') {
                self.advance()?;
                return self.emit_statement(
                    StatementFlags::empty(),
                    current,
                    rest,
                    Node::new_uri(rdf::NIL),
                    graph,
                );
            }
            let next = self.genid();
            self.emit_statement(
                StatementFlags::empty(),
                current,
                rest.clone(),
                next.clone(),
                graph,
            )?;
            current = next;
        }
    }

    // NTriples and NQuads

    fn read_line_statement(&mut self) -> ReadResult<()> {
        let subject = self.read_term(TermPos::Subject)?;
        self.skip_ws()?;
        let predicate = self.read_iri()?;
        self.skip_ws()?;
        let object = match self.peek()? {
            Some(b'<') => self.read_iri()?,
            Some(b'_') => self.read_blank_label()?,
            Some(b'"') => self.read_literal()?,
            _ => return Err(self.syntax_error("expected an IRI, blank node or literal")),
        };
        let graph = if self.syntax == Syntax::NQuads {
            self.skip_ws()?;
            match self.peek()? {
                Some(b'<') => Some(self.read_iri()?),
                Some(b'_') => Some(self.read_blank_label()?),
                _ => None,
            }
        } else {
            None
        };
        self.expect_dot(false)?;
        self.emit_statement(
            StatementFlags::empty(),
            subject,
            predicate,
            object,
            graph.as_ref(),
        )
    }

    // Terms

    fn read_term(&mut self, pos: TermPos) -> ReadResult<Node> {
        match self.peek()? {
            Some(b'<') => self.read_iri(),
            Some(b'_') => self.read_blank_label(),
            Some(_) if self.syntax.is_abbreviated() => {
                let word = self.read_bare_word()?;
                if self.peek()? == Some(b':') {
                    self.read_pname_after(word)
                } else {
                    Err(self.syntax_error(&format!(
                        ": `{word}` is not a valid {}",
                        pos.what()
                    )))
                }
            }
            _ => Err(self.syntax_error(&format!("expected a {}", pos.what()))),
        }
    }

    /// Reads `<…>`, decoding `\u`/`\U` escapes, and resolves the result
    /// against the current base URI when it is relative.
    fn read_iri(&mut self) -> ReadResult<Node> {
        self.eat_expecting(b'<', " to open an IRI")?;
        let mut value = String::new();
        loop {
            match self.eat()? {
                None => return Err(self.no_data_error("unclosed IRI")),
                Some(b'>') => break,
                Some(b'\\') => match self.eat()? {
                    Some(b'u') => self.read_unicode_escape(4, &mut value)?,
                    Some(b'U') => self.read_unicode_escape(8, &mut value)?,
                    _ => return Err(self.syntax_error("invalid IRI escape")),
                },
                Some(b) if b <= b' ' => {
                    return Err(self.syntax_error(&format!(
                        "control character U+{:04X} in IRI",
                        b as u32
                    )))
                }
                Some(b) if b.is_ascii() => value.push(char::from(b)),
                Some(b) => self.read_utf8_rest(b, &mut value)?,
            }
        }
        if let Some(base) = self.env.base() {
            if !crate::uri::parse_uri(&value).is_absolute() {
                if let Some(resolved) = crate::uri::resolve(&value, base.as_str()) {
                    return Ok(Node::new_uri(resolved));
                }
            }
        }
        Ok(Node::new_uri(value))
    }

    /// Reads the leading run of name characters: a keyword or the prefix
    /// part of a prefixed name (the caller checks for `:`). May be empty.
    fn read_bare_word(&mut self) -> ReadResult<String> {
        let mut word = String::new();
        loop {
            match self.peek()? {
                Some(b) if b.is_ascii() => {
                    let c = char::from(b);
                    let ok = if word.is_empty() {
                        is_pn_chars_base(c)
                    } else {
                        is_pn_chars(c) || c == '.'
                    };
                    if !ok {
                        break;
                    }
                    self.advance()?;
                    word.push(c);
                }
                Some(b) => {
                    self.advance()?;
                    let c = self.read_utf8_char(b)?;
                    let ok = if word.is_empty() {
                        is_pn_chars_base(c)
                    } else {
                        is_pn_chars(c)
                    };
                    if !ok {
                        return Err(
                            self.syntax_error(&format!("`{c}` is not allowed in names"))
                        );
                    }
                    word.push(c);
                }
                None => break,
            }
        }
        while word.ends_with('.') {
            word.pop();
            self.pending_dots += 1;
        }
        Ok(word)
    }

    /// Finishes a prefixed name whose prefix was already read, expanding
    /// it through the environment.
    fn read_pname_after(&mut self, prefix: String) -> ReadResult<Node> {
        self.advance()?; // :
        let local = self.read_pn_local()?;
        let Some(bound) = self.env.prefix_value(&prefix) else {
            let status = self.world.error(
                Status::BadCurie,
                Some(self.source.cursor()),
                format!("undefined prefix `{prefix}:`"),
            );
            let _ = self.recover();
            return Err(status);
        };
        Ok(Node::new_uri(format!("{}{local}", bound.as_str())))
    }

    fn read_pn_local(&mut self) -> ReadResult<String> {
        let mut local = String::new();
        loop {
            match self.peek()? {
                Some(b'%') => {
                    self.advance()?;
                    let mut escape = String::from("%");
                    for _ in 0..2 {
                        match self.eat()? {
                            Some(b) if b.is_ascii_hexdigit() => escape.push(char::from(b)),
                            _ => {
                                return Err(self.syntax_error(
                                    "`%` escapes need two hexadecimal digits",
                                ))
                            }
                        }
                    }
                    local.push_str(&escape);
                }
                Some(b'\\') => {
                    self.advance()?;
                    match self.eat()? {
                        Some(b) if is_local_escape(b) => local.push(char::from(b)),
                        _ => return Err(self.syntax_error("invalid local name escape")),
                    }
                }
                Some(b) if b.is_ascii() => {
                    let c = char::from(b);
                    if !(is_pn_chars(c) || c == ':' || c == '.' || (local.is_empty() && c.is_ascii_digit()))
                    {
                        break;
                    }
                    self.advance()?;
                    local.push(c);
                }
                Some(b) => {
                    self.advance()?;
                    let c = self.read_utf8_char(b)?;
                    if !is_pn_chars(c) {
                        return Err(
                            self.syntax_error(&format!("`{c}` is not allowed in names"))
                        );
                    }
                    local.push(c);
                }
                None => break,
            }
        }
        while local.ends_with('.') {
            local.pop();
            self.pending_dots += 1;
        }
        Ok(local)
    }

    /// Reads `_:label`, applying the blank prefix and remapping labels
    /// that would clash with generated identifiers.
    fn read_blank_label(&mut self) -> ReadResult<Node> {
        self.advance()?; // _
        self.eat_expecting(b':', " after `_` in a blank node label")?;
        let mut label = String::new();
        loop {
            match self.peek()? {
                Some(b) if b.is_ascii() => {
                    let c = char::from(b);
                    let ok = if label.is_empty() {
                        is_pn_chars_u(c) || c.is_ascii_digit()
                    } else {
                        is_pn_chars(c) || c == '.'
                    };
                    if !ok {
                        break;
                    }
                    self.advance()?;
                    label.push(c);
                }
                Some(b) => {
                    self.advance()?;
                    let c = self.read_utf8_char(b)?;
                    if !is_pn_chars(c) {
                        return Err(
                            self.syntax_error(&format!("`{c}` is not allowed in names"))
                        );
                    }
                    label.push(c);
                }
                None => break,
            }
        }
        while label.ends_with('.') {
            label.pop();
            self.pending_dots += 1;
        }
        if label.is_empty() {
            return Err(self.syntax_error("blank node labels must not be empty"));
        }
        Ok(self.map_blank_label(&label))
    }

    fn map_blank_label(&mut self, label: &str) -> Node {
        if let Some(mapped) = self.labels.get(label) {
            return Node::new_blank(mapped.clone());
        }
        let mapped = if clashes_with_genid(label) {
            self.next_id += 1;
            format!("{}b{}", self.blank_prefix, self.next_id)
        } else {
            format!("{}{label}", self.blank_prefix)
        };
        self.labels.insert(label.to_owned(), mapped.clone());
        Node::new_blank(mapped)
    }

    fn genid(&mut self) -> Node {
        self.next_id += 1;
        Node::new_blank(format!("{}b{}", self.blank_prefix, self.next_id))
    }

    // Literals

    fn read_literal(&mut self) -> ReadResult<Node> {
        let Some(quote) = self.eat()? else {
            return Err(self.syntax_error("expected a string"));
        };
        if quote == b'\'' && !self.syntax.is_abbreviated() {
            return Err(self.syntax_error("single quotes are not allowed here"));
        }
        let body = self.read_string_body(quote)?;
        match self.peek()? {
            Some(b'@') => {
                self.advance()?;
                let mut tag = String::new();
                while let Some(b) = self.peek()? {
                    if b.is_ascii_alphanumeric() || b == b'-' {
                        self.advance()?;
                        tag.push(char::from(b));
                    } else {
                        break;
                    }
                }
                Node::new_plain_literal(body, &tag)
                    .ok_or_else(|| self.syntax_error(&format!("invalid language tag `{tag}`")))
            }
            Some(b'^') => {
                self.advance()?;
                self.eat_expecting(b'^', " in `^^` before a datatype")?;
                self.skip_ws()?;
                let datatype = match self.peek()? {
                    Some(b'<') => self.read_iri()?,
                    _ if self.syntax.is_abbreviated() => {
                        let word = self.read_bare_word()?;
                        if self.peek()? == Some(b':') {
                            self.read_pname_after(word)?
                        } else {
                            return Err(self.syntax_error("expected a datatype IRI"));
                        }
                    }
                    _ => return Err(self.syntax_error("expected a datatype IRI")),
                };
                if datatype.as_str() == rdf::LANG_STRING {
                    return Err(self.world.error(
                        Status::BadArg,
                        Some(self.source.cursor()),
                        "literals without a language cannot be rdf:langString",
                    ));
                }
                Node::new_typed_literal(body, datatype)
                    .ok_or_else(|| self.syntax_error("invalid datatype"))
            }
            _ => Ok(Node::new_string(body)),
        }
    }

    fn read_string_body(&mut self, quote: u8) -> ReadResult<String> {
        let mut body = String::new();
        // Empty string, or the opening of a long string
        if self.peek()? == Some(quote) {
            self.advance()?;
            if self.peek()? != Some(quote) {
                return Ok(body);
            }
            self.advance()?;
            if !self.syntax.is_abbreviated() {
                return Err(self.syntax_error("long strings are not allowed here"));
            }
            return self.read_long_string_body(quote);
        }
        loop {
            match self.eat()? {
                None => return Err(self.no_data_error("unclosed string")),
                Some(b) if b == quote => return Ok(body),
                Some(b'\\') => self.read_string_escape(&mut body)?,
                Some(b'\n' | b'\r') => {
                    return Err(self.syntax_error("line end in single-line string"))
                }
                Some(b) if b.is_ascii() => body.push(char::from(b)),
                Some(b) => self.read_utf8_rest(b, &mut body)?,
            }
        }
    }

    fn read_long_string_body(&mut self, quote: u8) -> ReadResult<String> {
        let mut body = String::new();
        loop {
            match self.eat()? {
                None => return Err(self.no_data_error("unclosed long string")),
                Some(b) if b == quote => {
                    // Count the quote run: three or more end the string,
                    // with any surplus belonging to the body
                    let mut run = 1;
                    while self.peek()? == Some(quote) {
                        self.advance()?;
                        run += 1;
                    }
                    if run >= 3 {
                        for _ in 0..run - 3 {
                            body.push(char::from(quote));
                        }
                        return Ok(body);
                    }
                    for _ in 0..run {
                        body.push(char::from(quote));
                    }
                }
                Some(b'\\') => self.read_string_escape(&mut body)?,
                Some(b) if b.is_ascii() => body.push(char::from(b)),
                Some(b) => self.read_utf8_rest(b, &mut body)?,
            }
        }
    }

    fn read_string_escape(&mut self, out: &mut String) -> ReadResult<()> {
        match self.eat()? {
            Some(b't') => out.push('\t'),
            Some(b'b') => out.push('\u{8}'),
            Some(b'n') => out.push('\n'),
            Some(b'r') => out.push('\r'),
            Some(b'f') => out.push('\u{C}'),
            Some(b'"') => out.push('"'),
            Some(b'\'') => out.push('\''),
            Some(b'\\') => out.push('\\'),
            Some(b'u') => self.read_unicode_escape(4, out)?,
            Some(b'U') => self.read_unicode_escape(8, out)?,
            _ => return Err(self.syntax_error("invalid string escape")),
        }
        Ok(())
    }

    fn read_unicode_escape(&mut self, digits: u32, out: &mut String) -> ReadResult<()> {
        let mut code = 0_u32;
        for _ in 0..digits {
            match self.eat()? {
                Some(b) if b.is_ascii_hexdigit() => {
                    code = code << 4 | u32::from(char::from(b).to_digit(16).unwrap_or(0));
                }
                _ => {
                    return Err(
                        self.syntax_error("unicode escapes need hexadecimal digits")
                    )
                }
            }
        }
        match char::from_u32(code) {
            Some(c) => out.push(c),
            None => {
                self.world.error(
                    Status::BadText,
                    Some(self.source.cursor()),
                    format!("U+{code:04X} is not a character"),
                );
                out.push(char::REPLACEMENT_CHARACTER);
            }
        }
        Ok(())
    }

    fn read_number(&mut self) -> ReadResult<Node> {
        let mut text = String::new();
        let mut is_decimal = false;
        let mut is_double = false;

        if matches!(self.peek()?, Some(b'+' | b'-')) {
            text.push(char::from(self.eat()?.unwrap_or(b'+')));
        }
        while matches!(self.peek()?, Some(b) if b.is_ascii_digit()) {
            text.push(char::from(self.eat()?.unwrap_or(b'0')));
        }
        if self.peek()? == Some(b'.') {
            self.advance()?;
            match self.peek()? {
                Some(b) if b.is_ascii_digit() => {
                    is_decimal = true;
                    text.push('.');
                    while matches!(self.peek()?, Some(b) if b.is_ascii_digit()) {
                        text.push(char::from(self.eat()?.unwrap_or(b'0')));
                    }
                }
                Some(b'e' | b'E') if !text.is_empty() => {
                    // "5.e0" is a double with an empty fraction
                    text.push('.');
                }
                _ => {
                    // The dot ends the statement instead
                    self.pending_dots += 1;
                }
            }
        }
        if matches!(self.peek()?, Some(b'e' | b'E')) && self.pending_dots == 0 {
            self.advance()?;
            let mut exponent = String::new();
            if matches!(self.peek()?, Some(b'+' | b'-')) {
                exponent.push(char::from(self.eat()?.unwrap_or(b'+')));
            }
            while matches!(self.peek()?, Some(b) if b.is_ascii_digit()) {
                exponent.push(char::from(self.eat()?.unwrap_or(b'0')));
            }
            if exponent.is_empty() || !exponent.bytes().any(|b| b.is_ascii_digit()) {
                return Err(self.syntax_error("missing exponent digits"));
            }
            is_double = true;
            text.push('e');
            text.push_str(&exponent);
        }
        if !text.bytes().any(|b| b.is_ascii_digit()) {
            return Err(self.syntax_error("expected a number"));
        }
        if !self.syntax.is_abbreviated() {
            return Err(self.syntax_error("bare numbers are not allowed here"));
        }

        let datatype = if is_double {
            xsd::DOUBLE
        } else if is_decimal {
            xsd::DECIMAL
        } else {
            xsd::INTEGER
        };
        Node::new_typed_literal(text, Node::new_uri(datatype))
            .ok_or_else(|| self.syntax_error("invalid numeric literal"))
    }

    // UTF-8 handling: invalid sequences become U+FFFD and are reported
    // through the error sink without failing the parse.

    /// Finishes a multi-byte sequence whose first byte was already
    /// consumed.
    fn read_utf8_rest(&mut self, first: u8, out: &mut String) -> ReadResult<()> {
        let c = self.read_utf8_char(first)?;
        out.push(c);
        Ok(())
    }

    /// Decodes the continuation of `first`, which the caller has consumed.
    fn read_utf8_char(&mut self, first: u8) -> ReadResult<char> {
        let len = match first {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => {
                self.report_bad_text(first);
                return Ok(char::REPLACEMENT_CHARACTER);
            }
        };
        let mut buf = [first, 0, 0, 0];
        for slot in buf.iter_mut().take(len).skip(1) {
            match self.peek()? {
                Some(b) if b & 0xC0 == 0x80 => {
                    *slot = b;
                    self.advance()?;
                }
                _ => {
                    self.report_bad_text(first);
                    return Ok(char::REPLACEMENT_CHARACTER);
                }
            }
        }
        match std::str::from_utf8(&buf[..len]) {
            Ok(s) => Ok(s.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER)),
            Err(_) => {
                self.report_bad_text(first);
                Ok(char::REPLACEMENT_CHARACTER)
            }
        }
    }

    fn report_bad_text(&mut self, byte: u8) {
        self.world.error(
            Status::BadText,
            Some(self.source.cursor()),
            format!("invalid UTF-8 byte 0x{byte:02X}, using U+FFFD"),
        );
    }
}

#[derive(Clone, Copy)]
enum TermPos {
    Subject,
    Graph,
}

impl TermPos {
    fn what(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Graph => "graph name",
        }
    }
}

fn clashes_with_genid(label: &str) -> bool {
    let mut bytes = label.bytes();
    bytes.next() == Some(b'b')
        && label.len() > 1
        && bytes.all(|b| b.is_ascii_digit())
}

fn is_local_escape(byte: u8) -> bool {
    matches!(
        byte,
        b'_' | b'~'
            | b'.'
            | b'-'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
            | b'/'
            | b'?'
            | b'#'
            | b'@'
            | b'%'
    )
}

pub(crate) fn is_pn_chars_base(c: char) -> bool {
    matches!(c,
        'A'..='Z'
        | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

pub(crate) fn is_pn_chars_u(c: char) -> bool {
    is_pn_chars_base(c) || c == '_'
}

pub(crate) fn is_pn_chars(c: char) -> bool {
    is_pn_chars_u(c)
        || matches!(c, '-' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}
