//! The statement writer: renders a stream of statements back into bytes
//! with prefix abbreviation, anonymous node inlining and collection
//! formatting.

use crate::env::Env;
use crate::node::{Node, NodeFlags, NodeKind};
use crate::sink::Sink;
use crate::statement::{Statement, StatementFlags};
use crate::status::Status;
use crate::vocab::{rdf, xsd};
use crate::world::World;
use crate::Syntax;
use std::io::{self, Write};

type WriteResult<T> = Result<T, Status>;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum ContextKind {
    Anon,
    List,
}

struct WriteContext {
    kind: ContextKind,
    node: Node,
    is_subject: bool,
    saved_subject: Option<Node>,
    saved_predicate: Option<Node>,
}

/// Writes statements in one of the [`Syntax`]es, driven either directly or
/// as the [`Sink`] of a [`Reader`](crate::Reader).
///
/// The writer never recovers a bad statement: kind-illegal input fails
/// with [`Status::BadArg`] and writes nothing, and the next statement is
/// accepted as usual.
pub struct Writer<'w, W: Write> {
    world: &'w World,
    syntax: Syntax,
    env: Env,
    root: Option<Node>,
    chop_blank_prefix: Option<String>,
    write: W,
    contexts: Vec<WriteContext>,
    current_graph: Option<Node>,
    last_subject: Option<Node>,
    last_predicate: Option<Node>,
    pending: bool,
    after_subject_block: bool,
}

impl<'w, W: Write> Writer<'w, W> {
    pub fn new(world: &'w World, syntax: Syntax, env: Env, write: W) -> Self {
        Self {
            world,
            syntax,
            env,
            root: None,
            chop_blank_prefix: None,
            write,
            contexts: Vec::new(),
            current_graph: None,
            last_subject: None,
            last_predicate: None,
            pending: false,
            after_subject_block: false,
        }
    }

    /// Constrains URI relativization: references are never written
    /// relative when reaching them would ascend above `root`.
    pub fn set_root_uri(&mut self, root: Option<&Node>) {
        self.root = root.cloned();
    }

    /// Strips `prefix` from blank node labels before writing, undoing a
    /// reader's [`add_blank_prefix`](crate::Reader::add_blank_prefix).
    pub fn chop_blank_prefix(&mut self, prefix: Option<&str>) {
        self.chop_blank_prefix = prefix.map(ToOwned::to_owned);
    }

    /// The environment, as updated by `set_base`/`set_prefix`.
    #[inline]
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Sets the base URI and writes the corresponding directive.
    pub fn set_base(&mut self, uri: &Node) -> WriteResult<()> {
        self.env.set_base(uri)?;
        if self.syntax.is_abbreviated() {
            self.finish_statement()?;
            self.out("@base <")?;
            self.write_uri_text(uri.as_str())?;
            self.out("> .\n")?;
        }
        Ok(())
    }

    /// Binds a prefix and writes the corresponding directive.
    pub fn set_prefix(&mut self, name: &Node, value: &Node) -> WriteResult<()> {
        self.env.set_prefix(name, value)?;
        if self.syntax.is_abbreviated() {
            self.finish_statement()?;
            self.out("@prefix ")?;
            self.out(name.as_str())?;
            self.out(": <")?;
            self.write_uri_text(value.as_str())?;
            self.out("> .\n")?;
        }
        Ok(())
    }

    /// Writes one statement. `flags` describe the surface form the reader
    /// saw; anonymous and collection forms are reproduced from them.
    pub fn write_statement(
        &mut self,
        flags: StatementFlags,
        statement: &Statement,
    ) -> WriteResult<()> {
        statement.check()?;
        check_flag_nodes(flags, statement)?;
        if self.syntax.is_abbreviated() {
            self.write_abbreviated(flags, statement)
        } else {
            self.write_flat(statement)
        }
    }

    /// Closes the anonymous node `node` opened by an `ANON_*` statement.
    pub fn end_anon(&mut self, node: &Node) -> WriteResult<()> {
        let matches_top = self
            .contexts
            .last()
            .map_or(false, |ctx| ctx.kind == ContextKind::Anon && ctx.node == *node);
        if !matches_top {
            return Ok(());
        }
        let ctx = self.contexts.pop().expect("context checked above");
        self.out("\n")?;
        self.write_indent()?;
        self.out("]")?;
        if ctx.is_subject {
            self.last_subject = Some(ctx.node);
            self.last_predicate = None;
            self.after_subject_block = true;
        } else {
            self.last_subject = ctx.saved_subject;
            self.last_predicate = ctx.saved_predicate;
        }
        Ok(())
    }

    /// Writes the deferred statement terminator and closes any open graph
    /// block.
    pub fn finish(&mut self) -> WriteResult<()> {
        self.finish_statement()?;
        if self.current_graph.take().is_some() {
            self.out("}\n")?;
        }
        if let Err(e) = self.write.flush() {
            return Err(self.io_error(e));
        }
        Ok(())
    }

    /// Returns the output stream, consuming the writer.
    pub fn into_inner(self) -> W {
        self.write
    }

    // Plumbing

    fn io_error(&mut self, e: io::Error) -> Status {
        self.world
            .error(Status::BadStream, None, format!("error writing output: {e}"))
    }

    fn out(&mut self, text: &str) -> WriteResult<()> {
        self.write
            .write_all(text.as_bytes())
            .map_err(|e| self.io_error(e))
    }

    fn indent(&self) -> usize {
        usize::from(self.current_graph.is_some()) + self.contexts.len()
    }

    fn write_indent(&mut self) -> WriteResult<()> {
        for _ in 0..self.indent() {
            self.out("\t")?;
        }
        Ok(())
    }

    fn finish_statement(&mut self) -> WriteResult<()> {
        if self.pending {
            self.out(" .\n")?;
            self.pending = false;
        }
        self.last_subject = None;
        self.last_predicate = None;
        self.after_subject_block = false;
        Ok(())
    }

    // Flat rendering for the line-oriented formats

    fn write_flat(&mut self, statement: &Statement) -> WriteResult<()> {
        // Check expansions up front so a bad statement writes nothing
        for node in [&statement.subject, &statement.predicate, &statement.object]
            .into_iter()
            .chain(statement.graph.as_ref())
        {
            let curie = match node.kind() {
                NodeKind::Curie => Some(node),
                NodeKind::Literal => node.datatype().filter(|d| d.kind() == NodeKind::Curie),
                _ => None,
            };
            if let Some(curie) = curie {
                if self.env.expand(curie).is_none() {
                    return Err(self.world.error(
                        Status::BadCurie,
                        None,
                        format!("undefined prefix in `{}`", curie.as_str()),
                    ));
                }
            }
        }
        self.write_absolute_node(&statement.subject)?;
        self.out(" ")?;
        self.write_absolute_node(&statement.predicate)?;
        self.out(" ")?;
        self.write_absolute_node(&statement.object)?;
        if self.syntax == Syntax::NQuads {
            if let Some(graph) = &statement.graph {
                self.out(" ")?;
                self.write_absolute_node(graph)?;
            }
        }
        self.out(" .\n")
    }

    fn write_absolute_node(&mut self, node: &Node) -> WriteResult<()> {
        match node.kind() {
            NodeKind::Uri => {
                self.out("<")?;
                let text = self.absolute_uri(node);
                self.write_uri_text(&text)?;
                self.out(">")
            }
            NodeKind::Curie => {
                let Some(expanded) = self.env.expand(node) else {
                    return Err(self.world.error(
                        Status::BadCurie,
                        None,
                        format!("undefined prefix in `{}`", node.as_str()),
                    ));
                };
                self.out("<")?;
                self.write_uri_text(expanded.as_str())?;
                self.out(">")
            }
            NodeKind::Blank => self.write_blank(node),
            NodeKind::Literal => {
                self.write_quoted_short(node.as_str())?;
                self.write_literal_suffix(node, true)
            }
            NodeKind::Variable => Err(Status::BadArg),
        }
    }

    fn absolute_uri(&self, node: &Node) -> String {
        if let Some(base) = self.env.base() {
            if !crate::uri::parse_uri(node.as_str()).is_absolute() {
                if let Some(resolved) = crate::uri::resolve(node.as_str(), base.as_str()) {
                    return resolved;
                }
            }
        }
        node.as_str().to_owned()
    }

    // Abbreviated rendering for Turtle and TriG

    fn write_abbreviated(
        &mut self,
        flags: StatementFlags,
        statement: &Statement,
    ) -> WriteResult<()> {
        if self.syntax == Syntax::Trig && statement.graph != self.current_graph {
            self.set_graph(statement.graph.clone())?;
        }

        // Collection items arrive as rdf:first/rdf:rest statements about
        // the node on top of the context stack
        if let Some(ctx) = self.contexts.last() {
            if ctx.kind == ContextKind::List && ctx.node == statement.subject {
                return self.write_list_item(flags, statement);
            }
        }

        if flags.contains(StatementFlags::LIST_S) {
            self.open_statement_group()?;
            self.out("(")?;
            self.contexts.push(WriteContext {
                kind: ContextKind::List,
                node: statement.subject.clone(),
                is_subject: true,
                saved_subject: None,
                saved_predicate: None,
            });
            return self.write_list_item(flags, statement);
        }

        if self.last_subject.as_ref() == Some(&statement.subject) {
            if !self.after_subject_block && self.last_predicate.as_ref() == Some(&statement.predicate)
            {
                self.out(" ,\n")?;
                self.write_indent()?;
                self.out("\t\t")?;
            } else if self.after_subject_block {
                // The subject was just closed as `[ … ]` or `( … )`
                self.after_subject_block = false;
                self.out(" ")?;
                self.write_predicate(&statement.predicate)?;
                self.out(" ")?;
            } else if self.last_predicate.is_none() {
                // First property inside an anonymous node
                self.out("\n")?;
                self.write_indent()?;
                self.write_predicate(&statement.predicate)?;
                self.out(" ")?;
            } else {
                self.out(" ;\n")?;
                self.write_indent()?;
                self.out("\t")?;
                self.write_predicate(&statement.predicate)?;
                self.out(" ")?;
            }
        } else {
            self.after_subject_block = false;
            self.open_statement_group()?;
            if flags.contains(StatementFlags::EMPTY_S) {
                self.out("[]")?;
            } else if flags.contains(StatementFlags::ANON_S) {
                self.out("[")?;
                self.contexts.push(WriteContext {
                    kind: ContextKind::Anon,
                    node: statement.subject.clone(),
                    is_subject: true,
                    saved_subject: None,
                    saved_predicate: None,
                });
                self.last_subject = Some(statement.subject.clone());
                self.last_predicate = None;
                self.pending = true;
                // Re-enter to lay the first property out inside the node
                return self.write_abbreviated(
                    flags_without_subject(flags),
                    statement,
                );
            } else {
                self.write_node(&statement.subject)?;
            }
            self.out(" ")?;
            self.write_predicate(&statement.predicate)?;
            self.out(" ")?;
        }

        self.write_object(flags, statement)?;
        self.pending = true;
        Ok(())
    }

    /// Separates this statement group from the previous one.
    fn open_statement_group(&mut self) -> WriteResult<()> {
        if self.pending {
            self.out(" .\n\n")?;
            self.pending = false;
        }
        self.write_indent()
    }

    fn write_object(&mut self, flags: StatementFlags, statement: &Statement) -> WriteResult<()> {
        if flags.contains(StatementFlags::EMPTY_O) {
            self.out("[]")?;
            self.last_subject = Some(statement.subject.clone());
            self.last_predicate = Some(statement.predicate.clone());
        } else if flags.contains(StatementFlags::ANON_O) {
            self.out("[")?;
            self.contexts.push(WriteContext {
                kind: ContextKind::Anon,
                node: statement.object.clone(),
                is_subject: false,
                saved_subject: Some(statement.subject.clone()),
                saved_predicate: Some(statement.predicate.clone()),
            });
            self.last_subject = Some(statement.object.clone());
            self.last_predicate = None;
        } else if flags.contains(StatementFlags::LIST_O) {
            self.out("(")?;
            self.contexts.push(WriteContext {
                kind: ContextKind::List,
                node: statement.object.clone(),
                is_subject: false,
                saved_subject: Some(statement.subject.clone()),
                saved_predicate: Some(statement.predicate.clone()),
            });
        } else {
            self.write_node(&statement.object)?;
            self.last_subject = Some(statement.subject.clone());
            self.last_predicate = Some(statement.predicate.clone());
        }
        Ok(())
    }

    fn write_list_item(&mut self, flags: StatementFlags, statement: &Statement) -> WriteResult<()> {
        if statement.predicate.as_str() == rdf::FIRST {
            self.out(" ")?;
            // A nested anonymous or collection object re-enters the
            // context machinery
            return self.write_object(flags_without_subject(flags), statement);
        }
        if statement.predicate.as_str() == rdf::REST {
            if statement.object.kind() == NodeKind::Uri && statement.object.as_str() == rdf::NIL {
                self.out(" )")?;
                let ctx = self.contexts.pop().expect("list context checked by caller");
                if ctx.is_subject {
                    self.last_subject = Some(ctx.node);
                    self.last_predicate = None;
                    self.after_subject_block = true;
                } else {
                    self.last_subject = ctx.saved_subject;
                    self.last_predicate = ctx.saved_predicate;
                }
            } else if let Some(ctx) = self.contexts.last_mut() {
                ctx.node = statement.object.clone();
            }
            return Ok(());
        }
        Err(self.world.error(
            Status::BadArg,
            statement.cursor(),
            "collection statements must use rdf:first and rdf:rest",
        ))
    }

    fn set_graph(&mut self, graph: Option<Node>) -> WriteResult<()> {
        self.finish_statement()?;
        if self.current_graph.take().is_some() {
            self.out("}\n")?;
        }
        if let Some(graph) = &graph {
            self.write_node(graph)?;
            self.out(" {\n")?;
        }
        self.current_graph = graph;
        Ok(())
    }

    // Node rendering

    fn write_predicate(&mut self, node: &Node) -> WriteResult<()> {
        if node.kind() == NodeKind::Uri && node.as_str() == rdf::TYPE {
            return self.out("a");
        }
        self.write_node(node)
    }

    fn write_node(&mut self, node: &Node) -> WriteResult<()> {
        match node.kind() {
            NodeKind::Uri => self.write_uri_node(node),
            NodeKind::Curie => self.out(node.as_str()),
            NodeKind::Blank => self.write_blank(node),
            NodeKind::Literal => self.write_literal(node),
            NodeKind::Variable => Err(Status::BadArg),
        }
    }

    /// CURIE if a prefix matches, then relative to the base (bounded by
    /// the root), then absolute.
    fn write_uri_node(&mut self, node: &Node) -> WriteResult<()> {
        if let Some(curie) = self.env.qualify(node) {
            if let Some((prefix, local)) = curie.as_str().split_once(':') {
                if let Some(escaped) = escape_local_name(local) {
                    self.out(prefix)?;
                    self.out(":")?;
                    return self.out(&escaped);
                }
            }
        }
        if let Some(base) = self.env.base() {
            let relative = crate::uri::relativize(
                node.as_str(),
                base.as_str(),
                self.root.as_ref().map(|r| r.as_str()),
            );
            self.out("<")?;
            self.write_uri_text(&relative)?;
            return self.out(">");
        }
        self.out("<")?;
        self.write_uri_text(node.as_str())?;
        self.out(">")
    }

    fn write_blank(&mut self, node: &Node) -> WriteResult<()> {
        let label = match &self.chop_blank_prefix {
            Some(prefix) => node.as_str().strip_prefix(prefix.as_str()),
            None => None,
        }
        .unwrap_or(node.as_str())
        .to_owned();
        self.out("_:")?;
        self.out(&label)
    }

    fn write_literal(&mut self, node: &Node) -> WriteResult<()> {
        if let Some(datatype) = node.datatype() {
            let inline = match datatype.as_str() {
                xsd::BOOLEAN => is_turtle_boolean(node.as_str()),
                xsd::INTEGER => is_turtle_integer(node.as_str()),
                xsd::DECIMAL => is_turtle_decimal(node.as_str()),
                xsd::DOUBLE => is_turtle_double(node.as_str()),
                _ => false,
            };
            if inline {
                return self.out(node.as_str());
            }
        }
        if node
            .flags()
            .contains(NodeFlags::HAS_NEWLINE)
            || node.flags().contains(NodeFlags::HAS_QUOTE)
        {
            self.write_quoted_long(node.as_str())?;
        } else {
            self.write_quoted_short(node.as_str())?;
        }
        self.write_literal_suffix(node, false)
    }

    fn write_literal_suffix(&mut self, node: &Node, flat: bool) -> WriteResult<()> {
        if let Some(datatype) = node.datatype() {
            self.out("^^")?;
            if flat {
                return self.write_absolute_node(datatype);
            }
            return self.write_node(datatype);
        }
        if let Some(language) = node.language() {
            self.out("@")?;
            return self.out(language);
        }
        Ok(())
    }

    fn write_quoted_short(&mut self, text: &str) -> WriteResult<()> {
        self.out("\"")?;
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\t' => escaped.push_str("\\t"),
                '\u{8}' => escaped.push_str("\\b"),
                '\u{C}' => escaped.push_str("\\f"),
                c if (c as u32) < 0x20 || c == '\u{7F}' => {
                    escaped.push_str(&format!("\\u{:04X}", c as u32));
                }
                c => escaped.push(c),
            }
        }
        self.out(&escaped)?;
        self.out("\"")
    }

    fn write_quoted_long(&mut self, text: &str) -> WriteResult<()> {
        self.out("\"\"\"")?;
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' | '\r' | '\t' => escaped.push(c),
                c if (c as u32) < 0x20 || c == '\u{7F}' => {
                    escaped.push_str(&format!("\\u{:04X}", c as u32));
                }
                c => escaped.push(c),
            }
        }
        self.out(&escaped)?;
        self.out("\"\"\"")
    }

    /// Percent-encodes the characters that may not appear inside `<…>`.
    fn write_uri_text(&mut self, text: &str) -> WriteResult<()> {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if c <= ' ' || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' | '\u{7F}')
            {
                escaped.push_str(&format!("%{:02X}", c as u32));
            } else {
                escaped.push(c);
            }
        }
        self.out(&escaped)
    }
}

impl<W: Write> Sink for Writer<'_, W> {
    fn base(&mut self, uri: &Node) -> Result<(), Status> {
        self.set_base(uri)
    }

    fn prefix(&mut self, name: &Node, value: &Node) -> Result<(), Status> {
        self.set_prefix(name, value)
    }

    fn statement(&mut self, flags: StatementFlags, statement: &Statement) -> Result<(), Status> {
        self.write_statement(flags, statement)
    }

    fn end(&mut self, node: &Node) -> Result<(), Status> {
        self.end_anon(node)
    }
}

fn flags_without_subject(flags: StatementFlags) -> StatementFlags {
    let mut out = StatementFlags::empty();
    for flag in [
        StatementFlags::EMPTY_O,
        StatementFlags::ANON_O,
        StatementFlags::LIST_O,
    ] {
        if flags.contains(flag) {
            out |= flag;
        }
    }
    out
}

fn check_flag_nodes(flags: StatementFlags, statement: &Statement) -> Result<(), Status> {
    if (flags.contains(StatementFlags::EMPTY_S)
        || flags.contains(StatementFlags::ANON_S)
        || flags.contains(StatementFlags::LIST_S))
        && statement.subject.kind() != NodeKind::Blank
    {
        return Err(Status::BadArg);
    }
    if (flags.contains(StatementFlags::EMPTY_O)
        || flags.contains(StatementFlags::ANON_O)
        || flags.contains(StatementFlags::LIST_O))
        && statement.object.kind() != NodeKind::Blank
    {
        return Err(Status::BadArg);
    }
    Ok(())
}

fn is_turtle_boolean(value: &str) -> bool {
    matches!(value, "true" | "false")
}

fn is_turtle_integer(value: &str) -> bool {
    // [19]  INTEGER  ::=  [+-]? [0-9]+
    let mut value = value.as_bytes();
    if let Some(v) = value.strip_prefix(b"+") {
        value = v;
    } else if let Some(v) = value.strip_prefix(b"-") {
        value = v;
    }
    !value.is_empty() && value.iter().all(u8::is_ascii_digit)
}

fn is_turtle_decimal(value: &str) -> bool {
    // [20]  DECIMAL  ::=  [+-]? [0-9]* '.' [0-9]+
    let mut value = value.as_bytes();
    if let Some(v) = value.strip_prefix(b"+") {
        value = v;
    } else if let Some(v) = value.strip_prefix(b"-") {
        value = v;
    }
    while value.first().map_or(false, u8::is_ascii_digit) {
        value = &value[1..];
    }
    let Some(value) = value.strip_prefix(b".") else {
        return false;
    };
    !value.is_empty() && value.iter().all(u8::is_ascii_digit)
}

fn is_turtle_double(value: &str) -> bool {
    // [21]    DOUBLE    ::=  [+-]? ([0-9]+ '.' [0-9]* EXPONENT | '.' [0-9]+ EXPONENT | [0-9]+ EXPONENT)
    // [154s]  EXPONENT  ::=  [eE] [+-]? [0-9]+
    let mut value = value.as_bytes();
    if let Some(v) = value.strip_prefix(b"+") {
        value = v;
    } else if let Some(v) = value.strip_prefix(b"-") {
        value = v;
    }
    let mut with_before = false;
    while value.first().map_or(false, u8::is_ascii_digit) {
        value = &value[1..];
        with_before = true;
    }
    let mut with_after = false;
    if let Some(v) = value.strip_prefix(b".") {
        value = v;
        while value.first().map_or(false, u8::is_ascii_digit) {
            value = &value[1..];
            with_after = true;
        }
    }
    if let Some(v) = value.strip_prefix(b"e") {
        value = v;
    } else if let Some(v) = value.strip_prefix(b"E") {
        value = v;
    } else {
        return false;
    }
    if let Some(v) = value.strip_prefix(b"+") {
        value = v;
    } else if let Some(v) = value.strip_prefix(b"-") {
        value = v;
    }
    (with_before || with_after) && !value.is_empty() && value.iter().all(u8::is_ascii_digit)
}

fn escape_local_name(value: &str) -> Option<String> {
    // [168s]  PN_LOCAL  ::=  (PN_CHARS_U | ':' | [0-9] | PLX) ((PN_CHARS | '.' | ':' | PLX)* (PN_CHARS | ':' | PLX))?
    let mut output = String::with_capacity(value.len());
    let mut chars = value.chars();
    let first = chars.next()?;
    if crate::reader::is_pn_chars_u(first) || first == ':' || first.is_ascii_digit() {
        output.push(first);
    } else if can_be_escaped_in_local_name(first) {
        output.push('\\');
        output.push(first);
    } else {
        return None;
    }

    while let Some(c) = chars.next() {
        if crate::reader::is_pn_chars(c) || c == ':' || (c == '.' && !chars.as_str().is_empty()) {
            output.push(c);
        } else if can_be_escaped_in_local_name(c) {
            output.push('\\');
            output.push(c);
        } else {
            return None;
        }
    }

    Some(output)
}

fn can_be_escaped_in_local_name(c: char) -> bool {
    matches!(
        c,
        '_' | '~'
            | '.'
            | '-'
            | '!'
            | '$'
            | '&'
            | '\''
            | '('
            | ')'
            | '*'
            | '+'
            | ','
            | ';'
            | '='
            | '/'
            | '?'
            | '#'
            | '@'
            | '%'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        let mut world = World::new();
        world.set_error_sink(|_| ());
        world
    }

    fn uri(s: &str) -> Node {
        Node::new_uri(s)
    }

    fn statement(s: &str, p: &str, o: Node) -> Statement {
        Statement::new(uri(s), uri(p), o)
    }

    fn finished(mut writer: Writer<'_, Vec<u8>>) -> String {
        writer.finish().unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn abbreviation_state_machine() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(), Vec::new());
        let flags = StatementFlags::empty();
        writer
            .write_statement(
                flags,
                &statement("http://eg/s", "http://eg/p", uri("http://eg/o")),
            )
            .unwrap();
        writer
            .write_statement(
                flags,
                &statement("http://eg/s", "http://eg/p", uri("http://eg/o2")),
            )
            .unwrap();
        writer
            .write_statement(
                flags,
                &statement("http://eg/s", "http://eg/p2", uri("http://eg/o3")),
            )
            .unwrap();
        writer
            .write_statement(
                flags,
                &statement("http://eg/s2", "http://eg/p", uri("http://eg/o")),
            )
            .unwrap();
        assert_eq!(
            finished(writer),
            concat!(
                "<http://eg/s> <http://eg/p> <http://eg/o> ,\n",
                "\t\t<http://eg/o2> ;\n",
                "\t<http://eg/p2> <http://eg/o3> .\n",
                "\n",
                "<http://eg/s2> <http://eg/p> <http://eg/o> .\n",
            )
        );
    }

    #[test]
    fn prefixes_abbreviate_uris() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(), Vec::new());
        writer
            .set_prefix(&Node::new_curie("schema"), &uri("http://schema.org/"))
            .unwrap();
        writer
            .write_statement(
                StatementFlags::empty(),
                &statement(
                    "http://example.com#me",
                    "http://www.w3.org/1999/02/22-rdf-syntax-ns#type",
                    uri("http://schema.org/Person"),
                ),
            )
            .unwrap();
        assert_eq!(
            finished(writer),
            "@prefix schema: <http://schema.org/> .\n<http://example.com#me> a schema:Person .\n"
        );
    }

    #[test]
    fn base_directive_and_relativization() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(), Vec::new());
        writer.set_base(&uri("http://example.org/base/")).unwrap();
        writer
            .write_statement(
                StatementFlags::empty(),
                &statement(
                    "http://example.org/base/s",
                    "http://example.org/other/p",
                    uri("http://example.org/base/dir/o"),
                ),
            )
            .unwrap();
        assert_eq!(
            finished(writer),
            "@base <http://example.org/base/> .\n<s> <../other/p> <dir/o> .\n"
        );
    }

    #[test]
    fn root_bounds_relativization() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(), Vec::new());
        writer
            .set_base(&uri("http://example.org/a/b/c/"))
            .unwrap();
        writer.set_root_uri(Some(&uri("http://example.org/a/b/")));
        writer
            .write_statement(
                StatementFlags::empty(),
                &statement(
                    "http://example.org/a/b/x",
                    "http://example.org/a/p",
                    uri("http://example.org/a/b/c/y"),
                ),
            )
            .unwrap();
        // `/a/p` is above the root, so it stays absolute
        assert_eq!(
            finished(writer),
            "@base <http://example.org/a/b/c/> .\n<../x> <http://example.org/a/p> <y> .\n"
        );
    }

    #[test]
    fn literal_forms() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(), Vec::new());
        let flags = StatementFlags::empty();
        let s = "http://eg/s";
        let p = "http://eg/p";
        writer
            .write_statement(flags, &statement(s, p, Node::new_string("plain")))
            .unwrap();
        writer
            .write_statement(
                flags,
                &statement(s, p, Node::new_plain_literal("bonjour", "fr").unwrap()),
            )
            .unwrap();
        writer
            .write_statement(
                flags,
                &statement(
                    s,
                    p,
                    Node::new_typed_literal("x", uri("http://eg/T")).unwrap(),
                ),
            )
            .unwrap();
        writer
            .write_statement(flags, &statement(s, p, Node::new_integer(42)))
            .unwrap();
        writer
            .write_statement(flags, &statement(s, p, Node::new_boolean(true)))
            .unwrap();
        writer
            .write_statement(flags, &statement(s, p, Node::new_string("say \"hi\"\nbye")))
            .unwrap();
        assert_eq!(
            finished(writer),
            concat!(
                "<http://eg/s> <http://eg/p> \"plain\" ,\n",
                "\t\t\"bonjour\"@fr ,\n",
                "\t\t\"x\"^^<http://eg/T> ,\n",
                "\t\t42 ,\n",
                "\t\ttrue ,\n",
                "\t\t\"\"\"say \\\"hi\\\"\nbye\"\"\" .\n",
            )
        );
    }

    #[test]
    fn invalid_statements_write_nothing() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(), Vec::new());
        let p = uri("http://eg/p");
        let o = Node::new_string("o");

        // Literal subject
        assert_eq!(
            writer.write_statement(
                StatementFlags::empty(),
                &Statement::new(Node::new_string("s"), p.clone(), o.clone()),
            ),
            Err(Status::BadArg)
        );
        // Literal predicate
        assert_eq!(
            writer.write_statement(
                StatementFlags::empty(),
                &Statement::new(uri("http://eg/s"), Node::new_string("p"), o.clone()),
            ),
            Err(Status::BadArg)
        );
        // Variable object
        assert_eq!(
            writer.write_statement(
                StatementFlags::empty(),
                &Statement::new(uri("http://eg/s"), p.clone(), Node::new_variable("v")),
            ),
            Err(Status::BadArg)
        );
        // Anonymous flags require blank nodes
        assert_eq!(
            writer.write_statement(
                StatementFlags::ANON_O,
                &Statement::new(uri("http://eg/s"), p, o),
            ),
            Err(Status::BadArg)
        );
        assert_eq!(finished(writer), "");
    }

    #[test]
    fn bad_statement_does_not_poison_the_writer() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(), Vec::new());
        let bad = Statement::new(
            Node::new_string("s"),
            uri("http://eg/p"),
            Node::new_string("o"),
        );
        assert_eq!(
            writer.write_statement(StatementFlags::empty(), &bad),
            Err(Status::BadArg)
        );
        writer
            .write_statement(
                StatementFlags::empty(),
                &statement("http://eg/s", "http://eg/p", Node::new_string("o")),
            )
            .unwrap();
        assert_eq!(finished(writer), "<http://eg/s> <http://eg/p> \"o\" .\n");
    }

    #[test]
    fn anonymous_objects_are_inlined() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(), Vec::new());
        let anon = Node::new_blank("b1");
        writer
            .write_statement(
                StatementFlags::ANON_O,
                &statement("http://eg/s", "http://eg/p", anon.clone()),
            )
            .unwrap();
        writer
            .write_statement(
                StatementFlags::empty(),
                &Statement::new(anon.clone(), uri("http://eg/q"), Node::new_string("v")),
            )
            .unwrap();
        writer.end_anon(&anon).unwrap();
        assert_eq!(
            finished(writer),
            "<http://eg/s> <http://eg/p> [\n\t<http://eg/q> \"v\"\n] .\n"
        );
    }

    #[test]
    fn collections_are_inlined() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::Turtle, Env::new(), Vec::new());
        let l1 = Node::new_blank("b1");
        let l2 = Node::new_blank("b2");
        let first = uri(rdf::FIRST);
        let rest = uri(rdf::REST);
        writer
            .write_statement(
                StatementFlags::LIST_O,
                &statement("http://eg/s", "http://eg/p", l1.clone()),
            )
            .unwrap();
        writer
            .write_statement(
                StatementFlags::empty(),
                &Statement::new(l1.clone(), first.clone(), uri("http://eg/a")),
            )
            .unwrap();
        writer
            .write_statement(
                StatementFlags::empty(),
                &Statement::new(l1, rest.clone(), l2.clone()),
            )
            .unwrap();
        writer
            .write_statement(
                StatementFlags::empty(),
                &Statement::new(l2.clone(), first, uri("http://eg/b")),
            )
            .unwrap();
        writer
            .write_statement(
                StatementFlags::empty(),
                &Statement::new(l2, rest, uri(rdf::NIL)),
            )
            .unwrap();
        assert_eq!(
            finished(writer),
            "<http://eg/s> <http://eg/p> ( <http://eg/a> <http://eg/b> ) .\n"
        );
    }

    #[test]
    fn trig_graph_blocks() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::Trig, Env::new(), Vec::new());
        let g = uri("http://eg/g");
        writer
            .write_statement(
                StatementFlags::empty(),
                &statement("http://eg/s", "http://eg/p", uri("http://eg/o"))
                    .with_graph(Some(g.clone())),
            )
            .unwrap();
        writer
            .write_statement(
                StatementFlags::empty(),
                &statement("http://eg/s", "http://eg/p2", uri("http://eg/o2"))
                    .with_graph(Some(g)),
            )
            .unwrap();
        writer
            .write_statement(
                StatementFlags::empty(),
                &statement("http://eg/s2", "http://eg/p", uri("http://eg/o")),
            )
            .unwrap();
        assert_eq!(
            finished(writer),
            concat!(
                "<http://eg/g> {\n",
                "\t<http://eg/s> <http://eg/p> <http://eg/o> ;\n",
                "\t\t<http://eg/p2> <http://eg/o2> .\n",
                "}\n",
                "<http://eg/s2> <http://eg/p> <http://eg/o> .\n",
            )
        );
    }

    #[test]
    fn flat_formats_expand_everything() {
        let world = world();
        let mut env = Env::new();
        env.set_prefix_from_strings("eg", "http://example.org/").unwrap();
        let mut writer = Writer::new(&world, Syntax::NQuads, env, Vec::new());
        writer
            .write_statement(
                StatementFlags::empty(),
                &Statement::new(
                    Node::new_curie("eg:s"),
                    uri("http://example.org/p"),
                    Node::new_plain_literal("a\nb", "en").unwrap(),
                )
                .with_graph(Some(Node::new_blank("g"))),
            )
            .unwrap();
        assert_eq!(
            finished(writer),
            "<http://example.org/s> <http://example.org/p> \"a\\nb\"@en _:g .\n"
        );
    }

    #[test]
    fn flat_formats_reject_unbound_prefixes() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::NTriples, Env::new(), Vec::new());
        assert_eq!(
            writer.write_statement(
                StatementFlags::empty(),
                &Statement::new(
                    Node::new_curie("hm:what"),
                    uri("http://example.org/p"),
                    Node::new_string("o"),
                ),
            ),
            Err(Status::BadCurie)
        );
        assert_eq!(finished(writer), "");
    }

    #[test]
    fn chopped_blank_prefixes() {
        let world = world();
        let mut writer = Writer::new(&world, Syntax::NTriples, Env::new(), Vec::new());
        writer.chop_blank_prefix(Some("doc1"));
        writer
            .write_statement(
                StatementFlags::empty(),
                &Statement::new(
                    Node::new_blank("doc1x"),
                    uri("http://eg/p"),
                    Node::new_blank("other"),
                ),
            )
            .unwrap();
        assert_eq!(finished(writer), "_:x <http://eg/p> _:other .\n");
    }
}
