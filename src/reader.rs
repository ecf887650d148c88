//! The pull-style reader (spec §4.4–§4.15): the state machine that scans
//! character input through [`crate::entity::Entity`] and reports one
//! [`Node`] per [`Reader::read`] call, repairing ill-formed markup as it
//! goes rather than rejecting it.
//!
//! The public contract is modeled on `System.Xml.XmlReader` per spec §4.4:
//! call `read`, then query the node it positioned on, rather than matching
//! on a returned event enum the way `quick_xml::Reader::read_event` does.
//! The scan loop itself keeps the same shape throughout: dispatch on a
//! small state enum ([`crate::state::ReaderState`], c.f.
//! `quick_xml::reader::state::ReaderState`), character-at-a-time scanning
//! through an `Entity` in place of quick-xml's buffered byte slice.

use std::rc::Rc;

use crate::attribute::AttributeSet;
use crate::config::{ReaderConfig, WhitespaceHandling};
use crate::dtd::{Dtd, HtmlDtd};
use crate::entity::Entity;
use crate::error::{Diagnostic, Error, Result};
use crate::escape::{self, Expansion};
use crate::name::{is_name_start_char, is_valid_name, is_valid_ncname, is_valid_nmtoken, CaseFolding, QName};
use crate::namespace::NamespaceResolver;
use crate::node::{Node, NodeKind, XmlSpace};
use crate::stack::HwStack;
use crate::state::ReaderState;

struct PendingOpenTag {
    name: String,
    attrs: Vec<(String, Option<String>, Option<char>)>,
    self_closing: bool,
}

/// Validates an attribute name per spec §4.9: an `NMTOKEN`, or for a
/// prefixed name, an `NCName` on the local part.
fn is_valid_attribute_name(name: &str) -> bool {
    let parsed = QName::parse(name);
    match parsed.prefix {
        Some(_) => is_valid_ncname(parsed.local),
        None => is_valid_nmtoken(name),
    }
}

/// A pull-style reader over SGML/HTML-flavored markup.
///
/// Construct with [`Reader::new`] or [`Reader::from_str`], then loop on
/// [`Reader::read`] while it returns `Ok(true)`, inspecting the current
/// node through [`Reader::node_kind`]/[`Reader::name`]/[`Reader::value`]
/// and friends.
pub struct Reader {
    entity: Entity,
    config: ReaderConfig,
    state: ReaderState,
    stack: HwStack<Node>,
    scratch: Node,
    current_index: Option<usize>,
    namespaces: NamespaceResolver,
    attr_cursor: Option<usize>,
    /// True after [`Reader::read_attribute_value`] has moved the reader from
    /// state **Attr** into the pseudo-state **AttrValue** (spec §4.4) for the
    /// attribute `attr_cursor` names; cleared by [`Reader::move_to_element`]
    /// or the next [`Reader::read`].
    attr_value_active: bool,
    closes_remaining: usize,
    closes_all_simulated: bool,
    pending_open: Option<PendingOpenTag>,
    raw_text_end: Option<String>,
    /// True when `doc_type` names `HTML` (spec §4.15/§6.1): the first
    /// non-`html` top-level event gets an `html` wrapper synthesized
    /// around it.
    html_mode: bool,
    /// One-shot latch: true once the wrapper-injection decision has been
    /// made (injected, or not needed because the literal root already was
    /// `html`), so later top-level text (after the root element closes)
    /// never triggers a second wrapper.
    wrapper_checked: bool,
    /// True once a root element has been opened; a second top-level
    /// element is a malformed second root (spec §4.6) and ends the stream
    /// instead of being opened.
    root_seen: bool,
    /// A Text/Whitespace/CData event that was already scanned but had to
    /// wait behind a just-injected `html` wrapper; flushed on the next `read`.
    deferred_emit: Option<(NodeKind, String, String)>,
}

impl Reader {
    pub fn new(text: impl Into<String>, mut config: ReaderConfig) -> Self {
        let base_uri = config.base_uri.clone();
        let html_mode = config.doc_type.as_deref().is_some_and(|d| d.eq_ignore_ascii_case("html"));
        if html_mode && config.dtd.is_none() && !config.ignore_dtd {
            // Detecting HTML mode loads the built-in HTML DTD even though
            // no `dtd` was configured explicitly (spec §6.1: "HTML triggers
            // loading of the built-in HTML DTD resource"). `ignore_dtd`
            // still wins over this, per spec §9 open question (a).
            config.dtd = Some(Rc::new(HtmlDtd::new()));
        }
        Reader {
            entity: Entity::new("document", base_uri, text),
            config,
            state: ReaderState::Initial,
            stack: HwStack::new(),
            scratch: Node::default(),
            current_index: None,
            namespaces: NamespaceResolver::new(),
            attr_cursor: None,
            attr_value_active: false,
            closes_remaining: 0,
            closes_all_simulated: false,
            pending_open: None,
            raw_text_end: None,
            html_mode,
            wrapper_checked: false,
            root_seen: false,
            deferred_emit: None,
        }
    }

    pub fn from_str(text: impl Into<String>) -> Self {
        Self::new(text, ReaderConfig::default())
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Stops reading; every subsequent `read` returns `Ok(false)`.
    pub fn close(&mut self) {
        self.state = ReaderState::Closed;
    }

    /// Forwards a recoverable-repair message to the configured
    /// [`crate::error::DiagnosticSink`], if any (spec §6.2/§7). Callers
    /// additionally log through the `log` facade at the call site, so
    /// installing a sink here is optional.
    fn report(&mut self, message: impl Into<String>) {
        if let Some(sink) = self.config.error_log.as_mut() {
            let pos = self.entity.position();
            sink.report(&Diagnostic {
                entity: self.entity.name().to_string(),
                uri: self.entity.uri().map(str::to_string),
                line: pos.line,
                column: pos.column,
                message: message.into(),
            });
        }
    }

    // ---- node introspection -------------------------------------------

    fn current(&self) -> &Node {
        match self.current_index {
            Some(i) => self.stack.get(i).expect("current_index always names a live frame"),
            None => &self.scratch,
        }
    }

    fn current_mut(&mut self) -> &mut Node {
        match self.current_index {
            Some(i) => self.stack.get_mut(i).expect("current_index always names a live frame"),
            None => &mut self.scratch,
        }
    }

    pub fn node_kind(&self) -> NodeKind {
        if self.attr_value_active {
            return NodeKind::Text;
        }
        self.current().kind()
    }

    /// Name of the current node, or — while positioned on an attribute via
    /// [`Reader::move_to_first_attribute`] and friends — that attribute's
    /// name. Empty once [`Reader::read_attribute_value`] has moved into
    /// **AttrValue**, like any other text node.
    pub fn name(&self) -> &str {
        if self.attr_value_active {
            return "";
        }
        if let Some(i) = self.attr_cursor {
            return self
                .current()
                .attributes()
                .get_by_index(i)
                .map_or("", |a| a.name());
        }
        self.current().name()
    }

    /// Value of the current node, or the current attribute's effective
    /// value while traversing attributes.
    pub fn value(&self) -> &str {
        if let Some(i) = self.attr_cursor {
            return self
                .current()
                .attributes()
                .get_by_index(i)
                .and_then(|a| a.value())
                .unwrap_or("");
        }
        self.current().value()
    }

    pub fn is_empty_element(&self) -> bool {
        self.current().is_empty_element()
    }

    pub fn is_simulated(&self) -> bool {
        self.current().is_simulated()
    }

    pub fn xml_space(&self) -> XmlSpace {
        self.current().xml_space()
    }

    pub fn xml_lang(&self) -> Option<&str> {
        self.current().xml_lang()
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.current().base_uri()
    }

    /// Nesting depth of the current node: 0 for the document node, 1 for
    /// its direct children, and so on. One deeper than the owning element
    /// while positioned in **AttrValue** (spec §4.4).
    pub fn depth(&self) -> usize {
        let base = self.current_index.unwrap_or_else(|| self.stack.top_index().map_or(0, |i| i + 1));
        if self.attr_value_active {
            base + 1
        } else {
            base
        }
    }

    pub fn attribute_count(&self) -> usize {
        self.current().attributes().len()
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.current()
            .attributes()
            .get_by_name(name, self.config.case_folding != CaseFolding::None)
            .and_then(|a| a.value())
    }

    pub fn get_attribute_by_index(&self, index: usize) -> Option<(&str, Option<&str>)> {
        self.current()
            .attributes()
            .get_by_index(index)
            .map(|a| (a.name(), a.value()))
    }

    pub fn attributes(&self) -> &AttributeSet {
        self.current().attributes()
    }

    // ---- attribute traversal (spec §4.4) --------------------------------

    pub fn move_to_first_attribute(&mut self) -> bool {
        if self.attribute_count() == 0 {
            return false;
        }
        self.attr_cursor = Some(0);
        true
    }

    pub fn move_to_next_attribute(&mut self) -> bool {
        let next = self.attr_cursor.map_or(0, |i| i + 1);
        if next >= self.attribute_count() {
            return false;
        }
        self.attr_cursor = Some(next);
        true
    }

    pub fn move_to_attribute(&mut self, name: &str) -> bool {
        match self
            .current()
            .attributes()
            .get_index_by_name(name, self.config.case_folding != CaseFolding::None)
        {
            Some(i) => {
                self.attr_cursor = Some(i);
                true
            }
            None => false,
        }
    }

    /// Moves from state **Attr** to the pseudo-state **AttrValue** (spec
    /// §4.4), exactly once per attribute: the current node becomes a text
    /// node carrying the attribute's value, one depth deeper than the
    /// element. Returns `false` without moving if no attribute is current,
    /// if its value is absent (a boolean/valueless attribute has nothing to
    /// read), or if this attribute's value was already read.
    pub fn read_attribute_value(&mut self) -> bool {
        let Some(i) = self.attr_cursor else { return false };
        if self.attr_value_active {
            return false;
        }
        let has_value = self.current().attributes().get_by_index(i).is_some_and(|a| a.value().is_some());
        if !has_value {
            return false;
        }
        self.attr_value_active = true;
        true
    }

    /// Returns to the element/end-element node itself. Returns `false` if
    /// attribute traversal was not in progress.
    pub fn move_to_element(&mut self) -> bool {
        self.attr_value_active = false;
        self.attr_cursor.take().is_some()
    }

    // ---- convenience readers (spec §4.4) --------------------------------

    /// Concatenates every text/CData/whitespace node up to (but not
    /// including) the next non-text node, expanding no further escaping —
    /// callers reading mixed content with nested markup should use
    /// [`Reader::read_inner_xml`] instead.
    pub fn read_string(&mut self) -> Result<String> {
        let mut out = String::new();
        loop {
            if !self.read()? {
                break;
            }
            match self.node_kind() {
                NodeKind::Text | NodeKind::Whitespace | NodeKind::CData => {
                    out.push_str(self.value())
                }
                _ => break,
            }
        }
        Ok(out)
    }

    /// Renders the current element's content (not including its own start
    /// and end tags) back to markup text.
    pub fn read_inner_xml(&mut self) -> Result<String> {
        if self.node_kind() != NodeKind::Element {
            return Ok(String::new());
        }
        if self.is_empty_element() {
            self.read()?; // consume the synthetic end event
            return Ok(String::new());
        }
        let target_depth = self.depth();
        let mut out = String::new();
        loop {
            if !self.read()? {
                break;
            }
            if self.node_kind() == NodeKind::EndElement && self.depth() == target_depth {
                break;
            }
            out.push_str(&self.render_current());
        }
        Ok(out)
    }

    /// Renders the current node (and, for an element, everything up to and
    /// including its matching end tag) back to markup text.
    pub fn read_outer_xml(&mut self) -> Result<String> {
        if self.node_kind() != NodeKind::Element {
            let rendered = self.render_current();
            self.read()?;
            return Ok(rendered);
        }
        let start_depth = self.depth();
        let mut out = self.render_current();
        if self.is_empty_element() {
            self.read()?;
            return Ok(out);
        }
        loop {
            if !self.read()? {
                break;
            }
            let at_matching_end = self.node_kind() == NodeKind::EndElement && self.depth() == start_depth;
            out.push_str(&self.render_current());
            if at_matching_end {
                break;
            }
        }
        Ok(out)
    }

    fn render_current(&self) -> String {
        match self.node_kind() {
            NodeKind::Element => {
                let mut s = format!("<{}", self.current().name());
                for attr in self.current().attributes().iter() {
                    s.push(' ');
                    s.push_str(attr.name());
                    if let Some(v) = attr.value() {
                        s.push_str("=\"");
                        s.push_str(&escape::escape_attribute(v));
                        s.push('"');
                    }
                }
                if self.is_empty_element() {
                    s.push_str("/>");
                } else {
                    s.push('>');
                }
                s
            }
            // An empty element's synthetic EndElement was already rendered
            // as part of its `<name/>` start event; nothing more to emit.
            NodeKind::EndElement if self.is_empty_element() => String::new(),
            NodeKind::EndElement => format!("</{}>", self.current().name()),
            NodeKind::Text | NodeKind::Whitespace => escape::escape_text(self.value()).into_owned(),
            NodeKind::CData => format!("<![CDATA[{}]]>", self.value()),
            NodeKind::Comment => format!("<!--{}-->", self.value()),
            NodeKind::ProcessingInstruction => format!("<?{} {}?>", self.current().name(), self.value()),
            NodeKind::DocType => format!("<!DOCTYPE {} {}>", self.current().name(), self.value()),
            NodeKind::Document | NodeKind::None => String::new(),
        }
    }

    // ---- the scan loop (spec §4.5) --------------------------------------

    /// Advances to the next node. Returns `Ok(false)` once the document is
    /// fully read (or after [`Reader::close`] was called).
    pub fn read(&mut self) -> Result<bool> {
        match self.state {
            ReaderState::Closed => return Ok(false),
            ReaderState::Initial => {
                self.emit_document();
                self.state = ReaderState::Scanning;
                return Ok(true);
            }
            ReaderState::Closing => return self.drain_one_close(),
            _ => {}
        }
        if let Some((kind, name, value)) = self.deferred_emit.take() {
            self.emit_scratch(kind, name, value);
            return Ok(true);
        }
        self.attr_cursor = None;
        self.attr_value_active = false;
        loop {
            if self.entity.at_document_eof() {
                self.state = ReaderState::Eof;
            }
            match self.state {
                ReaderState::Eof => {
                    if self.stack.len() > 1 {
                        self.closes_remaining = self.stack.len() - 1;
                        self.closes_all_simulated = true;
                        self.pending_open = None;
                        self.state = ReaderState::Closing;
                        return self.drain_one_close();
                    }
                    return Ok(false);
                }
                ReaderState::RawText => return self.scan_raw_text(),
                ReaderState::Closing => return self.drain_one_close(),
                ReaderState::Initial => unreachable!("handled above"),
                ReaderState::Closed => return Ok(false),
                ReaderState::Scanning => {
                    if self.entity.at_entity_eof() {
                        self.entity.close();
                        continue;
                    }
                    match self.entity.peek_char() {
                        Some('<') => return self.scan_markup(),
                        Some(_) => return self.scan_text(),
                        None => continue,
                    }
                }
            }
        }
    }

    fn emit_document(&mut self) {
        let idx = self.stack.push();
        let base_uri = self.config.base_uri.clone();
        let node = self.stack.get_mut(idx).expect("just pushed");
        node.set_kind(NodeKind::Document);
        node.set_base_uri(base_uri);
        self.current_index = Some(idx);
    }

    fn emit_scratch(&mut self, kind: NodeKind, name: String, value: String) {
        self.scratch.reset();
        self.scratch.set_kind(kind);
        self.scratch.set_name(name);
        self.scratch.set_value(value);
        self.current_index = None;
    }

    /// Consumes a fixed literal (optionally case-insensitively) if the
    /// input matches it at the current position; otherwise leaves the
    /// position unchanged.
    fn consume_literal(&mut self, lit: &str, case_insensitive: bool) -> bool {
        let mark = self.entity.mark();
        for expected in lit.chars() {
            let matched = match self.entity.peek_char() {
                Some(c) if case_insensitive => c.eq_ignore_ascii_case(&expected),
                Some(c) => c == expected,
                None => false,
            };
            if !matched {
                self.entity.reset(mark);
                return false;
            }
            self.entity.read_char();
        }
        true
    }

    /// Scans text/attribute-literal content, expanding `&...;` references,
    /// up to (not including) a character matching `terminator`.
    fn scan_value_text(&mut self, terminator: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        loop {
            match self.entity.peek_char() {
                None => break,
                Some(c) if terminator(c) => break,
                Some('&') => {
                    self.entity.read_char();
                    match escape::expand_entity(&mut self.entity, self.config.dtd.as_deref()) {
                        Expansion::Text(t) | Expansion::Literal(t) => out.push_str(&t),
                    }
                }
                Some(c) => {
                    out.push(c);
                    self.entity.read_char();
                }
            }
        }
        out
    }

    fn scan_text(&mut self) -> Result<bool> {
        let text = self.scan_value_text(|c| c == '<');
        self.emit_text(text)
    }

    /// Classifies and emits a text run (whitespace policy, HTML wrapper
    /// injection), shared by ordinary text and the "not a tag" fallback in
    /// [`Reader::scan_markup`].
    fn emit_text(&mut self, text: String) -> Result<bool> {
        let is_whitespace_only = !text.is_empty() && text.chars().all(|c| c.is_ascii_whitespace());
        let kind = if is_whitespace_only {
            match self.config.whitespace_handling {
                WhitespaceHandling::None => return self.read(),
                WhitespaceHandling::Significant => NodeKind::Whitespace,
                WhitespaceHandling::All => NodeKind::Text,
            }
        } else {
            NodeKind::Text
        };
        if self.needs_html_wrapper(false) {
            self.inject_html_wrapper();
            self.deferred_emit = Some((kind, String::new(), text));
            return Ok(true);
        }
        self.emit_scratch(kind, String::new(), text);
        Ok(true)
    }

    fn scan_markup(&mut self) -> Result<bool> {
        self.entity.read_char(); // consume '<'
        match self.entity.peek_char() {
            Some('!') => self.scan_bang_markup(),
            Some('?') => self.scan_processing_instruction(),
            Some('/') => self.scan_end_tag(),
            Some('%') => self.scan_asp_block(),
            Some(c) if is_name_start_char(c) => self.scan_start_tag(),
            Some(_) => {
                // `<` not followed by a name start character: not a tag.
                // Re-emit the `<` as literal text and resume ordinary text
                // scanning from right after it instead of feeding it to
                // `scan_start_tag` (spec §4.5's "PartialText" fallback).
                log::debug!("`<` not followed by a name start character, treated as literal text");
                self.report("`<` not followed by a name start character, treated as literal text");
                let rest = self.scan_value_text(|c| c == '<');
                self.emit_text(format!("<{rest}"))
            }
            None => {
                log::warn!("`<` at end of input treated as literal text");
                self.report("`<` at end of input treated as literal text");
                self.emit_scratch(NodeKind::Text, String::new(), "<".to_string());
                Ok(true)
            }
        }
    }

    /// Scans a classic ASP `<% ... %>` block as opaque CDATA (spec §4.5):
    /// its content is template code, never markup this reader should try to
    /// parse.
    fn scan_asp_block(&mut self) -> Result<bool> {
        self.entity.read_char(); // consume '%'
        let mut buf = String::new();
        if !self.entity.scan_to_end(&mut buf, "%>") {
            log::warn!("unterminated ASP block at end of input");
            self.report("unterminated ASP block at end of input");
        }
        if self.needs_html_wrapper(false) {
            self.inject_html_wrapper();
            self.deferred_emit = Some((NodeKind::CData, String::new(), buf));
            return Ok(true);
        }
        self.emit_scratch(NodeKind::CData, String::new(), buf);
        Ok(true)
    }

    fn scan_bang_markup(&mut self) -> Result<bool> {
        if self.consume_literal("!--", false) {
            return self.scan_comment();
        }
        if self.consume_literal("![CDATA[", false) {
            return self.scan_cdata();
        }
        if self.consume_literal("!DOCTYPE", true) {
            return self.scan_doctype();
        }
        if self.consume_literal("![", false) {
            let mut buf = String::new();
            self.entity.scan_to_end(&mut buf, "]>");
            if buf.trim_start().to_ascii_lowercase().starts_with("if") {
                // Conditional-include block, e.g. `<![if lte IE 9]>`; its
                // effect on the DOM is conditional on a consumer this reader
                // doesn't model, so it is dropped entirely (spec §4.8).
                return self.read();
            }
            log::debug!("unrecognized conditional markup declaration <![{buf}]>, reported as a comment");
            self.report(format!("unrecognized conditional markup declaration <![{buf}]>, reported as a comment"));
            self.emit_scratch(NodeKind::Comment, String::new(), buf);
            return Ok(true);
        }
        self.entity.read_char(); // consume '!'
        let mut buf = String::new();
        self.entity.scan_token(&mut buf, |c| c == '>');
        self.entity.read_char();
        log::debug!("unrecognized markup declaration <!{buf}>, reported as a comment");
        self.report(format!("unrecognized markup declaration <!{buf}>, reported as a comment"));
        self.emit_scratch(NodeKind::Comment, String::new(), buf);
        Ok(true)
    }

    fn scan_comment(&mut self) -> Result<bool> {
        let mut buf = String::new();
        if !self.entity.scan_to_end(&mut buf, "-->") {
            log::warn!("unterminated comment at end of input");
            self.report("unterminated comment at end of input");
        }
        let mut rewritten = String::with_capacity(buf.len());
        let mut dash_run = 0;
        for c in buf.chars() {
            if c == '-' {
                dash_run += 1;
                if dash_run == 1 {
                    rewritten.push(c);
                }
            } else {
                dash_run = 0;
                rewritten.push(c);
            }
        }
        if rewritten.ends_with('-') {
            rewritten.push(' ');
        }
        self.emit_scratch(NodeKind::Comment, String::new(), rewritten);
        Ok(true)
    }

    fn scan_cdata(&mut self) -> Result<bool> {
        let mut buf = String::new();
        if !self.entity.scan_to_end(&mut buf, "]]>") {
            log::warn!("unterminated CDATA section at end of input");
            self.report("unterminated CDATA section at end of input");
        }
        if self.needs_html_wrapper(false) {
            self.inject_html_wrapper();
            self.deferred_emit = Some((NodeKind::CData, String::new(), buf));
            return Ok(true);
        }
        self.emit_scratch(NodeKind::CData, String::new(), buf);
        Ok(true)
    }

    fn scan_processing_instruction(&mut self) -> Result<bool> {
        self.entity.read_char(); // consume '?'
        let mut target = String::new();
        self.entity.scan_token(&mut target, |c| c.is_ascii_whitespace() || c == '?');
        if let Some(colon) = target.find(':') {
            target = target[colon + 1..].to_string();
        }
        let mut buf = String::new();
        // Scan to `>`, not `?>`: some tools emit a stray `/>` or bare `>`
        // closing a processing instruction (spec §4.8).
        if !self.entity.scan_to_end(&mut buf, ">") {
            log::warn!("unterminated processing instruction at end of input");
            self.report("unterminated processing instruction at end of input");
        }
        if buf.ends_with('?') {
            buf.pop();
        }
        if target.eq_ignore_ascii_case("xml") {
            // The stream's own XML declaration; a caller regenerates this on
            // output, so it is never reported as a node.
            return self.read();
        }
        self.emit_scratch(NodeKind::ProcessingInstruction, target, buf.trim().to_string());
        Ok(true)
    }

    fn scan_quoted_literal(&mut self) -> Option<String> {
        match self.entity.peek_char() {
            Some(q) if q == '"' || q == '\'' => {
                self.entity.read_char();
                let mut buf = String::new();
                self.entity.scan_literal(&mut buf, q);
                Some(buf)
            }
            _ => None,
        }
    }

    fn scan_doctype(&mut self) -> Result<bool> {
        self.entity.skip_whitespace();
        let mut name = String::new();
        self.entity
            .scan_token(&mut name, |c| c.is_ascii_whitespace() || c == '>' || c == '[');
        self.entity.skip_whitespace();

        let mut public_id = None;
        let mut system_literal = None;
        if self.consume_literal("PUBLIC", true) {
            self.entity.skip_whitespace();
            public_id = self.scan_quoted_literal();
            self.entity.skip_whitespace();
            system_literal = self.scan_quoted_literal();
        } else if self.consume_literal("SYSTEM", true) {
            self.entity.skip_whitespace();
            system_literal = self.scan_quoted_literal();
        }
        self.entity.skip_whitespace();

        let mut internal_subset = None;
        if self.entity.peek_char() == Some('[') {
            self.entity.read_char();
            let mut buf = String::new();
            self.entity.scan_to_end(&mut buf, "]");
            internal_subset = Some(buf);
            self.entity.skip_whitespace();
        }
        if self.entity.peek_char() == Some('>') {
            self.entity.read_char();
        }

        if let Some(expected) = self.config.doc_type.clone() {
            if !expected.eq_ignore_ascii_case(&name) {
                return Err(Error::DtdMismatch { expected, found: name });
            }
        }

        if self.config.strip_doctype {
            return self.read();
        }

        let reported_name = self.config.doc_type.clone().unwrap_or(name);
        let public_id = self.config.public_id.clone().or(public_id);
        let mut system_literal = self.config.system_literal.clone().or(system_literal);
        let internal_subset = self.config.internal_subset.clone().or(internal_subset);

        if public_id.is_some() && system_literal.is_none() {
            // A `PUBLIC` identifier requires a `SYSTEM` literal to be
            // well-formed XML; synthesize an empty one when the source
            // omitted it (spec §4.8).
            system_literal = Some(String::new());
        }

        let mut value = String::new();
        if let Some(p) = &public_id {
            value.push_str("PUBLIC \"");
            value.push_str(p);
            value.push_str("\" ");
        }
        if let Some(s) = &system_literal {
            value.push('"');
            value.push_str(s);
            value.push('"');
        }
        if let Some(i) = &internal_subset {
            value.push_str(" [");
            value.push_str(i);
            value.push(']');
        }

        self.emit_scratch(NodeKind::DocType, reported_name, value);
        Ok(true)
    }

    fn scan_attribute_value(&mut self) -> (Option<String>, Option<char>) {
        match self.entity.peek_char() {
            Some(q) if q == '"' || q == '\'' => {
                self.entity.read_char();
                let value = self.scan_value_text(|c| c == q);
                if self.entity.peek_char() == Some(q) {
                    self.entity.read_char();
                }
                self.skip_malformed_quote_trailer();
                (Some(value), Some(q))
            }
            Some(_) => {
                let value = self.scan_value_text(|c| c.is_ascii_whitespace() || c == '>' || c == '/');
                (Some(value), None)
            }
            None => (None, None),
        }
    }

    /// Discards garbage glued directly onto a just-closed quoted value with
    /// no separating whitespace, e.g. the `bar"` in `<a href="foo"bar">ok`
    /// (spec §4.6 scenario 3): a mismatched extra quote run-on is dropped
    /// and logged rather than kept as a bogus attribute.
    fn skip_malformed_quote_trailer(&mut self) {
        match self.entity.peek_char() {
            Some(c) if !c.is_ascii_whitespace() && c != '>' && c != '/' => {
                let mut garbage = String::new();
                self.entity
                    .scan_token(&mut garbage, |c| c.is_ascii_whitespace() || c == '>' || c == '/');
                log::debug!("malformed quote trailer `{garbage}` after attribute value, dropped");
                self.report(format!("malformed quote trailer `{garbage}` after attribute value, dropped"));
            }
            _ => {}
        }
    }

    fn scan_start_tag(&mut self) -> Result<bool> {
        let mut raw_name = String::new();
        self.entity
            .scan_token(&mut raw_name, |c| c.is_ascii_whitespace() || c == '>' || c == '/');
        let name = self.config.case_folding.apply(&raw_name);
        let name_is_valid = is_valid_name(&name);

        let mut attrs = Vec::new();
        let mut self_closing = false;
        loop {
            self.entity.skip_whitespace();
            match self.entity.peek_char() {
                None => {
                    log::warn!("unterminated start tag `<{name}` at end of input");
                    self.report(format!("unterminated start tag `<{name}` at end of input"));
                    break;
                }
                Some('>') => {
                    self.entity.read_char();
                    break;
                }
                Some('/') => {
                    self.entity.read_char();
                    self.entity.skip_whitespace();
                    if self.entity.peek_char() == Some('>') {
                        self.entity.read_char();
                    }
                    self_closing = true;
                    break;
                }
                Some(_) => {
                    let mut attr_name_raw = String::new();
                    self.entity
                        .scan_token(&mut attr_name_raw, |c| c == '=' || c.is_ascii_whitespace() || c == '>' || c == '/');
                    if attr_name_raw.is_empty() {
                        self.entity.read_char();
                        continue;
                    }
                    // A lone separator punctuation character between real
                    // attributes, e.g. `<p a, b>`; a legacy HTML authoring
                    // heuristic, not a real attribute name (spec §4.6).
                    if matches!(attr_name_raw.as_str(), "," | "=" | ":" | ";") {
                        continue;
                    }
                    let attr_name = self.config.case_folding.apply(&attr_name_raw);
                    self.entity.skip_whitespace();
                    let (value, quote) = if self.entity.peek_char() == Some('=') {
                        self.entity.read_char();
                        self.entity.skip_whitespace();
                        self.scan_attribute_value()
                    } else {
                        // No `=` at all: HTML boolean-attribute convention,
                        // the value is the attribute's own name (spec §4.6).
                        (Some(attr_name.clone()), None)
                    };
                    if is_valid_attribute_name(&attr_name) {
                        attrs.push((attr_name, value, quote));
                    } else {
                        log::debug!("attribute name `{attr_name}` is not a valid NMTOKEN, dropped");
                        self.report(format!("attribute name `{attr_name}` is not a valid NMTOKEN, dropped"));
                    }
                }
            }
        }

        if !name_is_valid {
            // Not a valid XML Name: the tag can never be reported as a
            // well-formed element, so it degrades to a literal text event
            // instead (spec §4.9).
            log::debug!("`<{name}>` is not a valid XML name, reported as literal text");
            self.report(format!("`<{name}>` is not a valid XML name, reported as literal text"));
            self.emit_scratch(NodeKind::Text, String::new(), format!("<{name}>"));
            return Ok(true);
        }
        self.queue_auto_closes_then_open(PendingOpenTag { name, attrs, self_closing })
    }

    fn scan_end_tag(&mut self) -> Result<bool> {
        self.entity.read_char(); // consume '/'
        let mut raw = String::new();
        self.entity.scan_token(&mut raw, |c| c == '>' || c.is_ascii_whitespace());
        self.entity.skip_whitespace();
        if self.entity.peek_char() == Some('>') {
            self.entity.read_char();
        }
        let name = self.config.case_folding.apply(&raw);

        match self.find_open_index(&name) {
            Some(idx) => {
                self.closes_remaining = self.stack.len() - idx;
                self.closes_all_simulated = false;
                self.pending_open = None;
                self.state = ReaderState::Closing;
                self.drain_one_close()
            }
            None => {
                log::debug!("end tag `</{name}>` has no matching open start tag, dropped");
                self.report(format!("end tag `</{name}>` has no matching open start tag, dropped"));
                self.read()
            }
        }
    }

    fn find_open_index(&self, name: &str) -> Option<usize> {
        // Ordinal comparison when `case_folding` is `None` still matches
        // case-insensitively (spec §3): folding only controls how a name is
        // *reported*, not whether a mismatched-case end tag is recognized
        // as closing its start tag.
        let names_match = |a: &str, b: &str| {
            if self.config.case_folding == CaseFolding::None {
                a.eq_ignore_ascii_case(b)
            } else {
                a == b
            }
        };
        for i in (1..self.stack.len()).rev() {
            let node = self.stack.get(i).expect("in range");
            if node.kind() == NodeKind::Element && names_match(node.name(), name) {
                return Some(i);
            }
        }
        None
    }

    /// Walks the open-element stack from the top downward, looking for how
    /// far a new start tag's DTD-declared `closes` list reaches (spec
    /// §4.10's `ValidateContent`: each ancestor the new element closes is
    /// cascaded shut, not just the innermost one). Returns the index of the
    /// deepest ancestor that must stay open (the new element's future
    /// parent), or `None` if nothing needs closing.
    ///
    /// The walk stops — without closing it — at the first ancestor not
    /// named in `closes` (it can contain the new element), at an ancestor
    /// named `body` (never auto-close it early), or at the document root.
    fn find_auto_close_target(&self, closes: &[String]) -> Option<usize> {
        if closes.is_empty() {
            return None;
        }
        let mut target = None;
        for i in (1..self.stack.len()).rev() {
            let node = self.stack.get(i).expect("in range");
            if node.kind() != NodeKind::Element {
                break;
            }
            if node.name().eq_ignore_ascii_case("body") {
                break;
            }
            if !closes.iter().any(|n| n.eq_ignore_ascii_case(node.name())) {
                break;
            }
            target = Some(i);
        }
        target
    }

    fn drain_one_close(&mut self) -> Result<bool> {
        if self.closes_remaining == 0 {
            self.state = ReaderState::Scanning;
            if let Some(open) = self.pending_open.take() {
                return self.open_element(open);
            }
            return self.read();
        }
        let idx = self.stack.top_index().expect("closes_remaining > 0 implies an open element");
        let simulated = self.closes_all_simulated || self.closes_remaining > 1;
        self.closes_remaining -= 1;
        let closing = self.stack.get(idx).expect("just computed");
        let name = closing.name().to_string();
        let was_empty = closing.is_empty_element();
        self.namespaces.pop_scope();
        self.stack.truncate(idx);
        self.emit_scratch(NodeKind::EndElement, name, String::new());
        self.current_mut().set_simulated(simulated);
        self.current_mut().set_is_empty(was_empty);
        if self.closes_remaining == 0 {
            // Leave `state` as `Closing` if a start tag is still queued, so
            // the *next* `read` opens it instead of trying to scan input —
            // this call's return value is the EndElement just emitted above.
            self.state = if self.pending_open.is_some() {
                ReaderState::Closing
            } else {
                ReaderState::Scanning
            };
        }
        Ok(true)
    }

    /// True when this is the first top-level event, HTML mode is active,
    /// and that event is not itself an `html` start tag (spec §4.15).
    fn needs_html_wrapper(&self, is_html_root: bool) -> bool {
        self.html_mode && !self.wrapper_checked && self.stack.len() == 1 && !is_html_root
    }

    /// Pushes a synthetic, `simulated` `html` element frame as the new root
    /// and makes it the current node (spec §4.15). Latches
    /// `wrapper_checked` so later top-level content (e.g. after the
    /// injected tree closes) is never wrapped a second time.
    fn inject_html_wrapper(&mut self) {
        let idx = self.stack.push();
        self.namespaces.push_scope();
        let parent_base = self.stack.get(idx - 1).and_then(|p| p.base_uri()).map(str::to_string);
        let node = self.stack.get_mut(idx).expect("just pushed");
        node.set_kind(NodeKind::Element);
        node.set_name("html".to_string());
        node.set_is_empty(false);
        node.set_simulated(true);
        node.set_base_uri(parent_base);
        self.current_index = Some(idx);
        self.wrapper_checked = true;
        self.root_seen = true;
    }

    fn queue_auto_closes_then_open(&mut self, open: PendingOpenTag) -> Result<bool> {
        if self.needs_html_wrapper(open.name.eq_ignore_ascii_case("html")) {
            self.inject_html_wrapper();
            // Leave the real start tag queued; this call already returns
            // the wrapper's own Start event via `current_index`, so it
            // must not be overwritten by draining `pending_open` now.
            self.pending_open = Some(open);
            self.state = ReaderState::Closing;
            return Ok(true);
        }
        if self.stack.len() == 1 {
            if self.root_seen {
                log::warn!("second root element `<{}>` ignored, document already has a root", open.name);
                self.report(format!(
                    "second root element `<{}>` ignored, document already has a root",
                    open.name
                ));
                self.state = ReaderState::Eof;
                return self.read();
            }
            self.root_seen = true;
            self.wrapper_checked = true;
        }
        if !self.config.ignore_dtd {
            if let Some(dtd) = self.config.dtd.clone() {
                if let Some(decl) = dtd.element(&open.name) {
                    if let Some(target) = self.find_auto_close_target(&decl.closes) {
                        self.closes_remaining = self.stack.len() - target;
                        self.closes_all_simulated = true;
                        self.pending_open = Some(open);
                        self.state = ReaderState::Closing;
                        return self.drain_one_close();
                    }
                }
            }
        }
        self.open_element(open)
    }

    fn open_element(&mut self, open: PendingOpenTag) -> Result<bool> {
        let dtd = self.config.dtd.clone();
        let is_void = dtd.as_deref().is_some_and(|d| d.is_empty_element(&open.name));
        let is_cdata_content = dtd.as_deref().is_some_and(|d| d.is_cdata_element(&open.name));
        let is_empty = open.self_closing || is_void;

        let idx = self.stack.push();
        self.namespaces.push_scope();
        for (attr_name, value, _) in &open.attrs {
            if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                self.namespaces.declare(Some(prefix), value.as_deref().unwrap_or(""));
            } else if attr_name == "xmlns" {
                self.namespaces.declare(None, value.as_deref().unwrap_or(""));
            }
        }

        let (parent_space, parent_lang, parent_base) = if idx > 0 {
            let parent = self.stack.get(idx - 1).expect("parent frame exists");
            (
                parent.xml_space(),
                parent.xml_lang().map(str::to_string),
                parent.base_uri().map(str::to_string),
            )
        } else {
            (XmlSpace::Default, None, self.config.base_uri.clone())
        };

        let case_insensitive = self.config.case_folding != CaseFolding::None;
        let node = self.stack.get_mut(idx).expect("just pushed");
        node.set_kind(NodeKind::Element);
        node.set_name(open.name.clone());
        node.set_is_empty(is_empty);
        node.set_simulated(false);
        node.set_xml_space(parent_space);
        node.set_xml_lang(parent_lang);
        node.set_base_uri(parent_base);
        node.set_dtd_decl(dtd.as_deref().and_then(|d| d.element(&open.name)).map(Rc::new));

        let mut dup_attrs = Vec::new();
        for (attr_name, value, quote) in open.attrs {
            if attr_name == "xml:space" {
                if value.as_deref() == Some("preserve") {
                    node.set_xml_space(XmlSpace::Preserve);
                } else if value.as_deref() == Some("default") {
                    node.set_xml_space(XmlSpace::Default);
                }
            }
            if attr_name == "xml:lang" {
                node.set_xml_lang(value.clone());
            }
            match node
                .attributes_mut()
                .add_attribute(attr_name.clone(), value, quote, case_insensitive)
            {
                Some(added) => {
                    if let Some(decl) = dtd.as_deref().and_then(|d| d.attribute(&open.name, &attr_name)) {
                        added.attach_dtd_decl(Rc::new(decl));
                    }
                }
                None => {
                    log::debug!("duplicate attribute `{attr_name}` on <{}>, keeping first occurrence", open.name);
                    dup_attrs.push(attr_name);
                }
            }
        }
        for attr_name in dup_attrs {
            self.report(format!(
                "duplicate attribute `{attr_name}` on <{}>, keeping first occurrence",
                open.name
            ));
        }

        self.current_index = Some(idx);

        if is_empty {
            self.closes_remaining = 1;
            self.closes_all_simulated = true;
            self.pending_open = None;
            self.state = ReaderState::Closing;
        } else if is_cdata_content {
            self.raw_text_end = Some(open.name.to_ascii_lowercase());
            self.state = ReaderState::RawText;
        } else {
            self.state = ReaderState::Scanning;
        }
        Ok(true)
    }

    fn scan_raw_text(&mut self) -> Result<bool> {
        let end_name = self.raw_text_end.clone().unwrap_or_default();
        let mut buf = String::new();
        let mut found_end = false;
        let mut embedded = false;
        loop {
            match self.entity.peek_char() {
                None => break,
                Some('<') => {
                    let mark = self.entity.mark();
                    if self.consume_literal("</", false) {
                        let mut tag = String::new();
                        self.entity.scan_token(&mut tag, |c| c == '>' || c.is_ascii_whitespace());
                        if tag.eq_ignore_ascii_case(&end_name) {
                            self.entity.skip_whitespace();
                            if self.entity.peek_char() == Some('>') {
                                self.entity.read_char();
                            }
                            found_end = true;
                            break;
                        }
                        self.entity.reset(mark);
                        buf.push(self.entity.read_char().expect("peeked Some above"));
                    } else if self.looks_like_embedded_comment_or_pi() {
                        embedded = true;
                        break;
                    } else {
                        buf.push(self.entity.read_char().expect("peeked Some above"));
                    }
                }
                Some(_) => buf.push(self.entity.read_char().expect("peeked Some above")),
            }
        }

        if embedded {
            // A `<!--...-->` comment or `<?...?>` PI embedded in a
            // CDATA-content element body, e.g. the classic
            // `<script><!--\n...\n//--></script>` browser-hiding-comment
            // idiom (spec §4.7): split it out as its own event instead of
            // swallowing it into the raw-text run, then resume scanning the
            // body once it's been reported.
            self.raw_text_end = Some(end_name);
            self.state = ReaderState::RawText;
            if !buf.is_empty() {
                self.emit_scratch(NodeKind::CData, String::new(), buf);
                return Ok(true);
            }
            self.entity.read_char(); // consume '<'
            return match self.entity.peek_char() {
                Some('!') => self.scan_bang_markup(),
                Some('?') => self.scan_processing_instruction(),
                _ => unreachable!("looks_like_embedded_comment_or_pi confirmed one of these"),
            };
        }

        self.raw_text_end = None;
        self.closes_remaining = 1;
        self.closes_all_simulated = !found_end;
        self.pending_open = None;
        if buf.is_empty() {
            self.state = ReaderState::Closing;
            return self.drain_one_close();
        }
        // These cannot legally nest inside a CDATA section (spec §4.7), so a
        // literal occurrence in the source is unparsable noise to strip.
        let buf = buf
            .replace("<![CDATA[", "")
            .replace("]]>", "")
            .replace("/**/", "");
        self.state = ReaderState::Closing;
        self.emit_scratch(NodeKind::CData, String::new(), buf);
        Ok(true)
    }

    /// Lookahead-only check for an embedded comment or processing
    /// instruction opener at the current position (used inside
    /// [`Reader::scan_raw_text`]); consumes nothing.
    fn looks_like_embedded_comment_or_pi(&mut self) -> bool {
        let mark = self.entity.mark();
        let matched = self.consume_literal("<!--", false) || self.consume_literal("<?", false);
        self.entity.reset(mark);
        matched
    }
}

/// Resolves a namespace prefix against the reader's current scope. Exposed
/// separately from `Reader` methods because it needs `&mut self` only to
/// allocate a new unknown-prefix placeholder (spec §4.13); this keeps the
/// mutation visible at call sites instead of hiding behind an apparently
/// read-only accessor.
impl Reader {
    pub fn resolve_namespace(&mut self, prefix: &str) -> String {
        self.namespaces.resolve(prefix).to_string()
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.namespaces.resolve_default()
    }
}
