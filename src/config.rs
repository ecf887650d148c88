//! Reader configuration (spec §6.1).
//!
//! Grounded on `quick_xml::reader::Config`'s shape: public fields plus
//! `with_*` chainable setters, rather than a separate builder type.

use std::rc::Rc;

use crate::dtd::Dtd;
use crate::error::DiagnosticSink;
use crate::name::CaseFolding;

/// How runs of whitespace-only text nodes are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhitespaceHandling {
    /// Whitespace-only text is reported like any other text node.
    All,
    /// Whitespace-only text is suppressed entirely.
    None,
    /// Whitespace-only text is reported, but tagged distinctly
    /// (`NodeKind::Whitespace` rather than `NodeKind::Text`) so a caller can
    /// skip it cheaply without losing it (spec §6.1 default).
    #[default]
    Significant,
}

/// Configuration accepted before the first `read` (spec §6.1). Fields are
/// public and mutable directly, or through the chainable `with_*` setters.
pub struct ReaderConfig {
    /// Forces the DOCTYPE name the reader will report, overriding whatever
    /// (if anything) is found in the input.
    pub doc_type: Option<String>,
    pub public_id: Option<String>,
    pub system_literal: Option<String>,
    /// Literal internal-subset text to report with the DOCTYPE node,
    /// independent of whether the input carried one.
    pub internal_subset: Option<String>,
    /// Base URI used to resolve relative entity references; also reported
    /// on every node unless overridden by an `xml:base` attribute.
    pub base_uri: Option<String>,
    /// A URI to fetch as the input source. Accepted for API parity with
    /// callers that configure a reader declaratively; this crate performs
    /// no network or file I/O itself (spec §1 Non-goals) — resolving
    /// `href` into bytes is the caller's job, done before constructing the
    /// [`crate::reader::Reader`].
    pub href: Option<String>,
    /// Proxy URI to use when resolving `href`. Same caveat as `href`: kept
    /// for configuration-surface parity, unused by this crate.
    pub proxy: Option<String>,
    pub case_folding: CaseFolding,
    pub whitespace_handling: WhitespaceHandling,
    /// If true (the default), a DOCTYPE found in the input is
    /// repaired/validated as usual but never reported as a node.
    pub strip_doctype: bool,
    /// If true, DTD-guided auto-close/auto-insert/default-attribute repair
    /// is skipped entirely; only the built-in XML well-formedness repairs
    /// (spec §4.6 et al.) still apply.
    pub ignore_dtd: bool,
    /// The DTD consulted for auto-close/auto-insert and attribute
    /// defaults. Defaults to none; construct a reader with
    /// [`crate::dtd::HtmlDtd`] for HTML-flavored repair.
    pub dtd: Option<Rc<dyn Dtd>>,
    pub error_log: Option<Box<dyn DiagnosticSink>>,
}

impl std::fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("doc_type", &self.doc_type)
            .field("public_id", &self.public_id)
            .field("system_literal", &self.system_literal)
            .field("internal_subset", &self.internal_subset)
            .field("base_uri", &self.base_uri)
            .field("href", &self.href)
            .field("proxy", &self.proxy)
            .field("case_folding", &self.case_folding)
            .field("whitespace_handling", &self.whitespace_handling)
            .field("strip_doctype", &self.strip_doctype)
            .field("ignore_dtd", &self.ignore_dtd)
            .field("dtd", &self.dtd.is_some())
            .field("error_log", &self.error_log.is_some())
            .finish()
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            doc_type: None,
            public_id: None,
            system_literal: None,
            internal_subset: None,
            base_uri: None,
            href: None,
            proxy: None,
            case_folding: CaseFolding::default(),
            whitespace_handling: WhitespaceHandling::default(),
            strip_doctype: true,
            ignore_dtd: false,
            dtd: None,
            error_log: None,
        }
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doc_type(mut self, name: impl Into<String>) -> Self {
        self.doc_type = Some(name.into());
        self
    }

    pub fn with_public_id(mut self, id: impl Into<String>) -> Self {
        self.public_id = Some(id.into());
        self
    }

    pub fn with_system_literal(mut self, literal: impl Into<String>) -> Self {
        self.system_literal = Some(literal.into());
        self
    }

    pub fn with_internal_subset(mut self, subset: impl Into<String>) -> Self {
        self.internal_subset = Some(subset.into());
        self
    }

    pub fn with_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.base_uri = Some(uri.into());
        self
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_case_folding(mut self, folding: CaseFolding) -> Self {
        self.case_folding = folding;
        self
    }

    pub fn with_whitespace_handling(mut self, handling: WhitespaceHandling) -> Self {
        self.whitespace_handling = handling;
        self
    }

    pub fn with_strip_doctype(mut self, strip: bool) -> Self {
        self.strip_doctype = strip;
        self
    }

    pub fn with_ignore_dtd(mut self, ignore: bool) -> Self {
        self.ignore_dtd = ignore;
        self
    }

    pub fn with_dtd(mut self, dtd: Rc<dyn Dtd>) -> Self {
        self.dtd = Some(dtd);
        self
    }

    pub fn with_error_log(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.error_log = Some(Box::new(sink));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive() {
        let cfg = ReaderConfig::new();
        assert!(cfg.dtd.is_none());
        assert!(!cfg.ignore_dtd);
        assert_eq!(cfg.whitespace_handling, WhitespaceHandling::Significant);
    }

    #[test]
    fn builder_chains() {
        let cfg = ReaderConfig::new()
            .with_doc_type("html")
            .with_case_folding(CaseFolding::Lower)
            .with_strip_doctype(true);
        assert_eq!(cfg.doc_type.as_deref(), Some("html"));
        assert_eq!(cfg.case_folding, CaseFolding::Lower);
        assert!(cfg.strip_doctype);
    }
}
