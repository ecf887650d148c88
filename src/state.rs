//! The reader's top-level state (spec §4.5), factored into its own module
//! so both [`crate::node::Node`] (which stashes one while attribute
//! traversal is in progress) and `crate::reader` can name it without a
//! circular dependency.
//!
//! Grounded on `quick_xml::reader::state::ReaderState`'s role (an explicit
//! state enum driving a `match` in the scan loop) rather than its exact
//! variants, which are specific to quick-xml's well-formed-only grammar.
//! Sub-steps within scanning a single tag (name, attributes, value) are
//! local to the scan functions in `crate::reader` rather than states here,
//! since nothing needs to suspend mid-tag across a `read` call boundary —
//! attribute traversal is tracked separately by the reader's own
//! `attr_cursor`, which does not need a `ReaderState` variant of its own.

/// Where the reader's scan loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Nothing has been read yet; the next `read` reports the `Document` node.
    Initial,
    /// Normal top-level dispatch: the next `<` decides markup vs. text.
    Scanning,
    /// Inside a CDATA-content element's body (spec §4.10, `script`/`style`),
    /// scanning raw text up to the matching end tag.
    RawText,
    /// Draining a queue of synthetic end-tag events (mismatched end tag
    /// recovery or DTD auto-close, spec §4.6/§4.10) before resuming
    /// `Scanning`.
    Closing,
    /// The current entity or the whole document is exhausted.
    Eof,
    /// `close` was called; no further reads are possible.
    Closed,
}
