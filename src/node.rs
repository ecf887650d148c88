//! The node frame (spec §3): the unit of data the reader exposes after each
//! `read`, and — for elements — the unit held on the element [`HwStack`].
//!
//! Grounded on `quick_xml::reader::state::ReaderState` plus
//! `quick_xml::events::BytesStart` for "what fields does one open element
//! need to carry forward" (name, attributes, an empty-element flag), with
//! the `xml:space`/`xml:lang` inheritance added per spec §3.
//!
//! [`HwStack`]: crate::stack::HwStack

use std::rc::Rc;

use crate::attribute::AttributeSet;
use crate::dtd::ElementDecl;
use crate::stack::Reset;

/// What kind of event a [`Node`] currently represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    #[default]
    None,
    Document,
    Element,
    EndElement,
    Text,
    Whitespace,
    CData,
    Comment,
    ProcessingInstruction,
    DocType,
}

/// `xml:space` value, inherited down the element stack (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlSpace {
    #[default]
    Default,
    Preserve,
}

/// One node frame: either a live entry on the element stack (`Document` or
/// `Element`/`EndElement`), or the reader's single reusable scratch frame
/// for a transient, non-nesting event (text, comment, PI, doctype, ...).
///
/// [`Reset`] clears every field so the arena can hand the slot back out;
/// `attributes` keeps its own backing storage across resets (only its live
/// count is cleared), matching the same high-water discipline as the
/// element stack itself.
#[derive(Debug, Default)]
pub struct Node {
    name: String,
    kind: NodeKind,
    value: String,
    is_empty: bool,
    xml_space: XmlSpace,
    xml_lang: Option<String>,
    dtd_decl: Option<Rc<ElementDecl>>,
    simulated: bool,
    attributes: AttributeSet,
    base_uri: Option<String>,
}

impl Reset for Node {
    fn reset(&mut self) {
        self.name.clear();
        self.kind = NodeKind::None;
        self.value.clear();
        self.is_empty = false;
        self.xml_space = XmlSpace::Default;
        self.xml_lang = None;
        self.dtd_decl = None;
        self.simulated = false;
        self.attributes.clear();
        self.base_uri = None;
    }
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty_element(&self) -> bool {
        self.is_empty
    }

    pub fn xml_space(&self) -> XmlSpace {
        self.xml_space
    }

    pub fn xml_lang(&self) -> Option<&str> {
        self.xml_lang.as_deref()
    }

    pub fn dtd_decl(&self) -> Option<&ElementDecl> {
        self.dtd_decl.as_deref()
    }

    /// True if this start/empty tag was synthesized by auto-close or
    /// auto-insert rather than found literally in the input (spec §4.10).
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeSet {
        &mut self.attributes
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_kind(&mut self, kind: NodeKind) {
        self.kind = kind;
    }

    pub(crate) fn set_value(&mut self, value: String) {
        self.value = value;
    }

    pub(crate) fn set_is_empty(&mut self, is_empty: bool) {
        self.is_empty = is_empty;
    }

    pub(crate) fn set_xml_space(&mut self, space: XmlSpace) {
        self.xml_space = space;
    }

    pub(crate) fn set_xml_lang(&mut self, lang: Option<String>) {
        self.xml_lang = lang;
    }

    pub(crate) fn set_dtd_decl(&mut self, decl: Option<Rc<ElementDecl>>) {
        self.dtd_decl = decl;
    }

    pub(crate) fn set_simulated(&mut self, simulated: bool) {
        self.simulated = simulated;
    }

    pub(crate) fn set_base_uri(&mut self, uri: Option<String>) {
        self.base_uri = uri;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_everything_but_keeps_attribute_storage() {
        let mut n = Node::default();
        n.set_name("div".into());
        n.set_kind(NodeKind::Element);
        n.attributes_mut()
            .add_attribute("id".into(), Some("x".into()), Some('"'), true);
        assert_eq!(n.attributes().len(), 1);

        n.reset();
        assert_eq!(n.name(), "");
        assert_eq!(n.kind(), NodeKind::None);
        assert_eq!(n.attributes().len(), 0);
    }
}
