//! DTD-guided repair (component **F**, spec §4.10): element/attribute
//! declarations consulted for auto-close, auto-insert, default attribute
//! values, and CDATA-content elements.
//!
//! This crate never parses a `.dtd` file (that is explicitly out of scope —
//! spec §1 Non-goals, "no support for parsing external DTD subsets"); the
//! `Dtd` trait is the seam a caller can implement against one if they have
//! it, and [`HtmlDtd`] is the one implementation shipped here, a hand-built
//! table of the HTML element rules `quick-dtd`'s `DtdParser` would otherwise
//! have produced by parsing `html.dtd`.

use std::collections::HashMap;

/// Content model of a declared element, as far as this crate needs to know:
/// only whether the element can appear as a child of another, since that's
/// the question auto-close/auto-insert (spec §4.6/§4.10) actually asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentModel {
    /// No content is permitted; the element is always reported empty
    /// (`<br>`, `<img>`, ...).
    Empty,
    /// Content is character data the reader must not try to parse as markup
    /// (`<script>`, `<style>`).
    CData,
    /// Ordinary mixed or element content.
    Mixed,
}

/// One declared attribute's default, consulted by [`crate::attribute::Attribute::value`].
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    pub name: String,
    pub default_value: Option<String>,
}

/// One declared element: its content model and the set of elements it
/// implicitly closes when they are still open on the stack (spec §4.10 —
/// "end-tag-optional containment", e.g. a new `<li>` closes a prior open
/// `<li>`).
#[derive(Debug, Clone, Default)]
pub struct ElementDecl {
    pub content: Option<ContentModel>,
    /// Names of open elements this element auto-closes when encountered as
    /// a start tag. Matched case-insensitively by callers (HTML is
    /// case-insensitive by convention).
    pub closes: Vec<String>,
}

/// A source of element/attribute/entity declarations for auto-repair.
///
/// Implementations must be `Send + Sync` so a reader's configured DTD can be
/// shared behind an `Arc` across threads (spec §5).
pub trait Dtd: Send + Sync {
    /// Looks up the declaration for an element name (case-insensitive).
    /// Returns an owned copy since the table behind this may not outlive
    /// the caller's `Rc` (it is attached to a [`crate::node::Node`] and
    /// carried past the `read` call that looked it up).
    fn element(&self, name: &str) -> Option<ElementDecl>;

    /// Looks up a declared attribute default for `element`/`attr`.
    fn attribute(&self, element: &str, attr: &str) -> Option<AttributeDecl>;

    /// Looks up a named entity's replacement text (beyond the five built-in
    /// ones handled directly by [`crate::escape`]).
    fn entity(&self, name: &str) -> Option<&str>;

    /// True if `name` is a void/empty element under this DTD.
    fn is_empty_element(&self, name: &str) -> bool {
        matches!(
            self.element(name).and_then(|d| d.content),
            Some(ContentModel::Empty)
        )
    }

    /// True if `name`'s content should be scanned as raw character data
    /// (not markup) up to its matching end tag.
    fn is_cdata_element(&self, name: &str) -> bool {
        matches!(
            self.element(name).and_then(|d| d.content),
            Some(ContentModel::CData)
        )
    }
}

/// The built-in HTML element table (spec §4.10): void elements, CDATA
/// (unparsed-content) elements, end-tag-optional containment rules, and a
/// handful of named entities beyond the five XML predefines.
pub struct HtmlDtd {
    elements: HashMap<&'static str, ElementDecl>,
    entities: HashMap<&'static str, &'static str>,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const CDATA_ELEMENTS: &[&str] = &["script", "style"];

/// `(element, [names it auto-closes when still open])`, for HTML's
/// end-tag-optional elements.
const CONTAINMENT: &[(&str, &[&str])] = &[
    ("p", &["p"]),
    ("li", &["li"]),
    ("tr", &["tr", "td", "th"]),
    ("td", &["td", "th"]),
    ("th", &["td", "th"]),
    ("option", &["option"]),
    ("dd", &["dd", "dt"]),
    ("dt", &["dd", "dt"]),
];

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("nbsp", "\u{00A0}"),
    ("copy", "\u{00A9}"),
    ("reg", "\u{00AE}"),
    ("trade", "\u{2122}"),
    ("mdash", "\u{2014}"),
    ("ndash", "\u{2013}"),
    ("hellip", "\u{2026}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("ldquo", "\u{201C}"),
    ("rdquo", "\u{201D}"),
    ("eacute", "\u{00E9}"),
    ("aacute", "\u{00E1}"),
    ("times", "\u{00D7}"),
    ("euro", "\u{20AC}"),
];

impl HtmlDtd {
    pub fn new() -> Self {
        let mut elements = HashMap::new();
        for &name in VOID_ELEMENTS {
            elements.insert(
                name,
                ElementDecl {
                    content: Some(ContentModel::Empty),
                    closes: Vec::new(),
                },
            );
        }
        for &name in CDATA_ELEMENTS {
            elements.insert(
                name,
                ElementDecl {
                    content: Some(ContentModel::CData),
                    closes: Vec::new(),
                },
            );
        }
        for &(name, closes) in CONTAINMENT {
            elements
                .entry(name)
                .or_insert_with(ElementDecl::default)
                .closes = closes.iter().map(|s| s.to_string()).collect();
        }
        HtmlDtd {
            elements,
            entities: NAMED_ENTITIES.iter().copied().collect(),
        }
    }
}

impl Default for HtmlDtd {
    fn default() -> Self {
        Self::new()
    }
}

impl Dtd for HtmlDtd {
    fn element(&self, name: &str) -> Option<ElementDecl> {
        self.elements.get(name.to_ascii_lowercase().as_str()).cloned()
    }

    fn attribute(&self, _element: &str, _attr: &str) -> Option<AttributeDecl> {
        // The built-in HTML table carries no attribute defaults; a caller
        // who needs `checked`/`selected`-style defaults supplies their own
        // `Dtd` (spec §4.10: "caller may supply their own Dtd instead").
        None
    }

    fn entity(&self, name: &str) -> Option<&str> {
        self.entities.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_elements_are_empty() {
        let dtd = HtmlDtd::new();
        assert!(dtd.is_empty_element("BR"));
        assert!(!dtd.is_empty_element("div"));
    }

    #[test]
    fn script_is_cdata() {
        let dtd = HtmlDtd::new();
        assert!(dtd.is_cdata_element("script"));
        assert!(!dtd.is_cdata_element("span"));
    }

    #[test]
    fn li_closes_a_prior_li() {
        let dtd = HtmlDtd::new();
        let decl = dtd.element("li").unwrap();
        assert_eq!(decl.closes, vec!["li".to_string()]);
    }

    #[test]
    fn named_entity_lookup() {
        let dtd = HtmlDtd::new();
        assert_eq!(dtd.entity("nbsp"), Some("\u{00A0}"));
        assert_eq!(dtd.entity("bogus"), None);
    }
}
