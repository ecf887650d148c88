//! Attribute record (component **C**, spec §3/§4.2) and the ordered,
//! duplicate-checked collection of them that lives on every [`crate::node::Node`].
//!
//! Grounded on `quick_xml::events::attributes::Attribute` for the record
//! shape (`key`/`value`), simplified to an owned record (see SPEC_FULL.md —
//! names here are case-folded and must outlive the source buffer once a
//! synthetic close cascades past it) and extended with the DTD-default
//! linkage spec §3 requires.

use std::rc::Rc;

use crate::dtd::AttributeDecl;
use crate::stack::Reset;

/// One attribute of an element: a case-normalized name, its literal value
/// (if the input actually wrote one), the quote character used, and an
/// optional link to a DTD default.
#[derive(Debug, Default, Clone)]
pub struct Attribute {
    name: String,
    literal: Option<String>,
    quote: Option<char>,
    dtd_default: Option<Rc<AttributeDecl>>,
}

impl Reset for Attribute {
    fn reset(&mut self) {
        self.name.clear();
        self.literal = None;
        self.quote = None;
        self.dtd_default = None;
    }
}

impl Attribute {
    pub(crate) fn init(&mut self, name: String, literal: Option<String>, quote: Option<char>) {
        self.name = name;
        self.literal = literal;
        self.quote = quote;
        self.dtd_default = None;
    }

    /// Case-normalized attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The quote character used in the source (`"`, `'`), or `None` if the
    /// value was unquoted or absent.
    pub fn quote_char(&self) -> Option<char> {
        self.quote
    }

    /// The effective value: the literal if present, else the DTD default,
    /// else absent.
    pub fn value(&self) -> Option<&str> {
        self.literal
            .as_deref()
            .or_else(|| self.dtd_default.as_ref().and_then(|d| d.default_value.as_deref()))
    }

    /// True iff there was no literal value in the source and the effective
    /// value (if any) came from the DTD.
    pub fn is_default(&self) -> bool {
        self.literal.is_none()
    }

    pub(crate) fn attach_dtd_decl(&mut self, decl: Rc<AttributeDecl>) {
        self.dtd_default = Some(decl);
    }

    /// The DTD attribute declaration backing this attribute, if any (gives
    /// access to its declared type, not just its default value).
    pub fn dtd_decl(&self) -> Option<&AttributeDecl> {
        self.dtd_default.as_deref()
    }
}

/// Ordered, duplicate-checked collection of attributes on one element.
///
/// Mirrors spec §4.2: `add_attribute` silently refuses a duplicate (by
/// name, honoring the configured case sensitivity), callers elsewhere treat
/// the refusal as the "drop subsequent occurrences, log" policy of spec §7.
#[derive(Debug, Default, Clone)]
pub struct AttributeSet {
    attrs: Vec<Attribute>,
}

impl AttributeSet {
    pub fn clear(&mut self) {
        self.attrs.clear();
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn get_by_index(&self, index: usize) -> Option<&Attribute> {
        self.attrs.get(index)
    }

    pub fn get_index_by_name(&self, name: &str, case_insensitive: bool) -> Option<usize> {
        self.attrs.iter().position(|a| name_eq(&a.name, name, case_insensitive))
    }

    pub fn get_by_name(&self, name: &str, case_insensitive: bool) -> Option<&Attribute> {
        self.get_index_by_name(name, case_insensitive)
            .map(|i| &self.attrs[i])
    }

    /// Adds a new attribute. Returns `None` without modifying the set if an
    /// attribute with the same name (per `case_insensitive`) already exists.
    pub fn add_attribute(
        &mut self,
        name: String,
        value: Option<String>,
        quote: Option<char>,
        case_insensitive: bool,
    ) -> Option<&mut Attribute> {
        if self.get_index_by_name(&name, case_insensitive).is_some() {
            return None;
        }
        let mut attr = Attribute::default();
        attr.init(name, value, quote);
        self.attrs.push(attr);
        self.attrs.last_mut()
    }

    pub fn remove_attribute(&mut self, name: &str, case_insensitive: bool) -> bool {
        match self.get_index_by_name(name, case_insensitive) {
            Some(i) => {
                self.attrs.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.attrs.iter()
    }
}

fn name_eq(a: &str, b: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_attribute_is_refused() {
        let mut set = AttributeSet::default();
        assert!(set.add_attribute("id".into(), Some("a".into()), Some('"'), true).is_some());
        assert!(set.add_attribute("ID".into(), Some("b".into()), Some('"'), true).is_none());
        assert_eq!(set.len(), 1);
        assert_eq!(set.get_by_index(0).unwrap().value(), Some("a"));
    }

    #[test]
    fn value_falls_back_to_nothing_without_default() {
        let mut set = AttributeSet::default();
        set.add_attribute("disabled".into(), None, None, true);
        let a = set.get_by_name("disabled", true).unwrap();
        assert!(a.is_default());
        assert_eq!(a.value(), None);
    }
}
