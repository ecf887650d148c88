//! Name validity and case folding (spec §4.9).
//!
//! Grounded on `quick_xml::name`'s `QName`/`LocalName` split for the
//! qualified-name/prefix/local-name shape, with the validity predicates
//! themselves written directly against the XML 1.0 `Name`/`NCName`
//! productions (quick-xml does not validate names at all, trusting
//! well-formed input; this reader cannot, since repairing ill-formed markup
//! is the entire point).

/// How element and attribute names are folded before being reported or
/// compared (spec §4.9 / §6.1 `case_folding`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseFolding {
    /// Names are reported exactly as they appear in the source.
    #[default]
    None,
    /// Names are folded to ASCII uppercase.
    Upper,
    /// Names are folded to ASCII lowercase.
    Lower,
}

impl CaseFolding {
    pub fn apply(self, name: &str) -> String {
        match self {
            CaseFolding::None => name.to_string(),
            CaseFolding::Upper => name.to_ascii_uppercase(),
            CaseFolding::Lower => name.to_ascii_lowercase(),
        }
    }
}

pub(crate) fn is_name_start_char(c: char) -> bool {
    c == ':'
        || c == '_'
        || c.is_ascii_alphabetic()
        || (!c.is_ascii() && c.is_alphabetic())
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c) || c == '-' || c == '.' || c.is_ascii_digit() || c == '\u{B7}'
}

/// True if `s` is a valid XML `Name` (may contain `:`).
pub fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_name_start_char(c) => {}
        _ => return false,
    }
    chars.all(is_name_char)
}

/// True if `s` is a valid XML `NCName` (no `:`, used for namespace-aware
/// local names and prefixes).
pub fn is_valid_ncname(s: &str) -> bool {
    is_valid_name(s) && !s.contains(':')
}

/// True if `s` is a valid XML `Nmtoken` (any run of name characters; unlike
/// `Name` it may start with a digit, `-`, or `.`).
pub fn is_valid_nmtoken(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_name_char)
}

/// A qualified name split into an optional prefix and a local part, without
/// resolving the prefix to a namespace URI (that's [`crate::namespace`]'s job).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub local: &'a str,
}

impl<'a> QName<'a> {
    pub fn parse(qualified: &'a str) -> QName<'a> {
        match qualified.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => {
                QName { prefix: Some(prefix), local }
            }
            _ => QName { prefix: None, local: qualified },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(is_valid_name("div"));
        assert!(is_valid_name("xml:lang"));
        assert!(is_valid_name("_foo"));
        assert!(!is_valid_name("1foo"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn ncname_rejects_colon() {
        assert!(is_valid_ncname("div"));
        assert!(!is_valid_ncname("xml:lang"));
    }

    #[test]
    fn nmtoken_allows_leading_digit() {
        assert!(is_valid_nmtoken("123"));
        assert!(is_valid_nmtoken("-abc"));
        assert!(!is_valid_nmtoken(""));
    }

    #[test]
    fn case_folding_variants() {
        assert_eq!(CaseFolding::Upper.apply("Div"), "DIV");
        assert_eq!(CaseFolding::Lower.apply("Div"), "div");
        assert_eq!(CaseFolding::None.apply("Div"), "Div");
    }

    #[test]
    fn qname_splits_prefix() {
        let q = QName::parse("xml:lang");
        assert_eq!(q.prefix, Some("xml"));
        assert_eq!(q.local, "lang");
        let q2 = QName::parse("div");
        assert_eq!(q2.prefix, None);
        assert_eq!(q2.local, "div");
    }
}
