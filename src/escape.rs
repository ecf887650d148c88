//! Character entity expansion (spec §4.11) and XML text/attribute escaping
//! for the serialization helpers (`read_outer_xml`/`read_inner_xml`).
//!
//! Grounded on `quick_xml::escapei`'s `escape`/`unescape` (the surrounding
//! match-on-named-entity and numeric-reference decoding shape), adapted to
//! work a character at a time against [`crate::entity::Entity`] instead of
//! a byte slice, and to combine UTF-16 surrogate pairs into a single scalar
//! (see SPEC_FULL.md §4.11 for why that adaptation is necessary here).

use crate::dtd::Dtd;
use crate::entity::Entity;

/// Outcome of expanding one `&...;` reference.
pub enum Expansion {
    /// The reference decoded to text, which the caller should append.
    Text(String),
    /// The reference was undefined or malformed; keep the literal source
    /// text instead (spec §7: "keep literal, do not drop characters").
    Literal(String),
}

/// Hard-coded fast path for the five predefined XML entities (spec §4.11).
fn builtin_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decodes one numeric reference body (the part between `#` and the
/// optional trailing `;`), which has already been fully scanned into
/// `digits` (hex digits if `hex`, decimal otherwise). Returns `None` if the
/// digits do not form a valid Unicode scalar value on their own — callers
/// combining surrogate pairs handle that case themselves.
fn decode_numeric(digits: &str, hex: bool) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, if hex { 16 } else { 10 }).ok()
}

const HIGH_SURROGATE: std::ops::RangeInclusive<u32> = 0xD800..=0xDBFF;
const LOW_SURROGATE: std::ops::RangeInclusive<u32> = 0xDC00..=0xDFFF;

fn combine_surrogates(high: u32, low: u32) -> u32 {
    0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
}

/// Expands a character reference or entity reference. `entity` must be
/// positioned just *after* the leading `&`. On return, `entity`'s position
/// is just after the reference (including the trailing `;` if one was
/// present and consumed).
///
/// `dtd` supplies definitions for named entities beyond the five built-in
/// ones (spec §4.11: "Otherwise look up in the DTD entity table").
pub fn expand_entity(entity: &mut Entity, dtd: Option<&dyn Dtd>) -> Expansion {
    let mut name = String::new();
    name.push('&');

    if entity.peek_char() == Some('#') {
        name.push('#');
        entity.read_char();
        let hex = entity.peek_char() == Some('x') || entity.peek_char() == Some('X');
        if hex {
            name.push(entity.read_char().unwrap_or('x'));
        }
        let mut digits = String::new();
        entity.scan_token(&mut digits, |c| c == ';' || !(c.is_ascii_hexdigit()));
        name.push_str(&digits);
        let had_semicolon = entity.peek_char() == Some(';');
        if had_semicolon {
            entity.read_char();
            name.push(';');
        }

        match decode_numeric(&digits, hex) {
            Some(code) if HIGH_SURROGATE.contains(&code) => {
                // Look ahead for an immediately following low surrogate
                // reference and combine them into one scalar value.
                let lookahead_mark = entity.mark();
                if entity.peek_char() == Some('&') {
                    entity.read_char();
                    let low_hex =
                        entity.peek_char() == Some('#') && {
                            entity.read_char();
                            entity.peek_char() == Some('x') || entity.peek_char() == Some('X')
                        };
                    if low_hex {
                        entity.read_char();
                    }
                    let mut low_digits = String::new();
                    entity.scan_token(&mut low_digits, |c| c == ';' || !c.is_ascii_hexdigit());
                    let low = decode_numeric(&low_digits, low_hex);
                    if entity.peek_char() == Some(';') {
                        entity.read_char();
                    }
                    if let Some(low) = low.filter(|l| LOW_SURROGATE.contains(l)) {
                        let scalar = combine_surrogates(code, low);
                        if let Some(c) = char::from_u32(scalar) {
                            return Expansion::Text(c.to_string());
                        }
                    }
                }
                entity.reset(lookahead_mark);
                Expansion::Text('\u{FFFD}'.to_string())
            }
            Some(code) if LOW_SURROGATE.contains(&code) => {
                // A lone low surrogate: malformed, but do not drop data.
                Expansion::Text('\u{FFFD}'.to_string())
            }
            Some(code) => match char::from_u32(code) {
                Some(c) => Expansion::Text(c.to_string()),
                None => Expansion::Text('\u{FFFD}'.to_string()),
            },
            None => Expansion::Literal(name),
        }
    } else {
        let mut body = String::new();
        entity.scan_token(&mut body, |c| c == ';' || c.is_ascii_whitespace() || c == '&' || c == '<');
        name.push_str(&body);
        let had_semicolon = entity.peek_char() == Some(';');
        if had_semicolon {
            entity.read_char();
            name.push(';');
        }

        if let Some(c) = builtin_entity(&body) {
            return Expansion::Text(c.to_string());
        }
        if let Some(dtd) = dtd {
            if let Some(value) = dtd.entity(&body) {
                return Expansion::Text(value.to_string());
            }
        }
        log::warn!("undefined entity `&{body};`, keeping literal");
        Expansion::Literal(name)
    }
}

/// Escapes text content for serialization (`read_outer_xml`/`read_inner_xml`
/// and diagnostic rendering): `&`, `<`, `>` only, matching XML text rules.
pub fn escape_text(raw: &str) -> std::borrow::Cow<'_, str> {
    if !raw.bytes().any(|b| matches!(b, b'&' | b'<' | b'>')) {
        return std::borrow::Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    std::borrow::Cow::Owned(out)
}

/// Escapes an attribute value for serialization: text escapes plus `"`.
pub fn escape_attribute(raw: &str) -> std::borrow::Cow<'_, str> {
    if !raw.bytes().any(|b| matches!(b, b'&' | b'<' | b'>' | b'"')) {
        return std::borrow::Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    std::borrow::Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(s: &str) -> (String, usize) {
        let mut e = Entity::new("doc", None, s);
        match expand_entity(&mut e, None) {
            Expansion::Text(t) | Expansion::Literal(t) => (t, e.mark()),
        }
    }

    #[test]
    fn builtin_entities() {
        assert_eq!(expand("amp;").0, "&");
        assert_eq!(expand("lt;").0, "<");
    }

    #[test]
    fn numeric_decimal_and_hex() {
        assert_eq!(expand("#48;").0, "0");
        assert_eq!(expand("#x30;").0, "0");
    }

    #[test]
    fn missing_semicolon_keeps_going() {
        let mut e = Entity::new("doc", None, "#48rest");
        let out = match expand_entity(&mut e, None) {
            Expansion::Text(t) | Expansion::Literal(t) => t,
        };
        assert_eq!(out, "0");
        let mut rest = String::new();
        e.scan_token(&mut rest, |_| false);
        assert_eq!(rest, "rest");
    }

    #[test]
    fn undefined_entity_kept_literal() {
        assert_eq!(expand("zzz;").0, "&zzz;");
    }

    #[test]
    fn surrogate_pair_combines_to_one_scalar() {
        // U+1F600 GRINNING FACE = surrogate pair D83D DE00 = decimal 55357 56832
        let mut e = Entity::new("doc", None, "#55357;&#56832;");
        let out = match expand_entity(&mut e, None) {
            Expansion::Text(t) | Expansion::Literal(t) => t,
        };
        assert_eq!(out, "\u{1F600}");
    }

    #[test]
    fn escaping_text_and_attributes() {
        assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_attribute("\"q\""), "&quot;q&quot;");
    }
}
