use std::rc::Rc;

use pretty_assertions::assert_eq;
use sgml_reader::{CaseFolding, HtmlDtd, NodeKind, Reader, ReaderConfig, WhitespaceHandling};

fn html_reader(src: &str) -> Reader {
    let config = ReaderConfig::new()
        .with_doc_type("html")
        .with_dtd(Rc::new(HtmlDtd::new()));
    Reader::new(src, config)
}

struct Event {
    kind: NodeKind,
    name: String,
    value: String,
    simulated: bool,
}

/// Reads the whole document, discarding the leading `Document` node every
/// reader reports first (spec §4.5's `Initial` state) so callers can assert
/// against just the content events.
fn drain(r: &mut Reader) -> Vec<Event> {
    assert!(r.read().unwrap());
    assert_eq!(r.node_kind(), NodeKind::Document);
    let mut out = Vec::new();
    while r.read().unwrap() {
        out.push(Event {
            kind: r.node_kind(),
            name: r.name().to_string(),
            value: r.value().to_string(),
            simulated: r.is_simulated(),
        });
    }
    out
}

#[test]
fn unquoted_attribute_value_is_repaired_and_wrapped_in_html() {
    // scenario 1 (spec): `<p class=foo>x</p>` -> `<html><p class="foo">x</p></html>`
    let mut r = html_reader("<p class=foo>x</p>");
    let events = drain(&mut r);

    assert_eq!(events[0].kind, NodeKind::Element);
    assert_eq!(events[0].name, "html");
    assert!(events[0].simulated);

    assert_eq!(events[1].kind, NodeKind::Element);
    assert_eq!(events[1].name, "p");
    assert!(!events[1].simulated);

    assert_eq!(events[2].kind, NodeKind::Text);
    assert_eq!(events[2].value, "x");

    assert_eq!(events[3].kind, NodeKind::EndElement);
    assert_eq!(events[3].name, "p");

    assert_eq!(events[4].kind, NodeKind::EndElement);
    assert_eq!(events[4].name, "html");
    assert!(events[4].simulated);
}

#[test]
fn unquoted_attribute_value_is_readable_after_the_fact() {
    let mut r = html_reader("<p class=foo>x</p>");
    assert!(r.read().unwrap()); // Document
    assert!(r.read().unwrap()); // html wrapper
    assert!(r.read().unwrap()); // p
    assert_eq!(r.get_attribute("class"), Some("foo"));
}

#[test]
fn missing_close_tag_is_auto_closed_by_next_sibling_start() {
    // scenario 2 (spec): `<p>a<p>b</p>` -> two sibling `p`s, both closed,
    // since the HTML DTD says a new `p` closes a still-open `p`.
    let mut r = html_reader("<p>a<p>b</p>");
    let events = drain(&mut r);

    let kinds: Vec<(NodeKind, &str, bool)> = events
        .iter()
        .map(|e| (e.kind, e.name.as_str(), e.simulated))
        .collect();

    assert_eq!(
        kinds,
        vec![
            (NodeKind::Element, "html", true),
            (NodeKind::Element, "p", false),
            (NodeKind::Text, "", false),
            (NodeKind::EndElement, "p", true),
            (NodeKind::Element, "p", false),
            (NodeKind::Text, "", false),
            (NodeKind::EndElement, "p", false),
            (NodeKind::EndElement, "html", true),
        ]
    );
    assert_eq!(events[2].value, "a");
    assert_eq!(events[5].value, "b");
}

#[test]
fn second_root_element_is_dropped() {
    let mut r = Reader::from_str("<a/><b/>");
    let events = drain(&mut r);
    // only the first root survives (start + its own end); the second
    // top-level element is dropped and the reader moves straight to Eof
    // rather than emitting it (spec §4.6).
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, NodeKind::Element);
    assert_eq!(events[0].name, "a");
    assert_eq!(events[1].kind, NodeKind::EndElement);
    assert_eq!(events[1].name, "a");
}

#[test]
fn malformed_quote_trailer_is_dropped_not_kept_as_a_bogus_attribute() {
    // scenario 3 (spec): `<a href="foo"bar">ok</a>` -> `href="foo"` only,
    // the run-on `bar"` glued onto the closed quote is dropped.
    let mut r = html_reader(r#"<a href="foo"bar">ok</a>"#);
    assert!(r.read().unwrap()); // Document
    assert!(r.read().unwrap()); // html wrapper
    assert!(r.read().unwrap()); // a
    assert_eq!(r.attribute_count(), 1);
    assert_eq!(r.get_attribute("href"), Some("foo"));
}

#[test]
fn script_body_is_reported_as_cdata_not_markup() {
    // scenario 4 (spec): `<script>x<y></script>` -> CDATA body `x<y`.
    let mut r = html_reader("<script>x<y></script>");
    let events = drain(&mut r);

    let script = events
        .iter()
        .find(|e| e.kind == NodeKind::Element && e.name == "script")
        .unwrap();
    assert!(!script.simulated);

    let body = events.iter().find(|e| e.kind == NodeKind::CData).unwrap();
    assert_eq!(body.value, "x<y");
}

#[test]
fn embedded_comment_inside_script_body_is_split_into_its_own_event() {
    // the classic browser-hiding-comment idiom: the comment is reported as
    // its own Comment event, not swallowed into the script's CDATA body.
    let mut r = html_reader("<script><!--\nvar x = 1;\n//--></script>");
    let events = drain(&mut r);

    let kinds: Vec<(NodeKind, &str)> = events.iter().map(|e| (e.kind, e.name.as_str())).collect();
    assert_eq!(
        kinds,
        vec![
            (NodeKind::Element, "html"),
            (NodeKind::Element, "script"),
            (NodeKind::Comment, ""),
            (NodeKind::EndElement, "script"),
            (NodeKind::EndElement, "html"),
        ]
    );
    assert_eq!(events[2].value, "\nvar x = 1;\n//");
}

#[test]
fn comment_double_dash_is_rewritten_and_trailing_dash_gets_a_space() {
    // scenario 5 (spec): `<!-- a -- b -->` -> comment text `" a - b "`.
    let mut r = Reader::from_str("<!-- a -- b -->");
    let events = drain(&mut r);
    assert_eq!(events[0].kind, NodeKind::Comment);
    assert_eq!(events[0].value, " a - b ");
}

#[test]
fn comment_ending_in_dash_gets_a_safety_space() {
    let mut r = Reader::from_str("<!--abc---->");
    let events = drain(&mut r);
    assert_eq!(events[0].kind, NodeKind::Comment);
    assert!(events[0].value.ends_with("- "));
}

#[test]
fn boolean_attribute_defaults_value_to_its_own_name() {
    // scenario 6 (spec): `<p foo>done</p>` -> attribute `foo="foo"`.
    let mut r = html_reader("<p foo>done</p>");
    assert!(r.read().unwrap()); // Document
    assert!(r.read().unwrap()); // html wrapper
    assert!(r.read().unwrap()); // p
    assert_eq!(r.get_attribute("foo"), Some("foo"));
}

#[test]
fn whitespace_suppressed_when_handling_is_none() {
    let config = ReaderConfig::new().with_whitespace_handling(WhitespaceHandling::None);
    let mut r = Reader::new("<a>  <b/></a>", config);
    let events = drain(&mut r);
    assert!(events.iter().all(|e| e.kind != NodeKind::Whitespace));
}

#[test]
fn whitespace_is_tagged_distinctly_by_default() {
    let mut r = Reader::from_str("<a>  <b/></a>");
    let events = drain(&mut r);
    assert!(events.iter().any(|e| e.kind == NodeKind::Whitespace));
}

#[test]
fn strip_doctype_suppresses_the_doctype_event() {
    let config = ReaderConfig::new().with_strip_doctype(true);
    let mut r = Reader::new("<!DOCTYPE html><a/>", config);
    let events = drain(&mut r);
    assert!(events.iter().all(|e| e.kind != NodeKind::DocType));
    assert_eq!(events[0].name, "a");
}

#[test]
fn doctype_is_reported_when_not_stripped() {
    let config = ReaderConfig::new().with_strip_doctype(false);
    let mut r = Reader::new("<!DOCTYPE html><a/>", config);
    let events = drain(&mut r);
    assert_eq!(events[0].kind, NodeKind::DocType);
}

#[test]
fn doctype_is_stripped_by_default() {
    let mut r = Reader::from_str("<!DOCTYPE html><a/>");
    let events = drain(&mut r);
    assert!(events.iter().all(|e| e.kind != NodeKind::DocType));
    assert_eq!(events[0].name, "a");
}

#[test]
fn case_folding_lowercases_every_element_and_attribute_name() {
    let config = ReaderConfig::new().with_case_folding(CaseFolding::Lower);
    let mut r = Reader::new("<DIV ID=\"x\"></DIV>", config);
    assert!(r.read().unwrap()); // Document
    assert!(r.read().unwrap()); // div
    assert_eq!(r.name(), "div");
    assert_eq!(r.get_attribute("id"), Some("x"));
}

#[test]
fn case_folding_uppercases_every_element_and_attribute_name() {
    let config = ReaderConfig::new().with_case_folding(CaseFolding::Upper);
    let mut r = Reader::new("<div id=\"x\"></div>", config);
    assert!(r.read().unwrap()); // Document
    assert!(r.read().unwrap()); // DIV
    assert_eq!(r.name(), "DIV");
    assert_eq!(r.get_attribute("ID"), Some("x"));
}

#[test]
fn duplicate_attribute_names_are_collapsed_to_the_first_occurrence() {
    let mut r = Reader::from_str(r#"<a id="1" id="2"></a>"#);
    assert!(r.read().unwrap()); // Document
    assert!(r.read().unwrap()); // a
    assert_eq!(r.attribute_count(), 1);
    assert_eq!(r.get_attribute("id"), Some("1"));
}

#[test]
fn second_table_row_auto_closes_the_entire_first_row_not_just_its_cell() {
    // `<tr>` closes a still-open `tr`/`td`/`th` ancestor; the cascade must
    // reach past the innermost open `td` and close the whole first `tr`,
    // so the second row becomes a sibling of the first instead of nesting
    // inside it.
    let mut r = html_reader("<table><tr><td>1<tr><td>2</table>");
    let events = drain(&mut r);
    let kinds: Vec<(NodeKind, &str)> = events.iter().map(|e| (e.kind, e.name.as_str())).collect();

    assert_eq!(
        kinds,
        vec![
            (NodeKind::Element, "html"),
            (NodeKind::Element, "table"),
            (NodeKind::Element, "tr"),
            (NodeKind::Element, "td"),
            (NodeKind::Text, ""),
            (NodeKind::EndElement, "td"),
            (NodeKind::EndElement, "tr"),
            (NodeKind::Element, "tr"),
            (NodeKind::Element, "td"),
            (NodeKind::Text, ""),
            (NodeKind::EndElement, "td"),
            (NodeKind::EndElement, "tr"),
            (NodeKind::EndElement, "table"),
            (NodeKind::EndElement, "html"),
        ]
    );
}

#[test]
fn void_elements_are_empty_and_never_get_a_literal_end_tag() {
    let mut r = html_reader("<br>after");
    let events = drain(&mut r);
    let br = events.iter().find(|e| e.name == "br").unwrap();
    assert_eq!(br.kind, NodeKind::Element);

    let br_end_count = events
        .iter()
        .filter(|e| e.kind == NodeKind::EndElement && e.name == "br")
        .count();
    assert_eq!(br_end_count, 1);
}

#[test]
fn mismatched_end_tag_cascades_closes_to_the_matching_ancestor() {
    let mut r = Reader::from_str("<a><b><c>x</a>");
    let events = drain(&mut r);
    let ends: Vec<&str> = events
        .iter()
        .filter(|e| e.kind == NodeKind::EndElement)
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(ends, vec!["c", "b", "a"]);
    // the `</a>` only literally closed `a`; `b` and `c` were cascaded shut.
    assert!(events.iter().any(|e| e.name == "c" && e.kind == NodeKind::EndElement && e.simulated));
    assert!(events.iter().any(|e| e.name == "a" && e.kind == NodeKind::EndElement && !e.simulated));
}

#[test]
fn unclosed_elements_are_auto_closed_at_end_of_document() {
    let mut r = Reader::from_str("<a><b>x");
    let events = drain(&mut r);
    let ends: Vec<&str> = events
        .iter()
        .filter(|e| e.kind == NodeKind::EndElement)
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(ends, vec!["b", "a"]);
}

#[test]
fn numeric_entity_above_the_bmp_decodes_directly() {
    let mut r = Reader::from_str("<a>&#x1D11E;</a>");
    assert!(r.read().unwrap()); // Document
    assert!(r.read().unwrap()); // a
    assert!(r.read().unwrap()); // text
    assert_eq!(r.value(), "\u{1D11E}");
}

#[test]
fn numeric_entity_surrogate_pair_combines_into_one_char() {
    // U+1F600 GRINNING FACE as a UTF-16 surrogate pair: D83D DE00.
    let mut r = Reader::from_str("<a>&#55357;&#56832;</a>");
    assert!(r.read().unwrap()); // Document
    assert!(r.read().unwrap()); // a
    assert!(r.read().unwrap()); // text
    assert_eq!(r.value(), "\u{1F600}");
}

#[test]
fn undefined_entity_is_kept_verbatim() {
    let mut r = Reader::from_str("<a>&bogus;</a>");
    assert!(r.read().unwrap()); // Document
    assert!(r.read().unwrap()); // a
    assert!(r.read().unwrap()); // text
    assert_eq!(r.value(), "&bogus;");
}

#[test]
fn every_start_event_has_a_later_matching_end_at_the_same_depth() {
    let mut r = html_reader("<ul><li>one<li>two<li>three</ul>");
    let mut stack: Vec<(String, usize)> = Vec::new();
    loop {
        if !r.read().unwrap() {
            break;
        }
        match r.node_kind() {
            NodeKind::Element if !r.is_empty_element() => stack.push((r.name().to_string(), r.depth())),
            NodeKind::EndElement => {
                let (name, depth) = stack.pop().expect("unbalanced end event");
                assert_eq!(name, r.name());
                assert_eq!(depth, r.depth());
            }
            _ => {}
        }
    }
    assert!(stack.is_empty());
}
