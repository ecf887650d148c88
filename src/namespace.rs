//! Namespace resolution (component **G**, spec §4.13): walks the element
//! stack's `xmlns`/`xmlns:prefix` declarations to resolve a prefix to a URI,
//! assigning a stable placeholder to prefixes used without ever being
//! declared (ill-formed input spec §1 explicitly expects to see repaired,
//! not rejected).
//!
//! Grounded on `quick_xml::reader::ns_reader`'s scope-stack shape (one
//! binding map pushed per open element, popped on close) together with
//! `quick_xml::name::NamespaceResolver`'s prefix/URI table, adapted to
//! track same-named placeholders for prefixes that are never declared,
//! which quick-xml (well-formed input only) never needs to do.

use std::collections::HashMap;

pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";

/// One element's worth of `xmlns`/`xmlns:prefix` bindings.
#[derive(Debug, Default, Clone)]
struct Scope {
    default_uri: Option<String>,
    prefixes: HashMap<String, String>,
}

/// Resolves prefixes against the bindings in scope on the current element
/// stack, synthesizing a stable placeholder URI for any prefix that is used
/// but was never declared.
#[derive(Debug, Default)]
pub struct NamespaceResolver {
    scopes: Vec<Scope>,
    unknown: HashMap<String, String>,
    next_unknown: usize,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a new, empty scope for the element about to be opened.
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pops the scope belonging to the element that just closed.
    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Records an `xmlns="uri"` or `xmlns:prefix="uri"` declaration on the
    /// current (topmost) scope. `prefix` is `None` for the default
    /// namespace.
    pub fn declare(&mut self, prefix: Option<&str>, uri: &str) {
        let Some(scope) = self.scopes.last_mut() else { return };
        match prefix {
            None => scope.default_uri = Some(uri.to_string()),
            Some(p) => {
                scope.prefixes.insert(p.to_string(), uri.to_string());
            }
        }
    }

    /// Resolves the default namespace in scope (`None` if undeclared —
    /// unprefixed elements with no default namespace are simply not
    /// namespaced, this is not an error).
    pub fn resolve_default(&self) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.default_uri.as_deref())
    }

    /// Resolves `prefix` to a URI by walking the scope stack from innermost
    /// to outermost. Reserved prefixes (`xml`, `xmlns`) always resolve to
    /// their fixed URIs regardless of declarations.
    pub fn resolve(&mut self, prefix: &str) -> &str {
        if prefix == "xml" {
            return XML_URI;
        }
        if prefix == "xmlns" {
            return XMLNS_URI;
        }
        if let Some(uri) = self
            .scopes
            .iter()
            .rev()
            .find_map(|s| s.prefixes.get(prefix))
        {
            return uri;
        }
        self.unknown_placeholder(prefix)
    }

    fn unknown_placeholder(&mut self, prefix: &str) -> &str {
        if !self.unknown.contains_key(prefix) {
            let placeholder = if self.next_unknown == 0 {
                "#unknown".to_string()
            } else {
                format!("#unknown{}", self.next_unknown)
            };
            self.next_unknown += 1;
            self.unknown.insert(prefix.to_string(), placeholder);
        }
        self.unknown.get(prefix).expect("just inserted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_declared_prefix_from_enclosing_scope() {
        let mut ns = NamespaceResolver::new();
        ns.push_scope();
        ns.declare(Some("x"), "urn:x");
        ns.push_scope();
        assert_eq!(ns.resolve("x"), "urn:x");
    }

    #[test]
    fn reserved_prefixes_ignore_declarations() {
        let mut ns = NamespaceResolver::new();
        ns.push_scope();
        assert_eq!(ns.resolve("xml"), XML_URI);
        assert_eq!(ns.resolve("xmlns"), XMLNS_URI);
    }

    #[test]
    fn undeclared_prefix_gets_stable_placeholder() {
        let mut ns = NamespaceResolver::new();
        ns.push_scope();
        let first = ns.resolve("foo").to_string();
        let second = ns.resolve("foo").to_string();
        assert_eq!(first, second);
        let other = ns.resolve("bar").to_string();
        assert_ne!(first, other);
    }

    #[test]
    fn pop_scope_forgets_its_declarations() {
        let mut ns = NamespaceResolver::new();
        ns.push_scope();
        ns.declare(Some("x"), "urn:x");
        ns.pop_scope();
        ns.push_scope();
        // no longer declared; now falls back to the unknown-prefix path
        assert_eq!(ns.resolve("x"), "#unknown");
    }
}
