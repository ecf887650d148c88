//! A pull-style reader that repairs ill-formed SGML/HTML markup into a
//! well-formed stream of XML-like nodes.
//!
//! ## Description
//!
//! - [`Reader`]: a low level pull-reader modeled on `System.Xml.XmlReader`'s
//!   contract — call [`Reader::read`], then query the node it positioned on
//!   through [`Reader::node_kind`]/[`Reader::name`]/[`Reader::value`] and
//!   friends, rather than matching on a returned event enum.
//! - Ill-formed input (mismatched end tags, unclosed elements, HTML void
//!   elements, end-tag-optional containment like a bare `<li>`) is repaired
//!   in place instead of rejected; [`HtmlDtd`] supplies the built-in HTML
//!   repair rules, and a caller can supply their own [`Dtd`] instead.
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use sgml_reader::{HtmlDtd, NodeKind, Reader, ReaderConfig};
//!
//! let html = r#"<ul><li>one<li>two</ul>"#;
//! let config = ReaderConfig::new().with_dtd(Rc::new(HtmlDtd::new()));
//! let mut reader = Reader::new(html, config);
//!
//! let mut closes = Vec::new();
//! while reader.read().unwrap() {
//!     if reader.node_kind() == NodeKind::EndElement {
//!         closes.push((reader.name().to_string(), reader.is_simulated()));
//!     }
//! }
//! // the first `<li>` never had a literal end tag; it was auto-closed
//! // by the second `<li>` per HTML's end-tag-optional containment rule.
//! assert_eq!(
//!     closes,
//!     vec![
//!         ("li".to_string(), true),
//!         ("li".to_string(), true),
//!         ("ul".to_string(), false),
//!     ]
//! );
//! ```
#![forbid(unsafe_code)]

mod attribute;
mod config;
mod dtd;
mod entity;
mod error;
mod escape;
mod name;
mod namespace;
mod node;
mod reader;
mod stack;
mod state;

pub use attribute::{Attribute, AttributeSet};
pub use config::{ReaderConfig, WhitespaceHandling};
pub use dtd::{AttributeDecl, ContentModel, Dtd, ElementDecl, HtmlDtd};
pub use entity::{Entity, Position};
pub use error::{Diagnostic, DiagnosticSink, Error, LogDiagnostics, Result};
pub use escape::{escape_attribute, escape_text};
pub use name::{is_valid_name, is_valid_ncname, is_valid_nmtoken, CaseFolding, QName};
pub use node::{NodeKind, XmlSpace};
pub use reader::Reader;
