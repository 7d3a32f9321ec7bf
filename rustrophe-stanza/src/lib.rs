// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A minimal XML element tree for XMPP stanzas.
//!
//! A [`Stanza`] is an owned tree: a name, an optional namespace, a map of
//! attributes (keys unique, last write wins), ordered child elements, and
//! optional text content. Tokenization on the parse path is delegated to
//! [`rxml`]; serialization is a plain escaped writer.
//!
//! This crate knows nothing about streams or sockets. The wire-level
//! framing of a live XMPP connection lives in the `rustrophe` crate and
//! reuses [`TreeBuilder`] from here.

#![deny(unsafe_code, bare_trait_objects)]

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rxml::EventRead;

mod error;
pub mod tree_builder;

pub use error::Error;
pub use tree_builder::TreeBuilder;

/// An XML element as exchanged over an XMPP stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stanza {
    name: String,
    ns: Option<String>,
    attrs: BTreeMap<String, String>,
    children: Vec<Stanza>,
    text: Option<String>,
}

impl Stanza {
    /// Create an empty element with the given name and no namespace.
    pub fn new(name: impl Into<String>) -> Stanza {
        Stanza {
            name: name.into(),
            ns: None,
            attrs: BTreeMap::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub(crate) fn from_parts(
        ns: Option<String>,
        name: String,
        attrs: BTreeMap<String, String>,
    ) -> Stanza {
        Stanza {
            name,
            ns,
            attrs,
            children: Vec::new(),
            text: None,
        }
    }

    /// Set the namespace, builder style.
    pub fn with_ns(mut self, ns: impl Into<String>) -> Stanza {
        self.ns = Some(ns.into());
        let ns = self.ns.clone();
        for child in &mut self.children {
            child.normalize_ns(ns.as_deref());
        }
        self
    }

    /// Set an attribute, builder style.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Stanza {
        self.set_attr(name, value);
        self
    }

    /// Set the text content, builder style.
    pub fn with_text(mut self, text: impl Into<String>) -> Stanza {
        self.set_text(text);
        self
    }

    /// Append a child, builder style.
    pub fn with_child(mut self, child: Stanza) -> Stanza {
        self.append_child(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ns(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    /// Does this element have the given name and namespace?
    pub fn is(&self, name: &str, ns: &str) -> bool {
        self.name == name && self.ns.as_deref() == Some(ns)
    }

    /// Get an attribute value. Absent attributes are `None`, never an error.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Set an attribute. Writing the same key again replaces the old value.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Append a child element, transferring ownership to this element.
    /// Returns a reference to the appended child.
    ///
    /// A child whose namespace equals this element's is stored unqualified,
    /// the same representation parsed trees use for inherited namespaces.
    pub fn append_child(&mut self, mut child: Stanza) -> &mut Stanza {
        child.normalize_ns(self.ns.as_deref());
        self.children.push(child);
        self.children.last_mut().unwrap()
    }

    /// First child with the given name, in document order.
    pub fn child(&self, name: &str) -> Option<&Stanza> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child with the given name and namespace.
    pub fn child_ns(&self, name: &str, ns: &str) -> Option<&Stanza> {
        self.children.iter().find(|c| c.is(name, ns))
    }

    pub fn children(&self) -> impl Iterator<Item = &Stanza> {
        self.children.iter()
    }

    /// Text content, if any was set or parsed.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    // Rewrite an explicit namespace equal to the inherited one as `None`,
    // recursively, so constructed trees compare equal to their reparse.
    fn normalize_ns(&mut self, inherited: Option<&str>) {
        if inherited.is_some() && self.ns.as_deref() == inherited {
            self.ns = None;
        }
        let effective = self.ns.clone().or_else(|| inherited.map(str::to_string));
        for child in &mut self.children {
            child.normalize_ns(effective.as_deref());
        }
    }

    pub(crate) fn push_text(&mut self, chunk: &str) {
        match &mut self.text {
            Some(text) => text.push_str(chunk),
            None => self.text = Some(chunk.to_string()),
        }
    }

    fn write_into(&self, out: &mut String, parent_ns: Option<&str>) {
        out.push('<');
        out.push_str(&self.name);
        if let Some(ns) = self.ns.as_deref() {
            if parent_ns != Some(ns) {
                out.push_str(" xmlns='");
                write_escaped(out, ns, true);
                out.push('\'');
            }
        }
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("='");
            write_escaped(out, value, true);
            out.push('\'');
        }
        if self.children.is_empty() && self.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = self.text.as_deref() {
            write_escaped(out, text, false);
        }
        let effective = self.ns.as_deref().or(parent_ns);
        for child in &self.children {
            child.write_into(out, effective);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// Serializes the element as XML text.
impl fmt::Display for Stanza {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut out = String::new();
        self.write_into(&mut out, None);
        f.write_str(&out)
    }
}

/// Parses a single complete XML element.
impl FromStr for Stanza {
    type Err = Error;

    fn from_str(s: &str) -> Result<Stanza, Error> {
        let mut parser = rxml::FeedParser::new();
        parser.feed(s.as_bytes().to_vec());
        parser.feed_eof();
        let mut builder = TreeBuilder::new();
        let mut root: Option<Stanza> = None;
        loop {
            match parser.read() {
                Ok(Some(rxml::Event::XMLDeclaration(..))) => (),
                Ok(Some(rxml::Event::StartElement(_, qname, attrs))) => {
                    if root.is_some() {
                        return Err(Error::TrailingContent);
                    }
                    let (ns, name) = tree_builder::convert_qname(qname);
                    builder.start(ns, name, tree_builder::convert_attrs(attrs));
                }
                Ok(Some(rxml::Event::Text(_, cdata))) => {
                    if builder.depth() == 0 {
                        if cdata.split_ascii_whitespace().next().is_some() {
                            return Err(Error::TextOutsideRoot);
                        }
                    } else {
                        builder.text(cdata.as_str());
                    }
                }
                Ok(Some(rxml::Event::EndElement(_))) => {
                    if let Some(stanza) = builder.end() {
                        root = Some(stanza);
                    }
                }
                Ok(None) => break,
                Err(e) => return Err(Error::Parser(e)),
            }
        }
        root.ok_or(Error::IncompleteDocument)
    }
}

fn write_escaped(out: &mut String, s: &str, attr: bool) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' if attr => out.push_str("&apos;"),
            '"' if attr => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
