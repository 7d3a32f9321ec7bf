//! Folds tokenizer events into [`Stanza`] trees.
//!
//! The builder is shared between [`Stanza::from_str`](std::str::FromStr) and
//! the wire-level stream reader, which both drive an [`rxml::FeedParser`] and
//! push its events in here.

use std::collections::{BTreeMap, HashMap};

use crate::Stanza;

/// Convert a resolved element or attribute name into `(namespace, local)`.
pub fn convert_qname(qname: rxml::QName) -> (Option<String>, String) {
    let (nsuri, localname) = qname;
    (
        nsuri.map(|uri| uri.as_str().to_string()),
        localname.as_str().to_string(),
    )
}

/// Convert tokenizer attributes into the flat map a [`Stanza`] carries.
///
/// `xml:*` attributes keep their prefixed spelling, matching what prosody
/// exposes to its scripts; attributes in any other foreign namespace fall
/// back to their local name.
pub fn convert_attrs(attrs: HashMap<rxml::QName, rxml::CData>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for ((nsuri, localname), value) in attrs {
        let key = match nsuri {
            Some(nsuri) if nsuri.as_str() == rxml::XMLNS_XML => format!("xml:{}", localname.as_str()),
            _ => localname.as_str().to_string(),
        };
        out.insert(key, value.as_str().to_string());
    }
    out
}

/// Incremental [`Stanza`] tree builder.
///
/// `start`/`text`/`end` mirror the tokenizer's element events; `end` returns
/// the finished tree once the element that opened the tree is closed.
pub struct TreeBuilder {
    stack: Vec<Stanza>,
    // effective (inherited) namespace per open element
    ns_stack: Vec<Option<String>>,
    default_ns: Option<String>,
}

impl TreeBuilder {
    pub fn new() -> TreeBuilder {
        TreeBuilder {
            stack: Vec::new(),
            ns_stack: Vec::new(),
            default_ns: None,
        }
    }

    /// A builder whose top-level elements are considered to live in `ns`.
    ///
    /// Elements resolved to `ns` are stored with no namespace of their own,
    /// the same normalization prosody applies to the stream's default
    /// namespace: a `<message xmlns='jabber:client'/>` read off a c2s stream
    /// carries `ns() == None`.
    pub fn with_default_ns(ns: impl Into<String>) -> TreeBuilder {
        TreeBuilder {
            stack: Vec::new(),
            ns_stack: Vec::new(),
            default_ns: Some(ns.into()),
        }
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Open a child element.
    pub fn start(&mut self, ns: Option<String>, name: String, attrs: BTreeMap<String, String>) {
        let inherited = self
            .ns_stack
            .last()
            .cloned()
            .unwrap_or(None)
            .or_else(|| self.default_ns.clone());
        // Elements in the inherited namespace are stored unqualified.
        let ns = match ns {
            Some(ns) if Some(ns.as_str()) == inherited.as_deref() => None,
            other => other,
        };
        let effective = ns.clone().or(inherited);
        self.stack.push(Stanza::from_parts(ns, name, attrs));
        self.ns_stack.push(effective);
    }

    /// Append character data to the innermost open element.
    ///
    /// Text fed while no element is open is discarded; stream-level rules
    /// are the caller's business.
    pub fn text(&mut self, chunk: &str) {
        if let Some(top) = self.stack.last_mut() {
            top.push_text(chunk);
        }
    }

    /// Close the innermost open element.
    ///
    /// Returns the completed tree when the outermost element closes, `None`
    /// while the tree is still open or when nothing was open at all.
    pub fn end(&mut self) -> Option<Stanza> {
        let closed = self.stack.pop()?;
        self.ns_stack.pop();
        match self.stack.last_mut() {
            Some(parent) => {
                parent.append_child(closed);
                None
            }
            None => Some(closed),
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        TreeBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn builds_nested_tree() {
        let mut b = TreeBuilder::new();
        b.start(None, "message".to_string(), attrs(&[("type", "chat")]));
        b.start(None, "body".to_string(), attrs(&[]));
        b.text("hello");
        assert!(b.end().is_none());
        let root = b.end().expect("root should close");
        assert_eq!(root.name(), "message");
        assert_eq!(root.attr("type"), Some("chat"));
        assert_eq!(root.child("body").and_then(|c| c.text()), Some("hello"));
        assert_eq!(b.depth(), 0);
    }

    #[test]
    fn default_ns_is_suppressed() {
        let mut b = TreeBuilder::with_default_ns("jabber:client");
        b.start(
            Some("jabber:client".to_string()),
            "presence".to_string(),
            attrs(&[]),
        );
        let root = b.end().unwrap();
        assert_eq!(root.ns(), None);
    }

    #[test]
    fn foreign_ns_is_kept() {
        let mut b = TreeBuilder::with_default_ns("jabber:client");
        b.start(
            Some("jabber:client".to_string()),
            "presence".to_string(),
            attrs(&[]),
        );
        b.start(
            Some("http://jabber.org/protocol/muc".to_string()),
            "x".to_string(),
            attrs(&[]),
        );
        // children of the muc element inherit its namespace
        b.start(
            Some("http://jabber.org/protocol/muc".to_string()),
            "password".to_string(),
            attrs(&[]),
        );
        b.end();
        b.end();
        let root = b.end().unwrap();
        let x = root.child("x").unwrap();
        assert_eq!(x.ns(), Some("http://jabber.org/protocol/muc"));
        assert_eq!(x.child("password").unwrap().ns(), None);
    }

    #[test]
    fn end_without_start_is_none() {
        let mut b = TreeBuilder::new();
        assert!(b.end().is_none());
    }
}
