// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Incremental reader for one side of an XMPP stream.
//!
//! An XMPP connection is a single long-lived XML document: a `stream:stream`
//! root whose direct children are the stanzas. [`StreamReader`] accepts raw
//! bytes and turns them into [`StreamEvent`]s; it never touches the socket
//! itself, which keeps it usable on any transport and trivially testable.
//!
//! A reader handles exactly one stream document. After STARTTLS or SASL the
//! stream restarts and the negotiator swaps in a fresh reader.

use std::io;

use rxml::EventRead;
use rustrophe_stanza::{tree_builder, Stanza, TreeBuilder};

use crate::error::{Error, ProtocolError};
use crate::ns;

/// Attributes of the peer's stream header we care about.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamHeader {
    pub id: Option<String>,
    pub from: Option<String>,
    pub version: Option<String>,
}

/// One event read off the stream.
#[derive(Debug)]
pub enum StreamEvent {
    /// The peer's stream header was received.
    Opened(StreamHeader),
    /// A complete stanza (direct child of the stream root) was received.
    Stanza(Stanza),
    /// The peer closed the stream document.
    Closed,
}

pub struct StreamReader {
    parser: rxml::FeedParser<'static>,
    builder: TreeBuilder,
    opened: bool,
    poisoned: bool,
}

impl StreamReader {
    pub fn new() -> StreamReader {
        StreamReader {
            parser: rxml::FeedParser::new(),
            builder: TreeBuilder::with_default_ns(ns::CLIENT),
            opened: false,
            poisoned: false,
        }
    }

    /// Make `data` available to the parser. Bytes may arrive in arbitrary
    /// chunks; nothing is interpreted until [`read`](Self::read).
    pub fn feed(&mut self, data: &[u8]) {
        self.parser.feed(data.to_vec());
    }

    pub fn feed_eof(&mut self) {
        self.parser.feed_eof();
    }

    /// Next event, or `Ok(None)` when more bytes are needed.
    ///
    /// Any error is fatal to the stream: the reader stays poisoned and all
    /// further reads fail. Framing cannot be trusted after a parse error, so
    /// the transport has to be torn down.
    pub fn read(&mut self) -> Result<Option<StreamEvent>, Error> {
        if self.poisoned {
            return Err(ProtocolError::Poisoned.into());
        }
        loop {
            match self.parser.read() {
                Err(rxml::Error::IO(e)) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(None)
                }
                Err(e) => {
                    self.poisoned = true;
                    return Err(ProtocolError::Parser(e.into()).into());
                }
                // eof after the stream footer
                Ok(None) => return Ok(Some(StreamEvent::Closed)),
                Ok(Some(event)) => {
                    if let Some(out) = self.process(event)? {
                        return Ok(Some(out));
                    }
                }
            }
        }
    }

    fn process(&mut self, event: rxml::Event) -> Result<Option<StreamEvent>, Error> {
        match event {
            rxml::Event::XMLDeclaration(..) => Ok(None),
            rxml::Event::StartElement(_, qname, attrs) => {
                let (nsuri, name) = tree_builder::convert_qname(qname);
                let mut attrs = tree_builder::convert_attrs(attrs);
                if !self.opened {
                    if nsuri.as_deref() != Some(ns::STREAMS) || name != "stream" {
                        self.poisoned = true;
                        return Err(ProtocolError::InvalidStreamHeader.into());
                    }
                    self.opened = true;
                    return Ok(Some(StreamEvent::Opened(StreamHeader {
                        id: attrs.remove("id"),
                        from: attrs.remove("from"),
                        version: attrs.remove("version"),
                    })));
                }
                self.builder.start(nsuri, name, attrs);
                Ok(None)
            }
            rxml::Event::Text(_, cdata) => {
                if self.builder.depth() == 0 {
                    // between stanzas only whitespace (keepalives) is legal
                    if cdata.split_ascii_whitespace().next().is_some() {
                        self.poisoned = true;
                        return Err(ProtocolError::TextAtStreamLevel.into());
                    }
                    Ok(None)
                } else {
                    self.builder.text(cdata.as_str());
                    Ok(None)
                }
            }
            rxml::Event::EndElement(_) => {
                if self.builder.depth() == 0 {
                    // </stream:stream>
                    Ok(Some(StreamEvent::Closed))
                } else {
                    Ok(self.builder.end().map(StreamEvent::Stanza))
                }
            }
        }
    }
}

impl Default for StreamReader {
    fn default() -> Self {
        StreamReader::new()
    }
}
