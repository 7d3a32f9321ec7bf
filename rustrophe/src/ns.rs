//! Namespace constants used across the protocol modules.

/// RFC 6120: stream framing
pub const STREAMS: &str = "http://etherx.jabber.org/streams";

/// RFC 6120: default namespace of a client-to-server stream
pub const CLIENT: &str = "jabber:client";

/// RFC 6120: STARTTLS
pub const TLS: &str = "urn:ietf:params:xml:ns:xmpp-tls";

/// RFC 6120: SASL
pub const SASL: &str = "urn:ietf:params:xml:ns:xmpp-sasl";

/// RFC 6120: resource binding
pub const BIND: &str = "urn:ietf:params:xml:ns:xmpp-bind";

/// XEP-0045: multi-user chat
pub const MUC: &str = "http://jabber.org/protocol/muc";
