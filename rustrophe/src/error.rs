// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use sasl::client::MechanismError as SaslMechanismError;
use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;

use crate::jid;
use crate::stanza;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(IoError),
    /// Error parsing Jabber-Id
    JidParse(jid::Error),
    /// Protocol-level error
    Protocol(ProtocolError),
    /// Authentication error
    Auth(AuthError),
    /// TLS error
    Tls(native_tls::Error),
    /// Connection closed by the peer
    Disconnected,
    /// Operation requires an established session
    NotConnected,
    /// Should never happen
    InvalidState,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(fmt, "IO error: {}", e),
            Error::JidParse(e) => write!(fmt, "jid parse error: {}", e),
            Error::Protocol(e) => write!(fmt, "protocol error: {}", e),
            Error::Auth(e) => write!(fmt, "authentication error: {}", e),
            Error::Tls(e) => write!(fmt, "TLS error: {}", e),
            Error::Disconnected => write!(fmt, "disconnected"),
            Error::NotConnected => write!(fmt, "not connected"),
            Error::InvalidState => write!(fmt, "invalid state"),
        }
    }
}

impl StdError for Error {}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

impl From<jid::Error> for Error {
    fn from(e: jid::Error) -> Self {
        Error::JidParse(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<AuthError> for Error {
    fn from(e: AuthError) -> Self {
        Error::Auth(e)
    }
}

impl From<native_tls::Error> for Error {
    fn from(e: native_tls::Error) -> Self {
        Error::Tls(e)
    }
}

impl From<stanza::Error> for Error {
    fn from(e: stanza::Error) -> Self {
        ProtocolError::Parser(e).into()
    }
}

/// XMPP protocol-level error
#[derive(Debug)]
pub enum ProtocolError {
    /// XML parser error
    Parser(stanza::Error),
    /// The peer's first element was not a valid stream header
    InvalidStreamHeader,
    /// Non-whitespace text between stanzas
    TextAtStreamLevel,
    /// The stream reader failed earlier and cannot continue
    Poisoned,
    /// The server refused STARTTLS after offering it
    TlsRefused,
    /// Invalid response to resource binding
    InvalidBindResponse,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProtocolError::Parser(e) => write!(fmt, "XML parser error: {}", e),
            ProtocolError::InvalidStreamHeader => write!(fmt, "invalid stream header"),
            ProtocolError::TextAtStreamLevel => {
                write!(fmt, "non-whitespace text at stream level")
            }
            ProtocolError::Poisoned => write!(fmt, "stream reader failed earlier"),
            ProtocolError::TlsRefused => write!(fmt, "server refused STARTTLS"),
            ProtocolError::InvalidBindResponse => {
                write!(fmt, "invalid response to resource binding")
            }
        }
    }
}

impl StdError for ProtocolError {}

impl From<stanza::Error> for ProtocolError {
    fn from(e: stanza::Error) -> Self {
        ProtocolError::Parser(e)
    }
}

/// Authentication error
#[derive(Debug)]
pub enum AuthError {
    /// No matching SASL mechanism available
    NoMechanism,
    /// The JID has no localpart to authenticate as
    MissingCredentials,
    /// Local SASL implementation error
    Sasl(SaslMechanismError),
    /// Malformed base64 payload in a SASL element
    Base64(base64::DecodeError),
    /// Failure from server, carrying the defined condition
    Fail(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthError::NoMechanism => write!(fmt, "no matching SASL mechanism available"),
            AuthError::MissingCredentials => {
                write!(fmt, "the JID has no localpart to authenticate as")
            }
            AuthError::Sasl(e) => write!(fmt, "local SASL implementation error: {}", e),
            AuthError::Base64(e) => write!(fmt, "malformed base64 in SASL element: {}", e),
            AuthError::Fail(condition) => write!(fmt, "failure from the server: {}", condition),
        }
    }
}

impl StdError for AuthError {}

impl From<base64::DecodeError> for AuthError {
    fn from(e: base64::DecodeError) -> Self {
        AuthError::Base64(e)
    }
}
