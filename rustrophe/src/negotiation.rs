// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Stream negotiation: header exchange, STARTTLS, SASL, resource binding.
//!
//! [`negotiate`] drives a fresh byte stream all the way to a ready session.
//! It is generic over the stream so tests can run it against an in-memory
//! duplex with a scripted server; the real caller hands it a `TcpStream`.

use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sasl::client::mechanisms::{Plain, Scram};
use sasl::client::Mechanism;
use sasl::common::scram::{Sha1, Sha256};
use sasl::common::{ChannelBinding, Credentials};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::connect::{self, Transport};
use crate::error::{AuthError, Error, ProtocolError};
use crate::id::IdGenerator;
use crate::jid::Jid;
use crate::ns;
use crate::proto::{self, StreamEvent, StreamHeader, StreamReader};
use crate::stanza::Stanza;

/// Lifecycle of a session, as negotiation drives it forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    TcpConnected,
    TlsNegotiating,
    Authenticating,
    BindingResource,
    SessionReady,
}

/// Everything [`negotiate`] hands over to the session once the stream is
/// ready for stanzas.
pub struct Negotiated<S> {
    pub stream: S,
    pub reader: StreamReader,
    /// Stream id the server assigned, if any.
    pub stream_id: Option<String>,
    /// Full JID returned by resource binding, if the server offered it.
    pub bound_jid: Option<Jid>,
}

fn transition(state: &mut SessionState, next: SessionState) {
    debug!("session state: {:?} -> {:?}", state, next);
    *state = next;
}

/// Negotiate a client stream on `stream`, authenticating as `jid`.
///
/// TLS is used whenever the server offers it. Any failure leaves the
/// transport unusable; retrying means reconnecting from scratch.
pub async fn negotiate<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    jid: &Jid,
    password: &str,
    ids: &IdGenerator,
) -> Result<Negotiated<Transport<S>>, Error> {
    let domain = jid.domain().to_string();
    let mut state = SessionState::TcpConnected;
    let mut transport = Transport::Plain(stream);
    let mut reader = StreamReader::new();

    open_stream(&mut transport, &mut reader, &domain).await?;
    let mut features = recv_features(&mut transport, &mut reader).await?;

    if features.child_ns("starttls", ns::TLS).is_some() {
        transition(&mut state, SessionState::TlsNegotiating);
        transport = starttls(transport, &domain, &mut reader).await?;
        reader = StreamReader::new();
        open_stream(&mut transport, &mut reader, &domain).await?;
        features = recv_features(&mut transport, &mut reader).await?;
    }

    transition(&mut state, SessionState::Authenticating);
    authenticate(&mut transport, &mut reader, &features, jid, password).await?;

    // authentication restarts the stream
    reader = StreamReader::new();
    let header = open_stream(&mut transport, &mut reader, &domain).await?;
    let features = recv_features(&mut transport, &mut reader).await?;

    transition(&mut state, SessionState::BindingResource);
    let bound_jid = bind(&mut transport, &mut reader, &features, jid, ids).await?;

    transition(&mut state, SessionState::SessionReady);
    Ok(Negotiated {
        stream: transport,
        reader,
        stream_id: header.id,
        bound_jid,
    })
}

async fn send_xml<S: AsyncWrite + Unpin>(stream: &mut S, xml: &str) -> Result<(), Error> {
    stream.write_all(xml.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Write our header and wait for the peer's.
async fn open_stream<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    reader: &mut StreamReader,
    domain: &str,
) -> Result<StreamHeader, Error> {
    send_xml(stream, &proto::stream_header(domain)).await?;
    match proto::read_event(stream, reader).await? {
        StreamEvent::Opened(header) => Ok(header),
        StreamEvent::Closed => Err(Error::Disconnected),
        StreamEvent::Stanza(_) => Err(Error::InvalidState),
    }
}

async fn recv_features<S: AsyncRead + Unpin>(
    stream: &mut S,
    reader: &mut StreamReader,
) -> Result<Stanza, Error> {
    loop {
        match proto::read_event(stream, reader).await? {
            StreamEvent::Stanza(st) if st.is("features", ns::STREAMS) => return Ok(st),
            StreamEvent::Stanza(_) => continue,
            StreamEvent::Closed => return Err(Error::Disconnected),
            StreamEvent::Opened(_) => return Err(Error::InvalidState),
        }
    }
}

/// `<starttls/>`, wait for `<proceed/>`, then wrap the plain stream in TLS.
async fn starttls<S: AsyncRead + AsyncWrite + Unpin>(
    mut transport: Transport<S>,
    domain: &str,
    reader: &mut StreamReader,
) -> Result<Transport<S>, Error> {
    send_xml(&mut transport, &format!("<starttls xmlns='{}'/>", ns::TLS)).await?;
    loop {
        match proto::read_event(&mut transport, reader).await? {
            StreamEvent::Stanza(st) if st.is("proceed", ns::TLS) => break,
            StreamEvent::Stanza(st) if st.is("failure", ns::TLS) => {
                return Err(ProtocolError::TlsRefused.into())
            }
            StreamEvent::Stanza(_) => continue,
            StreamEvent::Closed => return Err(Error::Disconnected),
            StreamEvent::Opened(_) => return Err(Error::InvalidState),
        }
    }
    match transport {
        Transport::Plain(stream) => {
            let tls = connect::upgrade_tls(stream, domain).await?;
            Ok(Transport::Tls(Box::new(tls)))
        }
        Transport::Tls(_) => Err(Error::InvalidState),
    }
}

/// The empty SASL payload is written as a single `=`.
fn encode_b64(data: &[u8]) -> String {
    if data.is_empty() {
        "=".to_string()
    } else {
        BASE64.encode(data)
    }
}

fn decode_b64(text: &str) -> Result<Vec<u8>, AuthError> {
    if text.is_empty() || text == "=" {
        return Ok(Vec::new());
    }
    Ok(BASE64.decode(text)?)
}

/// Pick the strongest mechanism both sides support.
fn select_mechanism(
    offered: &HashSet<String>,
    creds: Credentials,
) -> Result<Box<dyn Mechanism>, Error> {
    if offered.contains("SCRAM-SHA-256") {
        Ok(Box::new(
            Scram::<Sha256>::from_credentials(creds).map_err(AuthError::Sasl)?,
        ))
    } else if offered.contains("SCRAM-SHA-1") {
        Ok(Box::new(
            Scram::<Sha1>::from_credentials(creds).map_err(AuthError::Sasl)?,
        ))
    } else if offered.contains("PLAIN") {
        Ok(Box::new(
            Plain::from_credentials(creds).map_err(AuthError::Sasl)?,
        ))
    } else {
        Err(AuthError::NoMechanism.into())
    }
}

async fn authenticate<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    reader: &mut StreamReader,
    features: &Stanza,
    jid: &Jid,
    password: &str,
) -> Result<(), Error> {
    let offered: HashSet<String> = match features.child_ns("mechanisms", ns::SASL) {
        Some(mechanisms) => mechanisms
            .children()
            .filter(|c| c.name() == "mechanism")
            .filter_map(|c| c.text().map(str::to_string))
            .collect(),
        None => HashSet::new(),
    };

    let username = jid.local().ok_or(AuthError::MissingCredentials)?;
    let creds = Credentials::default()
        .with_username(username)
        .with_password(password)
        .with_channel_binding(ChannelBinding::None);
    let mut mechanism = select_mechanism(&offered, creds)?;
    debug!("authenticating with {}", mechanism.name());

    let initial = mechanism.initial();
    let auth = Stanza::new("auth")
        .with_ns(ns::SASL)
        .with_attr("mechanism", mechanism.name())
        .with_text(encode_b64(&initial));
    send_xml(stream, &auth.to_string()).await?;

    loop {
        match proto::read_event(stream, reader).await? {
            StreamEvent::Stanza(st) if st.is("challenge", ns::SASL) => {
                let data = decode_b64(st.text().unwrap_or("")).map_err(Error::Auth)?;
                let response = mechanism.response(&data).map_err(AuthError::Sasl)?;
                let el = Stanza::new("response")
                    .with_ns(ns::SASL)
                    .with_text(encode_b64(&response));
                send_xml(stream, &el.to_string()).await?;
            }
            StreamEvent::Stanza(st) if st.is("success", ns::SASL) => return Ok(()),
            StreamEvent::Stanza(st) if st.is("failure", ns::SASL) => {
                let condition = st
                    .children()
                    .next()
                    .map(|c| c.name().to_string())
                    .unwrap_or_else(|| "failure".to_string());
                return Err(AuthError::Fail(condition).into());
            }
            StreamEvent::Stanza(_) => continue,
            StreamEvent::Closed => return Err(Error::Disconnected),
            StreamEvent::Opened(_) => return Err(Error::InvalidState),
        }
    }
}

/// Bind a resource, returning the full JID the server assigned.
async fn bind<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    reader: &mut StreamReader,
    features: &Stanza,
    jid: &Jid,
    ids: &IdGenerator,
) -> Result<Option<Jid>, Error> {
    if features.child_ns("bind", ns::BIND).is_none() {
        // no resource binding available, do nothing
        return Ok(None);
    }
    let id = ids.next_id();
    let mut query = Stanza::new("bind").with_ns(ns::BIND);
    if let Some(resource) = jid.resource() {
        query.append_child(Stanza::new("resource").with_text(resource));
    }
    let iq = Stanza::new("iq")
        .with_attr("id", &id)
        .with_attr("type", "set")
        .with_child(query);
    send_xml(stream, &iq.to_string()).await?;

    loop {
        match proto::read_event(stream, reader).await? {
            StreamEvent::Stanza(st)
                if st.name() == "iq" && st.attr("id") == Some(id.as_str()) =>
            {
                if st.attr("type") != Some("result") {
                    return Err(ProtocolError::InvalidBindResponse.into());
                }
                let full = st
                    .child_ns("bind", ns::BIND)
                    .and_then(|b| b.child("jid"))
                    .and_then(|j| j.text())
                    .ok_or(ProtocolError::InvalidBindResponse)?;
                let bound = full.parse::<Jid>()?;
                debug!("bound to {}", bound);
                return Ok(Some(bound));
            }
            StreamEvent::Stanza(_) => continue,
            StreamEvent::Closed => return Err(Error::Disconnected),
            StreamEvent::Opened(_) => return Err(Error::InvalidState),
        }
    }
}
