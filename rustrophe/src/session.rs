// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One authenticated XMPP connection and its event loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;

use crate::connect::{self, Transport};
use crate::dispatcher::{Context, Control, Dispatcher, Filter, HandlerId};
use crate::error::Error;
use crate::id::IdGenerator;
use crate::jid::Jid;
use crate::negotiation::{self, Negotiated, SessionState};
use crate::proto::{self, StreamEvent, StreamReader};
use crate::stanza::Stanza;

const DEFAULT_PORT: u16 = 5222;

/// How long [`Session::disconnect`] waits for the peer's stream footer.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to establish a session.
pub struct SessionConfig {
    pub jid: Jid,
    pub password: String,
    /// Host to connect to; defaults to the JID's domain.
    pub host: Option<String>,
    pub port: u16,
    pub ids: Arc<IdGenerator>,
}

impl SessionConfig {
    pub fn new(jid: Jid, password: impl Into<String>) -> SessionConfig {
        SessionConfig {
            jid,
            password: password.into(),
            host: None,
            port: DEFAULT_PORT,
            ids: Arc::new(IdGenerator::new()),
        }
    }
}

/// An established client session: one transport, one dispatcher, one event
/// loop. All handler dispatch happens on the task running [`run`](Session::run).
pub struct Session<S = Transport<TcpStream>> {
    state: SessionState,
    stream: S,
    reader: StreamReader,
    dispatcher: Dispatcher,
    context: Context,
}

impl Session {
    /// Connect over TCP and negotiate until the session is ready.
    pub async fn connect(config: SessionConfig) -> Result<Session, Error> {
        let host = config
            .host
            .clone()
            .unwrap_or_else(|| config.jid.domain().to_string());
        let tcp = connect::tcp_connect(&host, config.port).await?;
        let negotiated =
            negotiation::negotiate(tcp, &config.jid, &config.password, &config.ids).await?;
        Ok(Session::from_parts(negotiated, &config))
    }
}

impl<S> Session<S> {
    /// Assemble a session from an already negotiated stream.
    pub fn from_parts(negotiated: Negotiated<S>, config: &SessionConfig) -> Session<S> {
        // prefer the JID the server bound us to, then the configured one
        let effective = match negotiated.bound_jid {
            Some(bound) => bound,
            None => config.jid.clone(),
        };
        debug!("session ready as {}", effective);
        Session {
            state: SessionState::SessionReady,
            stream: negotiated.stream,
            reader: negotiated.reader,
            dispatcher: Dispatcher::new(),
            context: Context::new(effective, config.ids.clone()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The effective JID: the bound JID when the server assigned one, the
    /// configured JID otherwise.
    pub fn jid(&self) -> &Jid {
        self.context.jid()
    }

    /// A fresh stanza id.
    pub fn next_id(&self) -> String {
        self.context.next_id()
    }

    /// Register a stanza handler.
    pub fn on(
        &mut self,
        filter: Filter,
        handler: impl FnMut(&mut Context, &Stanza) -> Control + 'static,
    ) -> HandlerId {
        self.dispatcher.register(filter, handler)
    }

    /// Unregister a handler. Returns whether it was still registered.
    pub fn off(&mut self, id: HandlerId) -> bool {
        self.dispatcher.unregister(id)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Send a stanza right away. Fails with [`Error::NotConnected`] unless
    /// the session is ready.
    pub async fn send(&mut self, stanza: &Stanza) -> Result<(), Error> {
        if self.state != SessionState::SessionReady {
            return Err(Error::NotConnected);
        }
        debug!(">> {}", stanza);
        self.stream.write_all(stanza.to_string().as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read and dispatch stanzas until the session disconnects.
    pub async fn run(&mut self) -> Result<(), Error> {
        while self.state == SessionState::SessionReady {
            let event = match proto::read_event(&mut self.stream, &mut self.reader).await {
                Ok(event) => event,
                Err(e) => {
                    self.state = SessionState::Disconnected;
                    return Err(e);
                }
            };
            match event {
                StreamEvent::Stanza(stanza) => {
                    debug!("<< {}", stanza);
                    let control = self.dispatcher.dispatch(&mut self.context, &stanza);
                    if let Err(e) = self.flush_outbound().await {
                        self.state = SessionState::Disconnected;
                        return Err(e);
                    }
                    if control == Control::CloseSession {
                        self.disconnect().await?;
                    }
                }
                StreamEvent::Closed => {
                    debug!("peer closed the stream");
                    self.state = SessionState::Disconnected;
                    self.stream.write_all(proto::STREAM_FOOTER.as_bytes()).await?;
                    let _ = self.stream.flush().await;
                    let _ = self.stream.shutdown().await;
                }
                StreamEvent::Opened(_) => {
                    self.state = SessionState::Disconnected;
                    return Err(Error::InvalidState);
                }
            }
        }
        Ok(())
    }

    /// Close the stream gracefully: send our footer, wait (bounded) for the
    /// peer's, tear down the transport. Safe to call more than once.
    pub async fn disconnect(&mut self) -> Result<(), Error> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }
        self.state = SessionState::Disconnected;
        debug!("closing stream");
        self.stream.write_all(proto::STREAM_FOOTER.as_bytes()).await?;
        self.stream.flush().await?;

        let stream = &mut self.stream;
        let reader = &mut self.reader;
        let peer_footer = async move {
            loop {
                match proto::read_event(stream, reader).await {
                    Ok(StreamEvent::Closed) | Err(_) => break,
                    Ok(_) => continue,
                }
            }
        };
        if time::timeout(DISCONNECT_TIMEOUT, peer_footer).await.is_err() {
            debug!("peer did not close the stream in time");
        }
        let _ = self.stream.shutdown().await;
        Ok(())
    }

    async fn flush_outbound(&mut self) -> Result<(), Error> {
        let queued = self.context.take_outbound();
        if queued.is_empty() {
            return Ok(());
        }
        for stanza in queued {
            debug!(">> {}", stanza);
            self.stream.write_all(stanza.to_string().as_bytes()).await?;
        }
        self.stream.flush().await?;
        Ok(())
    }
}
