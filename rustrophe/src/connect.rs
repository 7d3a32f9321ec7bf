// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Transport establishment: TCP and the in-place TLS upgrade.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use native_tls::TlsConnector as NativeTlsConnector;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_native_tls::{TlsConnector, TlsStream};

use crate::error::Error;

/// The byte stream a session runs on.
///
/// STARTTLS upgrades the connection mid-negotiation, so the transport starts
/// out [`Plain`](Transport::Plain) and may become [`Tls`](Transport::Tls)
/// without changing its type. Generic over the inner stream so negotiation
/// can run against an in-memory duplex.
pub enum Transport<S> {
    Plain(S),
    Tls(Box<TlsStream<S>>),
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncRead for Transport<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncWrite for Transport<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_flush(cx),
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Transport::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Open the TCP connection a session will negotiate over.
pub async fn tcp_connect(host: &str, port: u16) -> Result<TcpStream, Error> {
    debug!("connecting to {}:{}", host, port);
    Ok(TcpStream::connect((host, port)).await?)
}

/// Wrap an established stream in TLS, verifying `domain`.
pub async fn upgrade_tls<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    domain: &str,
) -> Result<TlsStream<S>, Error> {
    debug!("negotiating TLS with {}", domain);
    let connector = TlsConnector::from(NativeTlsConnector::builder().build()?);
    Ok(connector.connect(domain, stream).await?)
}
