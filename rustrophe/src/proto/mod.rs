// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Wire-level plumbing for the XMPP stream document.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Error;
use crate::ns;

mod stream;

pub use stream::{StreamEvent, StreamHeader, StreamReader};

/// The header the initiating entity writes to open (or restart) a stream.
pub fn stream_header(to: &str) -> String {
    format!(
        "<?xml version='1.0'?><stream:stream to='{}' version='1.0' xmlns='{}' xmlns:stream='{}'>",
        to,
        ns::CLIENT,
        ns::STREAMS
    )
}

/// Closes the stream document.
pub const STREAM_FOOTER: &str = "</stream:stream>";

/// Pull the next stream event, reading more bytes from `stream` whenever the
/// reader runs dry. EOF before the stream footer is a [`Error::Disconnected`].
pub(crate) async fn read_event<S: AsyncRead + Unpin>(
    stream: &mut S,
    reader: &mut StreamReader,
) -> Result<StreamEvent, Error> {
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        if let Some(event) = reader.read()? {
            return Ok(event);
        }
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            reader.feed_eof();
            if let Some(event) = reader.read()? {
                return Ok(event);
            }
            return Err(Error::Disconnected);
        }
        reader.feed(&buf[..]);
        buf.clear();
    }
}
