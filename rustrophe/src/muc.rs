// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Multi-user chat (XEP-0045) membership, the minimal slice a bot needs.
//!
//! Joining and leaving are single presence stanzas; whether the room
//! acknowledged them is visible to stanza handlers, not tracked here.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Error;
use crate::jid::{self, Jid};
use crate::ns;
use crate::session::Session;
use crate::stanza::Stanza;

/// The full JID of an occupant: the room's bare JID with the nick as
/// resource.
pub fn occupant_jid(room: &Jid, nick: &str) -> Result<Jid, jid::Error> {
    room.bare().with_resource(nick)
}

fn join_presence(
    from: &Jid,
    room: &Jid,
    nick: &str,
    password: Option<&str>,
    id: &str,
) -> Result<Stanza, Error> {
    let to = occupant_jid(room, nick)?;
    let mut presence = Stanza::new("presence")
        .with_attr("from", from.to_string())
        .with_attr("id", id)
        .with_attr("to", to.to_string());
    let x = presence.append_child(Stanza::new("x").with_ns(ns::MUC));
    if let Some(password) = password {
        x.append_child(Stanza::new("password").with_text(password));
    }
    Ok(presence)
}

fn leave_presence(from: &Jid, room: &Jid, nick: &str, id: &str) -> Result<Stanza, Error> {
    let to = occupant_jid(room, nick)?;
    Ok(Stanza::new("presence")
        .with_attr("from", from.to_string())
        .with_attr("id", id)
        .with_attr("to", to.to_string())
        .with_attr("type", "unavailable"))
}

/// Request to join `room` under `nick`, with the room password when one is
/// required.
pub async fn join_room<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session<S>,
    room: &Jid,
    nick: &str,
    password: Option<&str>,
) -> Result<(), Error> {
    debug!("joining {} as {}", room, nick);
    let presence = join_presence(session.jid(), room, nick, password, &session.next_id())?;
    session.send(&presence).await
}

/// Leave `room` by sending unavailable presence to our occupant JID.
pub async fn leave_room<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session<S>,
    room: &Jid,
    nick: &str,
) -> Result<(), Error> {
    debug!("leaving {}", room);
    let presence = leave_presence(session.jid(), room, nick, &session.next_id())?;
    session.send(&presence).await
}
