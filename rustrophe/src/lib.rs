// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Minimal asynchronous XMPP client core for chat bots.
//!
//! The crate covers the slice of XMPP a bot actually touches: open a TCP
//! connection, negotiate the stream (STARTTLS when offered, SASL, resource
//! binding), then route inbound stanzas to registered handlers which reply
//! through an outbound queue. Stanzas themselves are the plain element trees
//! of the [`rustrophe-stanza`](stanza) crate.
//!
//! ```no_run
//! use rustrophe::{bot, Session, SessionConfig, Stanza};
//!
//! # async fn run() -> Result<(), rustrophe::Error> {
//! let config = SessionConfig::new("juliet@example.com".parse()?, "s3cr3t");
//! let mut session = Session::connect(config).await?;
//! session.send(&Stanza::new("presence")).await?;
//! bot::install_echo(&mut session);
//! session.run().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code, bare_trait_objects)]

#[macro_use]
extern crate log;

pub use rustrophe_stanza as stanza;
pub use rustrophe_stanza::Stanza;

pub mod bot;
pub mod connect;
pub mod dispatcher;
mod error;
pub mod id;
pub mod jid;
pub mod muc;
pub mod negotiation;
pub mod ns;
pub mod proto;
pub mod session;
pub mod store;
#[cfg(test)]
pub(crate) mod testutil;

pub use crate::connect::Transport;
pub use crate::dispatcher::{Context, Control, Dispatcher, Filter, HandlerId};
pub use crate::error::{AuthError, Error, ProtocolError};
pub use crate::id::IdGenerator;
pub use crate::jid::Jid;
pub use crate::negotiation::SessionState;
pub use crate::session::{Session, SessionConfig};
pub use crate::store::{MemoryStore, MessageStore, StoreError};
