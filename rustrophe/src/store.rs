// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Where the MUC bot puts the messages it overhears.

use std::error::Error as StdError;
use std::fmt;

use crate::jid::Jid;

/// A store refused or failed to record a message. Never fatal to the
/// session; the bot logs it and moves on.
#[derive(Debug)]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> StoreError {
        StoreError {
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "message store error: {}", self.message)
    }
}

impl StdError for StoreError {}

/// Sink for overheard room messages. Injected into the MUC bot so storage
/// can be swapped without touching the protocol code.
pub trait MessageStore {
    fn store(&mut self, text: &str, from: &Jid) -> Result<(), StoreError>;
}

/// One stored room message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredMessage {
    pub from: Jid,
    pub text: String,
}

/// In-process store backed by a `Vec`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    messages: Vec<StoredMessage>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn messages(&self) -> &[StoredMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl MessageStore for MemoryStore {
    fn store(&mut self, text: &str, from: &Jid) -> Result<(), StoreError> {
        debug!("storing message from {}", from);
        self.messages.push(StoredMessage {
            from: from.clone(),
            text: text.to_string(),
        });
        Ok(())
    }
}
