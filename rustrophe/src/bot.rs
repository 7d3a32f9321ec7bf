// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The bot behaviors, expressed as ordinary stanza handlers.

use crate::dispatcher::{Context, Control, Filter, HandlerId};
use crate::jid::Jid;
use crate::session::Session;
use crate::stanza::Stanza;
use crate::store::MessageStore;

/// The command that shuts the bot down.
const QUIT: &str = "quit";

fn body_of(stanza: &Stanza) -> Option<&str> {
    match stanza.child("body").and_then(|b| b.text()) {
        Some(body) if !body.is_empty() => Some(body),
        _ => None,
    }
}

/// The echo behavior: reply to every chat message with its own body, close
/// the session on `quit`. Messages without a body, and error bounces, are
/// ignored.
pub fn echo() -> impl FnMut(&mut Context, &Stanza) -> Control {
    |ctx, stanza| {
        if stanza.attr("type") == Some("error") {
            return Control::Continue;
        }
        let body = match body_of(stanza) {
            Some(body) => body,
            None => return Control::Continue,
        };
        if body == QUIT {
            debug!("quit requested");
            return Control::CloseSession;
        }
        let from = match stanza.attr("from") {
            Some(from) => from,
            None => return Control::Continue,
        };
        debug!("echoing {:?} to {}", body, from);
        let reply = Stanza::new("message")
            .with_attr("id", ctx.next_id())
            .with_attr("to", from)
            .with_attr("type", "chat")
            .with_child(Stanza::new("body").with_text(body));
        ctx.send(reply);
        Control::Continue
    }
}

/// The room-listener behavior: `groupchat` messages go to `store`, anything
/// else is treated as a direct command. `quit` is the only command.
///
/// A failing store is logged and skipped; it never takes the session down.
pub fn muc<M: MessageStore>(mut store: M) -> impl FnMut(&mut Context, &Stanza) -> Control {
    move |_ctx, stanza| {
        if stanza.attr("type") == Some("error") {
            return Control::Continue;
        }
        let body = match body_of(stanza) {
            Some(body) => body,
            None => return Control::Continue,
        };
        if stanza.attr("type") == Some("groupchat") {
            let from = match stanza.attr("from").and_then(|f| f.parse::<Jid>().ok()) {
                Some(from) => from,
                None => return Control::Continue,
            };
            if let Err(e) = store.store(body, &from) {
                warn!("dropping message from {}: {}", from, e);
            }
            Control::Continue
        } else if body == QUIT {
            debug!("quit requested");
            Control::CloseSession
        } else {
            debug!("ignoring unknown command {:?}", body);
            Control::Continue
        }
    }
}

/// Install the echo behavior on a session.
pub fn install_echo<S>(session: &mut Session<S>) -> HandlerId {
    session.on(Filter::new().name("message"), echo())
}

/// Install the room-listener behavior on a session.
pub fn install_muc<S, M: MessageStore + 'static>(
    session: &mut Session<S>,
    store: M,
) -> HandlerId {
    session.on(Filter::new().name("message"), muc(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::id::IdGenerator;
    use crate::store::{MemoryStore, StoreError};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn ctx() -> Context {
        Context::new(
            "bot@capulet.example/home".parse().unwrap(),
            Arc::new(IdGenerator::new()),
        )
    }

    fn message(from: &str, typ: &str, body: Option<&str>) -> Stanza {
        let mut st = Stanza::new("message")
            .with_attr("from", from)
            .with_attr("type", typ);
        if let Some(body) = body {
            st.append_child(Stanza::new("body").with_text(body));
        }
        st
    }

    fn echo_dispatcher() -> Dispatcher {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Filter::new().name("message"), echo());
        dispatcher
    }

    #[test]
    fn echo_replies_with_the_same_body() {
        let mut dispatcher = echo_dispatcher();
        let mut ctx = ctx();
        let control = dispatcher.dispatch(
            &mut ctx,
            &message("romeo@montague.example/orchard", "chat", Some("hello")),
        );
        assert_eq!(control, Control::Continue);
        let out = ctx.take_outbound();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].attr("to"), Some("romeo@montague.example/orchard"));
        assert_eq!(out[0].attr("type"), Some("chat"));
        assert_eq!(out[0].child("body").and_then(|b| b.text()), Some("hello"));
    }

    #[test]
    fn echo_ids_are_fresh_per_reply() {
        let mut dispatcher = echo_dispatcher();
        let mut ctx = ctx();
        dispatcher.dispatch(&mut ctx, &message("a@b", "chat", Some("one")));
        dispatcher.dispatch(&mut ctx, &message("a@b", "chat", Some("two")));
        let out = ctx.take_outbound();
        let first = out[0].attr("id").unwrap();
        let second = out[1].attr("id").unwrap();
        assert!(!first.is_empty());
        assert_ne!(first, second);
    }

    #[test]
    fn echo_quit_closes_without_replying() {
        let mut dispatcher = echo_dispatcher();
        let mut ctx = ctx();
        let control = dispatcher.dispatch(&mut ctx, &message("a@b", "chat", Some("quit")));
        assert_eq!(control, Control::CloseSession);
        assert!(ctx.take_outbound().is_empty());
    }

    #[test]
    fn echo_ignores_bodiless_and_error_messages() {
        let mut dispatcher = echo_dispatcher();
        let mut ctx = ctx();
        assert_eq!(
            dispatcher.dispatch(&mut ctx, &message("a@b", "chat", None)),
            Control::Continue
        );
        assert_eq!(
            dispatcher.dispatch(&mut ctx, &message("a@b", "error", Some("hello"))),
            Control::Continue
        );
        assert!(ctx.take_outbound().is_empty());
    }

    // lets the test keep a handle on a store that was moved into a handler
    struct SharedStore(Rc<RefCell<MemoryStore>>);

    impl MessageStore for SharedStore {
        fn store(&mut self, text: &str, from: &Jid) -> Result<(), StoreError> {
            self.0.borrow_mut().store(text, from)
        }
    }

    #[test]
    fn muc_stores_groupchat_messages() {
        let store = Rc::new(RefCell::new(MemoryStore::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(
            Filter::new().name("message"),
            muc(SharedStore(store.clone())),
        );
        let mut ctx = ctx();
        let control = dispatcher.dispatch(
            &mut ctx,
            &message(
                "play@conference.example/juliet",
                "groupchat",
                Some("wherefore art thou"),
            ),
        );
        assert_eq!(control, Control::Continue);
        assert!(ctx.take_outbound().is_empty());
        let store = store.borrow();
        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].text, "wherefore art thou");
        assert_eq!(
            store.messages()[0].from.to_string(),
            "play@conference.example/juliet"
        );
    }

    #[test]
    fn muc_groupchat_quit_is_not_a_command() {
        let store = Rc::new(RefCell::new(MemoryStore::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(
            Filter::new().name("message"),
            muc(SharedStore(store.clone())),
        );
        let mut ctx = ctx();
        // "quit" shouted into the room is just another message to store
        let control = dispatcher.dispatch(
            &mut ctx,
            &message("play@conference.example/juliet", "groupchat", Some("quit")),
        );
        assert_eq!(control, Control::Continue);
        assert_eq!(store.borrow().len(), 1);
    }

    #[test]
    fn muc_direct_quit_closes_the_session() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Filter::new().name("message"), muc(MemoryStore::new()));
        let mut ctx = ctx();
        let control = dispatcher.dispatch(
            &mut ctx,
            &message("romeo@montague.example/orchard", "chat", Some("quit")),
        );
        assert_eq!(control, Control::CloseSession);
    }

    #[test]
    fn muc_unknown_commands_are_ignored() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Filter::new().name("message"), muc(MemoryStore::new()));
        let mut ctx = ctx();
        let control = dispatcher.dispatch(
            &mut ctx,
            &message("romeo@montague.example/orchard", "chat", Some("dance")),
        );
        assert_eq!(control, Control::Continue);
        assert!(ctx.take_outbound().is_empty());
    }

    struct FailingStore;

    impl MessageStore for FailingStore {
        fn store(&mut self, _: &str, _: &Jid) -> Result<(), StoreError> {
            Err(StoreError::new("disk full"))
        }
    }

    #[test]
    fn muc_store_failure_is_not_fatal() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Filter::new().name("message"), muc(FailingStore));
        let mut ctx = ctx();
        let control = dispatcher.dispatch(
            &mut ctx,
            &message("play@conference.example/juliet", "groupchat", Some("hello")),
        );
        assert_eq!(control, Control::Continue);
    }
}
