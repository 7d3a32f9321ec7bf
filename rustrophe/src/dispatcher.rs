// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Routing of inbound stanzas to registered handlers.

use std::sync::Arc;

use crate::id::IdGenerator;
use crate::jid::Jid;
use crate::stanza::Stanza;

/// What a handler wants to happen after it ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    /// Keep dispatching this stanza to the remaining handlers.
    Continue,
    /// Skip the remaining handlers for this stanza.
    StopOtherHandlers,
    /// Stop dispatching and close the session gracefully.
    CloseSession,
}

/// Matches stanzas by name, namespace and `type` attribute. Unset fields
/// match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    name: Option<String>,
    ns: Option<String>,
    typ: Option<String>,
}

impl Filter {
    /// A filter that matches every stanza.
    pub fn new() -> Filter {
        Filter::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Filter {
        self.name = Some(name.into());
        self
    }

    pub fn ns(mut self, ns: impl Into<String>) -> Filter {
        self.ns = Some(ns.into());
        self
    }

    pub fn typ(mut self, typ: impl Into<String>) -> Filter {
        self.typ = Some(typ.into());
        self
    }

    pub fn matches(&self, stanza: &Stanza) -> bool {
        if let Some(name) = &self.name {
            if stanza.name() != name {
                return false;
            }
        }
        if let Some(ns) = &self.ns {
            if stanza.ns() != Some(ns.as_str()) {
                return false;
            }
        }
        if let Some(typ) = &self.typ {
            if stanza.attr("type") != Some(typ.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Token returned by [`Dispatcher::register`], used to unregister.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Box<dyn FnMut(&mut Context, &Stanza) -> Control>;

/// What handlers get to work with: the session's effective JID, fresh
/// stanza ids, and an outbound queue flushed after the dispatch cycle.
pub struct Context {
    jid: Jid,
    ids: Arc<IdGenerator>,
    outbound: Vec<Stanza>,
}

impl Context {
    pub(crate) fn new(jid: Jid, ids: Arc<IdGenerator>) -> Context {
        Context {
            jid,
            ids,
            outbound: Vec::new(),
        }
    }

    /// The session's effective JID.
    pub fn jid(&self) -> &Jid {
        &self.jid
    }

    pub fn next_id(&self) -> String {
        self.ids.next_id()
    }

    /// Queue a stanza. Queued stanzas go out in order once the current
    /// dispatch cycle is over.
    pub fn send(&mut self, stanza: Stanza) {
        self.outbound.push(stanza);
    }

    pub(crate) fn take_outbound(&mut self) -> Vec<Stanza> {
        std::mem::take(&mut self.outbound)
    }
}

/// Holds handlers and routes each inbound stanza through them in
/// registration order.
pub struct Dispatcher {
    handlers: Vec<(HandlerId, Filter, Handler)>,
    next_id: u64,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn register(
        &mut self,
        filter: Filter,
        handler: impl FnMut(&mut Context, &Stanza) -> Control + 'static,
    ) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, filter, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns whether it was still registered.
    pub fn unregister(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Run `stanza` through all matching handlers. Returns
    /// [`Control::CloseSession`] as soon as a handler asks for it, otherwise
    /// [`Control::Continue`]. Stanzas nothing matches are dropped silently.
    pub fn dispatch(&mut self, ctx: &mut Context, stanza: &Stanza) -> Control {
        for (_, filter, handler) in self.handlers.iter_mut() {
            if !filter.matches(stanza) {
                continue;
            }
            match handler(ctx, stanza) {
                Control::Continue => (),
                Control::StopOtherHandlers => break,
                Control::CloseSession => return Control::CloseSession,
            }
        }
        Control::Continue
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ctx() -> Context {
        Context::new(
            "juliet@capulet.example".parse().unwrap(),
            Arc::new(IdGenerator::new()),
        )
    }

    fn message(typ: Option<&str>) -> Stanza {
        let mut st = Stanza::new("message");
        if let Some(typ) = typ {
            st.set_attr("type", typ);
        }
        st
    }

    #[test]
    fn filter_matches_name_ns_and_type() {
        assert!(Filter::new().matches(&message(None)));
        assert!(Filter::new().name("message").matches(&message(None)));
        assert!(!Filter::new().name("presence").matches(&message(None)));
        assert!(Filter::new()
            .name("message")
            .typ("chat")
            .matches(&message(Some("chat"))));
        assert!(!Filter::new().typ("chat").matches(&message(None)));
        let features = Stanza::new("features").with_ns(crate::ns::STREAMS);
        assert!(Filter::new().ns(crate::ns::STREAMS).matches(&features));
        assert!(!Filter::new().ns(crate::ns::STREAMS).matches(&message(None)));
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            dispatcher.register(Filter::new(), move |_, _| {
                order.borrow_mut().push(tag);
                Control::Continue
            });
        }
        dispatcher.dispatch(&mut ctx(), &message(None));
        assert_eq!(*order.borrow(), ["first", "second", "third"]);
    }

    #[test]
    fn stop_other_handlers_halts_the_cycle() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        {
            let seen = seen.clone();
            dispatcher.register(Filter::new(), move |_, _| {
                seen.borrow_mut().push("stopper");
                Control::StopOtherHandlers
            });
        }
        {
            let seen = seen.clone();
            dispatcher.register(Filter::new(), move |_, _| {
                seen.borrow_mut().push("late");
                Control::Continue
            });
        }
        let control = dispatcher.dispatch(&mut ctx(), &message(None));
        assert_eq!(control, Control::Continue);
        assert_eq!(*seen.borrow(), ["stopper"]);
    }

    #[test]
    fn close_session_wins_immediately() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Filter::new(), |_, _| Control::CloseSession);
        dispatcher.register(Filter::new(), |_, _| panic!("must not run"));
        let control = dispatcher.dispatch(&mut ctx(), &message(None));
        assert_eq!(control, Control::CloseSession);
    }

    #[test]
    fn unregistered_handlers_no_longer_run() {
        let mut dispatcher = Dispatcher::new();
        let id = dispatcher.register(Filter::new(), |_, _| panic!("must not run"));
        assert!(dispatcher.unregister(id));
        assert!(!dispatcher.unregister(id));
        dispatcher.dispatch(&mut ctx(), &message(None));
    }

    #[test]
    fn non_matching_stanzas_are_dropped() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Filter::new().name("presence"), |_, _| {
            panic!("must not run")
        });
        let control = dispatcher.dispatch(&mut ctx(), &message(None));
        assert_eq!(control, Control::Continue);
    }

    #[test]
    fn queued_stanzas_keep_their_order() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Filter::new(), |ctx, _| {
            ctx.send(Stanza::new("first"));
            ctx.send(Stanza::new("second"));
            Control::Continue
        });
        let mut ctx = ctx();
        dispatcher.dispatch(&mut ctx, &message(None));
        let names: Vec<_> = ctx
            .take_outbound()
            .iter()
            .map(|st| st.name().to_string())
            .collect();
        assert_eq!(names, ["first", "second"]);
        assert!(ctx.take_outbound().is_empty());
    }
}
