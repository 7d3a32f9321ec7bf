// Copyright (c) 2025 rustrophe contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Jabber identifiers: `local@domain/resource`.

use std::fmt;
use std::str::FromStr;

/// An error that can be raised when parsing a JID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The domain part is missing or empty.
    NoDomain,
    /// A localpart was given but it is empty.
    EmptyLocal,
    /// A resource was given but it is empty.
    EmptyResource,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoDomain => write!(fmt, "no domain found in this JID"),
            Error::EmptyLocal => write!(fmt, "localpart empty in this JID"),
            Error::EmptyResource => write!(fmt, "resource empty in this JID"),
        }
    }
}

impl std::error::Error for Error {}

/// A Jabber identifier.
///
/// Bare JIDs (`local@domain`) address an account; full JIDs carry a resource
/// and address one connected client of that account.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Jid {
    local: Option<String>,
    domain: String,
    resource: Option<String>,
}

impl Jid {
    pub fn local(&self) -> Option<&str> {
        self.local.as_deref()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn is_full(&self) -> bool {
        self.resource.is_some()
    }

    /// This JID without its resource.
    pub fn bare(&self) -> Jid {
        Jid {
            local: self.local.clone(),
            domain: self.domain.clone(),
            resource: None,
        }
    }

    /// This JID with `resource` in place of its current resource.
    pub fn with_resource(&self, resource: &str) -> Result<Jid, Error> {
        if resource.is_empty() {
            return Err(Error::EmptyResource);
        }
        Ok(Jid {
            local: self.local.clone(),
            domain: self.domain.clone(),
            resource: Some(resource.to_string()),
        })
    }
}

impl FromStr for Jid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Jid, Error> {
        // the resourcepart is everything after the first slash
        let (rest, resource) = match s.split_once('/') {
            Some((_, resource)) if resource.is_empty() => return Err(Error::EmptyResource),
            Some((rest, resource)) => (rest, Some(resource.to_string())),
            None => (s, None),
        };
        let (local, domain) = match rest.split_once('@') {
            Some((local, _)) if local.is_empty() => return Err(Error::EmptyLocal),
            Some((local, domain)) => (Some(local.to_string()), domain),
            None => (None, rest),
        };
        if domain.is_empty() {
            return Err(Error::NoDomain);
        }
        Ok(Jid {
            local,
            domain: domain.to_string(),
            resource,
        })
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if let Some(local) = &self.local {
            write!(fmt, "{}@", local)?;
        }
        write!(fmt, "{}", self.domain)?;
        if let Some(resource) = &self.resource {
            write!(fmt, "/{}", resource)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_jid() {
        let jid: Jid = "juliet@capulet.example/balcony".parse().unwrap();
        assert_eq!(jid.local(), Some("juliet"));
        assert_eq!(jid.domain(), "capulet.example");
        assert_eq!(jid.resource(), Some("balcony"));
        assert!(jid.is_full());
    }

    #[test]
    fn parses_bare_and_domain_jids() {
        let bare: Jid = "juliet@capulet.example".parse().unwrap();
        assert_eq!(bare.resource(), None);
        let domain: Jid = "capulet.example".parse().unwrap();
        assert_eq!(domain.local(), None);
        assert_eq!(domain.domain(), "capulet.example");
    }

    #[test]
    fn resource_may_contain_slashes() {
        let jid: Jid = "juliet@capulet.example/balcony/east".parse().unwrap();
        assert_eq!(jid.resource(), Some("balcony/east"));
    }

    #[test]
    fn rejects_malformed_jids() {
        assert_eq!("@capulet.example".parse::<Jid>(), Err(Error::EmptyLocal));
        assert_eq!("juliet@".parse::<Jid>(), Err(Error::NoDomain));
        assert_eq!(
            "juliet@capulet.example/".parse::<Jid>(),
            Err(Error::EmptyResource)
        );
        assert_eq!("".parse::<Jid>(), Err(Error::NoDomain));
    }

    #[test]
    fn bare_strips_the_resource() {
        let jid: Jid = "juliet@capulet.example/balcony".parse().unwrap();
        assert_eq!(jid.bare().to_string(), "juliet@capulet.example");
    }

    #[test]
    fn with_resource_replaces_the_resource() {
        let room: Jid = "play@conference.example".parse().unwrap();
        let occupant = room.with_resource("juliet").unwrap();
        assert_eq!(occupant.to_string(), "play@conference.example/juliet");
        assert_eq!(room.with_resource(""), Err(Error::EmptyResource));
    }

    #[test]
    fn display_round_trips() {
        for s in [
            "capulet.example",
            "juliet@capulet.example",
            "juliet@capulet.example/balcony",
        ] {
            assert_eq!(s.parse::<Jid>().unwrap().to_string(), s);
        }
    }
}
