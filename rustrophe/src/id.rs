//! Stanza id generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generates unique stanza ids: a monotonically increasing counter rendered
/// as lowercase hex.
///
/// The generator is injected into a session (shared through an `Arc`) so
/// tests can seed it and so two sessions never have to share hidden global
/// state.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> IdGenerator {
        IdGenerator::with_seed(0)
    }

    /// Start counting from `seed`. Useful for deterministic tests.
    pub fn with_seed(seed: u64) -> IdGenerator {
        IdGenerator {
            next: AtomicU64::new(seed),
        }
    }

    pub fn next_id(&self) -> String {
        format!("{:x}", self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        IdGenerator::new()
    }
}
