//! # Identifier
//!
//! A message identifier (UID) names a message within the namespace of
//! one store. Positive identifiers are assigned by stores and are
//! never reused while the message persists. Negative identifiers are
//! placeholders synthesized locally for messages that exist in the
//! local store but have no confirmed remote counterpart yet:
//! placeholders are never persisted nor sent to a remote store.

/// Alias for a message identifier.
pub type Id = i64;

/// The marker passed to a store save to ask for a new identifier.
pub const UNCONFIRMED: Id = -1;

/// Return `true` if the given identifier has been assigned by a
/// store.
pub fn is_confirmed(id: Id) -> bool {
    id > 0
}

/// Return `true` if the given identifier is a locally synthesized
/// placeholder.
pub fn is_placeholder(id: Id) -> bool {
    id < 0
}

/// Generator of unique placeholder identifiers.
///
/// Placeholders start at `-1` and strictly decrease, so that two
/// placeholders allocated by the same generator never collide.
#[derive(Debug)]
pub struct Placeholders {
    next: Id,
}

impl Placeholders {
    pub fn new() -> Self {
        Self { next: -1 }
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Placeholders {
    type Item = Id;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next;
        self.next -= 1;
        Some(id)
    }
}
