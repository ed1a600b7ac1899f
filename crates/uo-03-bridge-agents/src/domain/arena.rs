//! # Nonce Arena
//!
//! Append-only log of records indexed by nonce. Nonces start at 1 and are
//! never reused. Redeemed records become tombstones, so a lookup can tell
//! "never issued" apart from "already redeemed".

use shared_types::Nonce;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot<T> {
    Occupied(T),
    Tombstone,
}

/// Result of looking up a nonce.
#[derive(Debug, PartialEq, Eq)]
pub enum Entry<'a, T> {
    /// Nonce was never issued.
    Absent,
    /// Record existed and was redeemed.
    Tombstoned,
    /// Live record.
    Live(&'a T),
}

/// Append-only, nonce-indexed record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceArena<T> {
    slots: Vec<Slot<T>>,
}

impl<T> Default for NonceArena<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> NonceArena<T> {
    /// Empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Nonce the next `insert` will return.
    pub fn next_nonce(&self) -> Nonce {
        self.slots.len() as Nonce + 1
    }

    /// Append a record, returning its nonce.
    pub fn insert(&mut self, value: T) -> Nonce {
        self.slots.push(Slot::Occupied(value));
        self.slots.len() as Nonce
    }

    /// Look up `nonce`.
    pub fn entry(&self, nonce: Nonce) -> Entry<'_, T> {
        match self.index(nonce).map(|i| &self.slots[i]) {
            None => Entry::Absent,
            Some(Slot::Tombstone) => Entry::Tombstoned,
            Some(Slot::Occupied(v)) => Entry::Live(v),
        }
    }

    /// Live record under `nonce`.
    pub fn get(&self, nonce: Nonce) -> Option<&T> {
        match self.entry(nonce) {
            Entry::Live(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable live record under `nonce`.
    pub fn get_mut(&mut self, nonce: Nonce) -> Option<&mut T> {
        let i = self.index(nonce)?;
        match &mut self.slots[i] {
            Slot::Occupied(v) => Some(v),
            Slot::Tombstone => None,
        }
    }

    /// Remove the live record under `nonce`, leaving a tombstone.
    pub fn tombstone(&mut self, nonce: Nonce) -> Option<T> {
        let i = self.index(nonce)?;
        match std::mem::replace(&mut self.slots[i], Slot::Tombstone) {
            Slot::Occupied(v) => Some(v),
            Slot::Tombstone => None,
        }
    }

    /// Number of live records.
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Occupied(_)))
            .count()
    }

    /// Iterate `(nonce, record)` for live records.
    pub fn iter(&self) -> impl Iterator<Item = (Nonce, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| match s {
            Slot::Occupied(v) => Some((i as Nonce + 1, v)),
            Slot::Tombstone => None,
        })
    }

    fn index(&self, nonce: Nonce) -> Option<usize> {
        let i = (nonce as usize).checked_sub(1)?;
        (i < self.slots.len()).then_some(i)
    }
}
