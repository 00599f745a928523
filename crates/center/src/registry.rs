use crate::identity::EventId;
use fxhash::FxHashMap;
use std::collections::BTreeSet;

/// Identities a center recognizes, keyed by fingerprint. Insert-once; never shrinks.
#[derive(Debug, Default)]
pub(crate) struct EventRegistry {
    events: FxHashMap<u32, EventId>,
}

impl EventRegistry {
    /// Returns `false` if the fingerprint is already present.
    pub(crate) fn insert(&mut self, id: EventId) -> bool {
        use std::collections::hash_map::Entry;
        match self.events.entry(id.fingerprint()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(id);
                true
            },
        }
    }

    pub(crate) fn contains(&self, fingerprint: u32) -> bool {
        self.events.contains_key(&fingerprint)
    }

    pub(crate) fn get(&self, fingerprint: u32) -> Option<&EventId> {
        self.events.get(&fingerprint)
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn names(&self) -> BTreeSet<String> {
        self.events.values().map(|id| id.name().to_owned()).collect()
    }

    /// Registered identities sorted by name.
    pub(crate) fn sorted(&self) -> Vec<&EventId> {
        let mut ids: Vec<_> = self.events.values().collect();
        ids.sort_unstable_by(|a, b| a.name().cmp(b.name()));
        ids
    }
}
