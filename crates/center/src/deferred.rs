use crate::connection::ConnectionId;
use fxhash::FxHashMap;

/// Connections waiting on identities that are not registered yet, keyed by fingerprint.
#[derive(Debug, Default)]
pub(crate) struct DeferredIndex {
    waiting: FxHashMap<u32, Vec<ConnectionId>>,
}

impl DeferredIndex {
    pub(crate) fn push(&mut self, fingerprint: u32, id: ConnectionId) {
        self.waiting.entry(fingerprint).or_default().push(id);
    }

    /// Removes `id`; drops the fingerprint entry once it is empty.
    pub(crate) fn remove(&mut self, fingerprint: u32, id: ConnectionId) -> bool {
        let Some(list) = self.waiting.get_mut(&fingerprint) else {
            return false;
        };
        let before = list.len();
        list.retain(|waiting| *waiting != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.waiting.remove(&fingerprint);
        }
        removed
    }

    /// Takes every waiting handle for `fingerprint`, in connect order.
    pub(crate) fn take(&mut self, fingerprint: u32) -> Vec<ConnectionId> {
        self.waiting.remove(&fingerprint).unwrap_or_default()
    }

    /// Number of identities with at least one waiting connection.
    pub(crate) fn len(&self) -> usize {
        self.waiting.len()
    }
}
