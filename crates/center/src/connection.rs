use crate::error::{CenterError, Result};
use crate::identity::EventId;
use crate::sink::{AttachedSink, SinkKind};
use fxhash::FxHashMap;
use std::fmt;
use strum_macros::{Display, IntoStaticStr};

/// Handle returned by `connect`. Monotonic and never reused within a center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u32);

impl ConnectionId {
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    /// Waiting for its identity to be registered.
    Deferred,
    /// Wired into the identity's dispatch record.
    Active,
}

#[derive(Debug)]
pub(crate) struct Connection {
    pub(crate) event: EventId,
    pub(crate) sink: AttachedSink,
    pub(crate) state: ConnectionState,
}

impl Connection {
    pub(crate) const fn kind(&self) -> SinkKind {
        self.sink.kind()
    }
}

/// Every live connection keyed by handle.
#[derive(Debug)]
pub(crate) struct ConnectionTable {
    connections: FxHashMap<ConnectionId, Connection>,
    next: u32,
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self { connections: FxHashMap::default(), next: 1 }
    }
}

impl ConnectionTable {
    /// Stores `connection` under the next handle.
    ///
    /// Fails with [`CenterError::Internal`] once the handle space is spent; handles are never
    /// recycled.
    pub(crate) fn insert(&mut self, connection: Connection) -> Result<ConnectionId> {
        let next = self.next.checked_add(1).ok_or_else(|| CenterError::Internal {
            message: "connection handles exhausted".into(),
            context: None,
        })?;
        let id = ConnectionId(self.next);
        self.next = next;
        self.connections.insert(id, connection);
        Ok(id)
    }

    pub(crate) fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub(crate) fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Flips a deferred connection to active. Returns `false` if it was not deferred.
    pub(crate) fn activate(&mut self, id: ConnectionId) -> bool {
        match self.connections.get_mut(&id) {
            Some(conn) if conn.state == ConnectionState::Deferred => {
                conn.state = ConnectionState::Active;
                true
            },
            _ => false,
        }
    }

    pub(crate) fn state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.connections.get(&id).map(|c| c.state)
    }

    pub(crate) fn len(&self) -> usize {
        self.connections.len()
    }

    /// Handles in issue order.
    pub(crate) fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.connections.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Connections for `event` in issue order.
    pub(crate) fn for_event(&self, event: &EventId) -> Vec<(ConnectionId, &Connection)> {
        let mut found: Vec<_> =
            self.connections.iter().filter(|(_, c)| &c.event == event).map(|(id, c)| (*id, c)).collect();
        found.sort_unstable_by_key(|(id, _)| *id);
        found
    }
}
