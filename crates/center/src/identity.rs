use crate::error::{CenterError, Result};
use fxhash::FxHasher32;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// First ordinal handed out to user events; lower numbers belong to the host.
pub const FIRST_USER_ORDINAL: u32 = 1001;

static NEXT_ORDINAL: AtomicU32 = AtomicU32::new(FIRST_USER_ORDINAL);

/// Runtime slot number assigned to an event at registration.
///
/// Only meaningful for the current process; never persist it or compare it across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ordinal(u32);

impl Ordinal {
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out ordinals at registration time.
pub trait OrdinalAllocator: fmt::Debug {
    fn allocate(&self, name: &str) -> Ordinal;
}

/// Process-wide counter starting at [`FIRST_USER_ORDINAL`]. Ordinals are never reused, even
/// across centers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialOrdinals;

impl OrdinalAllocator for SequentialOrdinals {
    fn allocate(&self, _name: &str) -> Ordinal {
        Ordinal(NEXT_ORDINAL.fetch_add(1, Ordering::Relaxed))
    }
}

/// Stable 32-bit content hash of an event name.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn fingerprint(name: &str) -> u32 {
    let mut hasher = FxHasher32::default();
    hasher.write(name.as_bytes());
    // FxHasher32 keeps a 32-bit state; `finish` only widens it.
    hasher.finish() as u32
}

/// Immutable name of an event class.
///
/// Equality and hashing use the fingerprint only, so two names that collide are the same
/// identity. The ordinal is set once the identity has been registered with a center.
#[derive(Clone)]
pub struct EventId {
    name: Arc<str>,
    fingerprint: u32,
    ordinal: Option<Ordinal>,
}

impl EventId {
    /// Creates an identity from `name`, trimmed.
    ///
    /// # Errors
    /// Returns [`CenterError::InvalidEventName`] if the trimmed name is empty.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(CenterError::InvalidEventName {
                message: "event name must not be empty".into(),
                context: None,
            });
        }
        Ok(Self { name: Arc::from(name), fingerprint: fingerprint(name), ordinal: None })
    }

    /// For names known to be valid at compile time.
    pub(crate) fn from_static(name: &'static str) -> Self {
        Self { name: Arc::from(name), fingerprint: fingerprint(name), ordinal: None }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// `None` until the identity has been registered.
    #[must_use]
    pub const fn ordinal(&self) -> Option<Ordinal> {
        self.ordinal
    }

    pub(crate) fn with_ordinal(mut self, ordinal: Ordinal) -> Self {
        self.ordinal = Some(ordinal);
        self
    }
}

impl PartialEq for EventId {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for EventId {}

impl Hash for EventId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint.hash(state);
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventId")
            .field("name", &&*self.name)
            .field("fingerprint", &format_args!("{:#010x}", self.fingerprint))
            .field("ordinal", &self.ordinal)
            .finish()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl TryFrom<&str> for EventId {
    type Error = CenterError;

    fn try_from(name: &str) -> Result<Self> {
        Self::new(name)
    }
}

/// The three identities every center registers for itself at construction.
#[derive(Debug, Clone)]
pub struct WellKnownEvents {
    /// Posted after a new identity is registered. Payload: `id`.
    pub registered: EventId,
    /// Posted when a connection becomes active. Payload: `id`, `type`.
    pub connected: EventId,
    /// Posted after a connection is removed. Payload: `id`, `type`.
    pub disconnected: EventId,
}

impl WellKnownEvents {
    pub const REGISTERED: &'static str = "herald.NotificationCenter.EventRegistered";
    pub const CONNECTED: &'static str = "herald.NotificationCenter.EventConnected";
    pub const DISCONNECTED: &'static str = "herald.NotificationCenter.EventDisconnected";

    pub(crate) fn new() -> Self {
        Self {
            registered: EventId::from_static(Self::REGISTERED),
            connected: EventId::from_static(Self::CONNECTED),
            disconnected: EventId::from_static(Self::DISCONNECTED),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &EventId> {
        [&self.registered, &self.connected, &self.disconnected].into_iter()
    }
}
