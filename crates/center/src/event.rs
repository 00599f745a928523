use crate::identity::EventId;
use fxhash::FxHashMap;
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

/// Well-known payload key carrying the affected event name.
pub const KEY_ID: &str = "id";
/// Well-known payload key carrying the sink-kind label.
pub const KEY_TYPE: &str = "type";

/// Payload field map. Keys are unique; order is irrelevant.
pub type Fields = FxHashMap<String, Value>;

/// One notification: an identity plus its payload fields.
#[derive(Debug, Clone)]
pub struct Event {
    id: EventId,
    fields: Fields,
}

impl Event {
    #[must_use]
    pub fn new(id: EventId) -> Self {
        Self { id, fields: Fields::default() }
    }

    /// Builder-style field insertion.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    #[must_use]
    pub const fn id(&self) -> &EventId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.id.name()
    }

    #[must_use]
    pub const fn fields(&self) -> &Fields {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Convenience accessor for string fields such as [`KEY_ID`] and [`KEY_TYPE`].
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

impl From<EventId> for Event {
    fn from(id: EventId) -> Self {
        Self::new(id)
    }
}

impl From<&EventId> for Event {
    fn from(id: &EventId) -> Self {
        Self::new(id.clone())
    }
}

/// Delivery priority of a queued post. Higher priorities are delivered first within a drain.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// Highest first.
    pub(crate) const DESCENDING: [Self; 3] = [Self::High, Self::Normal, Self::Low];

    pub(crate) const fn band(self) -> usize {
        match self {
            Self::High => 0,
            Self::Normal => 1,
            Self::Low => 2,
        }
    }
}

/// Queued (`Soon`) or drain-then-deliver (`Now`) posting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum PostMode {
    #[default]
    Soon,
    Now,
}
