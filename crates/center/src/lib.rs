//! # Notification Center
//!
//! An in-process registry and dispatcher for named events. Producers post by a stable string
//! identity; consumers attach sinks without either side knowing the other's type.
//!
//! * **Identities**: [`EventId`] is a trimmed name plus a 32-bit fingerprint, which is the
//!   equality key. Registration assigns a process-local [`Ordinal`].
//! * **Deferred connections**: connecting to an identity that is not registered yet parks the
//!   connection; registering the identity later activates it, in connect order.
//! * **Posting**: `Soon` queues for the owner loop at a [`Priority`]; `Now` drains the queue
//!   and delivers synchronously. Other threads post through a [`Poster`].
//! * **Sinks**: native closures, toolkit slots resolved through a static method table
//!   ([`SlotTarget`]), and callables in a foreign runtime behind a global execution lock
//!   ([`ForeignRuntime`]). A failing sink never stops delivery to the others.
//!
//! ## Example
//!
//! ```rust
//! use herald_center::{EventId, NotificationCenter, PostMode, Priority};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let center = NotificationCenter::new();
//! let saved = EventId::new("doc.saved").unwrap();
//!
//! let seen = Rc::new(Cell::new(false));
//! let flag = Rc::clone(&seen);
//! let handle = center.connect_fn(&saved, move |_| flag.set(true)).unwrap();
//! assert!(center.is_deferred(handle));
//!
//! center.register(&saved);
//! assert!(center.is_active(handle));
//!
//! center.post_with(&saved, Priority::Normal, PostMode::Now);
//! assert!(seen.get());
//! ```

macro_rules! activity {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            ::tracing::info!($($arg)+)
        } else {
            ::tracing::trace!($($arg)+)
        }
    };
}

mod center;
mod connection;
mod deferred;
mod dispatch;
mod error;
mod event;
mod identity;
mod registry;
mod sink;

pub use center::NotificationCenter;
pub use connection::{ConnectionId, ConnectionState};
pub use dispatch::Poster;
pub use error::{CenterError, CenterErrorExt};
pub use event::{Event, Fields, KEY_ID, KEY_TYPE, PostMode, Priority};
pub use identity::{
    EventId, FIRST_USER_ORDINAL, Ordinal, OrdinalAllocator, SequentialOrdinals, WellKnownEvents,
    fingerprint,
};
pub use sink::{
    CallableParts, EVENT_ARG, ForeignRuntime, ForeignSink, NativeFn, Signature, Sink,
    SinkError, SinkErrorExt, SinkKind, SlotTarget,
};

pub use herald_config::CenterConfig;
