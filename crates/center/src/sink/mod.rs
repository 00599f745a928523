//! The three sink capabilities and the uniform invocation path the dispatcher uses.

mod error;
mod foreign;
mod native;
mod signature;
mod toolkit;

pub use error::{SinkError, SinkErrorExt};
pub use foreign::{CallableParts, ForeignRuntime, ForeignSink};
pub use native::NativeFn;
pub use signature::{EVENT_ARG, Signature};
pub use toolkit::SlotTarget;

pub(crate) use foreign::{ForeignAttach, ForeignObject};
pub(crate) use native::Multicast;
pub(crate) use toolkit::AttachedSlot;

use crate::error::Result;
use crate::event::Event;
use std::borrow::Cow;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Label of a sink capability, as carried in the `type` payload field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum SinkKind {
    Native,
    Toolkit,
    Foreign,
}

impl SinkKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A callback capability handed to [`crate::NotificationCenter::connect`].
///
/// Attach checks (slot signature and lookup, foreign callability) run inside `connect`, before
/// any connection exists.
pub struct Sink(Pending);

enum Pending {
    Native(NativeFn),
    Toolkit { target: Rc<dyn SlotTarget>, slot: Cow<'static, str> },
    Foreign(Box<dyn ForeignAttach>),
}

impl Sink {
    /// A native closure that cannot fail.
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&Event) + 'static,
    {
        Self(Pending::Native(Rc::new(move |event: &Event| -> std::result::Result<(), SinkError> {
            f(event);
            Ok(())
        })))
    }

    /// A native closure reporting failure through [`SinkError`].
    pub fn native_fallible<F>(f: F) -> Self
    where
        F: Fn(&Event) -> std::result::Result<(), SinkError> + 'static,
    {
        Self(Pending::Native(Rc::new(f)))
    }

    /// A toolkit slot on `target`, named by signature (e.g. `"onEvent(const Event&)"`).
    pub fn slot(target: Rc<dyn SlotTarget>, slot: impl Into<Cow<'static, str>>) -> Self {
        Self(Pending::Toolkit { target, slot: slot.into() })
    }

    /// A callable object living in a foreign runtime.
    pub fn foreign<R: ForeignRuntime>(runtime: Rc<R>, object: R::Object) -> Self {
        Self(Pending::Foreign(Box::new(ForeignObject::new(runtime, object))))
    }

    #[must_use]
    pub const fn kind(&self) -> SinkKind {
        match self.0 {
            Pending::Native(_) => SinkKind::Native,
            Pending::Toolkit { .. } => SinkKind::Toolkit,
            Pending::Foreign(_) => SinkKind::Foreign,
        }
    }

    /// Runs the attach checks against the signal signature of the target identity.
    pub(crate) fn attach(self, signal: &Signature) -> Result<AttachedSink> {
        match self.0 {
            Pending::Native(f) => Ok(AttachedSink::Native(f)),
            Pending::Toolkit { target, slot } => {
                AttachedSlot::attach(target, &slot, signal).map(AttachedSink::Toolkit)
            },
            Pending::Foreign(object) => object.attach().map(AttachedSink::Foreign),
        }
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Pending::Native(_) => f.write_str("Sink::Native"),
            Pending::Toolkit { target, slot } => f
                .debug_struct("Sink::Toolkit")
                .field("target", &target.object_name())
                .field("slot", slot)
                .finish(),
            Pending::Foreign(object) => f.debug_tuple("Sink::Foreign").field(object).finish(),
        }
    }
}

/// A sink that passed its attach checks. Cheap to clone.
#[derive(Clone)]
pub(crate) enum AttachedSink {
    Native(NativeFn),
    Toolkit(AttachedSlot),
    Foreign(Rc<dyn ForeignSink>),
}

impl AttachedSink {
    pub(crate) const fn kind(&self) -> SinkKind {
        match self {
            Self::Native(_) => SinkKind::Native,
            Self::Toolkit(_) => SinkKind::Toolkit,
            Self::Foreign(_) => SinkKind::Foreign,
        }
    }

    pub(crate) fn invoke(&self, event: &Event) -> std::result::Result<(), SinkError> {
        match self {
            Self::Native(f) => f(event),
            Self::Toolkit(slot) => slot.invoke(event),
            Self::Foreign(callable) => callable.invoke(event),
        }
    }
}

impl fmt::Debug for AttachedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native"),
            Self::Toolkit(slot) => f.debug_tuple("Toolkit").field(slot).finish(),
            Self::Foreign(callable) => f.debug_tuple("Foreign").field(callable).finish(),
        }
    }
}

/// Runs one sink invocation, turning a panic into [`SinkError::Panicked`].
pub(crate) fn guarded(
    f: impl FnOnce() -> std::result::Result<(), SinkError>,
) -> std::result::Result<(), SinkError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| Err(SinkError::from_panic(&*payload)))
}
