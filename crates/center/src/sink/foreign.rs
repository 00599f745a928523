use super::SinkError;
use crate::error::{CenterError, Result};
use crate::event::{Event, Fields};
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// The handles needed to rebuild a bound callable: function, receiver and class.
///
/// Each handle is an independently reference-counted `R::Object`, held for as long as the
/// connection exists.
#[derive(Debug, Clone)]
pub struct CallableParts<O> {
    pub method: O,
    pub instance: O,
    pub class: O,
}

/// Bridge to an embedded runtime with a global execution lock.
///
/// Every method that touches runtime state takes the lock guard as proof that the lock is
/// held. The dispatcher acquires the guard once per invocation and drops it on every exit
/// path.
pub trait ForeignRuntime: fmt::Debug + 'static {
    /// A reference-counted runtime object. Cloning takes a reference, dropping releases it.
    type Object: Clone + fmt::Debug + 'static;
    type Callable;
    type Value;
    type Error: fmt::Display;
    type Guard<'a>
    where
        Self: 'a;

    /// Acquires the global execution lock; it is released when the guard drops.
    fn acquire(&self) -> Self::Guard<'_>;

    /// Splits a callable object into its parts, or `None` if it cannot be called.
    fn split(&self, object: &Self::Object) -> Option<CallableParts<Self::Object>>;

    /// Rebuilds the callable from its parts.
    ///
    /// # Errors
    /// Returns the runtime's error if the callable cannot be reconstructed.
    fn build_callable(
        &self,
        guard: &Self::Guard<'_>,
        parts: &CallableParts<Self::Object>,
    ) -> std::result::Result<Self::Callable, Self::Error>;

    /// Converts the payload field map into a runtime mapping.
    ///
    /// # Errors
    /// Returns the runtime's error if a value has no runtime representation.
    fn to_foreign_value(
        &self,
        guard: &Self::Guard<'_>,
        fields: &Fields,
    ) -> std::result::Result<Self::Value, Self::Error>;

    /// An empty mapping, passed when the payload could not be converted.
    fn empty_mapping(&self, guard: &Self::Guard<'_>) -> Self::Value;

    /// Calls `callable` with a single mapping argument.
    ///
    /// # Errors
    /// Returns the error the runtime raised during the call.
    fn call(
        &self,
        guard: &Self::Guard<'_>,
        callable: &Self::Callable,
        argument: Self::Value,
    ) -> std::result::Result<(), Self::Error>;

    /// Clears the runtime's pending error indicator.
    fn clear_error(&self, guard: &Self::Guard<'_>);
}

/// An attached foreign callable, invoked uniformly by the dispatcher.
pub trait ForeignSink: fmt::Debug {
    /// Calls into the runtime under its execution lock. Runtime errors are cleared there and
    /// reported as [`SinkError::Foreign`].
    ///
    /// # Errors
    /// See above.
    fn invoke(&self, event: &Event) -> std::result::Result<(), SinkError>;
}

/// A foreign object that has not yet passed the callability check.
pub(crate) struct ForeignObject<R: ForeignRuntime> {
    runtime: Rc<R>,
    object: R::Object,
}

impl<R: ForeignRuntime> ForeignObject<R> {
    pub(crate) const fn new(runtime: Rc<R>, object: R::Object) -> Self {
        Self { runtime, object }
    }
}

impl<R: ForeignRuntime> fmt::Debug for ForeignObject<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignObject").field("object", &self.object).finish_non_exhaustive()
    }
}

pub(crate) trait ForeignAttach: fmt::Debug {
    fn attach(self: Box<Self>) -> Result<Rc<dyn ForeignSink>>;
}

impl<R: ForeignRuntime> ForeignAttach for ForeignObject<R> {
    fn attach(self: Box<Self>) -> Result<Rc<dyn ForeignSink>> {
        let Some(parts) = self.runtime.split(&self.object) else {
            return Err(CenterError::rejected(format!("foreign object {:?} is not callable", self.object)));
        };
        Ok(Rc::new(ForeignCallable { runtime: self.runtime, parts }))
    }
}

struct ForeignCallable<R: ForeignRuntime> {
    runtime: Rc<R>,
    parts: CallableParts<R::Object>,
}

impl<R: ForeignRuntime> fmt::Debug for ForeignCallable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignCallable").field("method", &self.parts.method).finish_non_exhaustive()
    }
}

impl<R: ForeignRuntime> ForeignSink for ForeignCallable<R> {
    fn invoke(&self, event: &Event) -> std::result::Result<(), SinkError> {
        let runtime = self.runtime.as_ref();
        let guard = runtime.acquire();

        let callable = runtime.build_callable(&guard, &self.parts).map_err(|e| {
            runtime.clear_error(&guard);
            SinkError::Foreign { message: e.to_string().into(), context: Some("rebuilding callable".into()) }
        })?;

        let argument = runtime.to_foreign_value(&guard, event.fields()).unwrap_or_else(|e| {
            warn!(event = %event.name(), error = %e, "Event fields have no foreign representation, passing an empty mapping");
            runtime.clear_error(&guard);
            runtime.empty_mapping(&guard)
        });

        runtime.call(&guard, &callable, argument).map_err(|e| {
            runtime.clear_error(&guard);
            SinkError::Foreign { message: e.to_string().into(), context: None }
        })
    }
}
