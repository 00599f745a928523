use super::SinkError;
use crate::connection::ConnectionId;
use crate::event::Event;
use std::fmt;
use std::rc::Rc;

/// A native callback. Errors are logged by the dispatcher and never reach the poster.
pub type NativeFn = Rc<dyn Fn(&Event) -> Result<(), SinkError>>;

/// Ordered list of native closures keyed by their connection handle.
#[derive(Clone, Default)]
pub(crate) struct Multicast {
    slots: Vec<(ConnectionId, NativeFn)>,
}

impl Multicast {
    /// Appends `f`; the connection handle is the removal key.
    pub(crate) fn attach(&mut self, id: ConnectionId, f: NativeFn) {
        self.slots.push((id, f));
    }

    pub(crate) fn detach(&mut self, id: ConnectionId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(slot, _)| *slot != id);
        self.slots.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Calls every closure still accepted by `live`, in attach order. A failing or panicking
    /// closure does not stop the rest.
    pub(crate) fn emit(
        &self,
        event: &Event,
        mut live: impl FnMut(ConnectionId) -> bool,
    ) -> Vec<(ConnectionId, SinkError)> {
        let mut failures = Vec::new();
        for (id, f) in &self.slots {
            if !live(*id) {
                continue;
            }
            if let Err(err) = super::guarded(|| f(event)) {
                failures.push((*id, err));
            }
        }
        failures
    }
}

impl fmt::Debug for Multicast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter().map(|(id, _)| id)).finish()
    }
}
