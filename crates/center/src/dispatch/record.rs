use crate::connection::ConnectionId;
use crate::event::Event;
use crate::sink::{AttachedSink, AttachedSlot, ForeignSink, Multicast, Signature, SinkError, SinkKind, guarded};
use std::rc::Rc;

/// Per-identity sink lists. Created the first time a connection for the identity becomes
/// active and kept for the life of the center.
#[derive(Debug, Default)]
pub(crate) struct DispatchRecord {
    native: Multicast,
    toolkit: Option<ToolkitGroup>,
    foreign: Vec<(ConnectionId, Rc<dyn ForeignSink>)>,
}

/// Toolkit slots share the identity's signal signature.
#[derive(Debug)]
struct ToolkitGroup {
    signal: Signature,
    slots: Vec<(ConnectionId, AttachedSlot)>,
}

impl DispatchRecord {
    pub(crate) fn attach(&mut self, id: ConnectionId, sink: &AttachedSink, signal: impl FnOnce() -> Signature) {
        match sink {
            AttachedSink::Native(f) => self.native.attach(id, Rc::clone(f)),
            AttachedSink::Toolkit(slot) => self
                .toolkit
                .get_or_insert_with(|| ToolkitGroup { signal: signal(), slots: Vec::new() })
                .slots
                .push((id, slot.clone())),
            AttachedSink::Foreign(callable) => self.foreign.push((id, Rc::clone(callable))),
        }
    }

    pub(crate) fn detach(&mut self, id: ConnectionId, kind: SinkKind) -> bool {
        match kind {
            SinkKind::Native => self.native.detach(id),
            SinkKind::Toolkit => self.toolkit.as_mut().is_some_and(|group| {
                let before = group.slots.len();
                group.slots.retain(|(slot, _)| *slot != id);
                group.slots.len() != before
            }),
            SinkKind::Foreign => {
                let before = self.foreign.len();
                self.foreign.retain(|(callable, _)| *callable != id);
                self.foreign.len() != before
            },
        }
    }

    /// Signal signature recorded by the first toolkit attach.
    pub(crate) fn toolkit_signal(&self) -> Option<&Signature> {
        self.toolkit.as_ref().map(|group| &group.signal)
    }

    /// Copies the sink lists so delivery runs without holding the tables.
    pub(crate) fn snapshot(&self) -> Delivery {
        Delivery {
            native: self.native.clone(),
            toolkit: self.toolkit.as_ref().map(|g| g.slots.clone()).unwrap_or_default(),
            foreign: self.foreign.clone(),
        }
    }
}

/// Sinks captured for one delivery.
#[derive(Debug)]
pub(crate) struct Delivery {
    native: Multicast,
    toolkit: Vec<(ConnectionId, AttachedSlot)>,
    foreign: Vec<(ConnectionId, Rc<dyn ForeignSink>)>,
}

impl Delivery {
    pub(crate) fn len(&self) -> usize {
        self.native.len() + self.toolkit.len() + self.foreign.len()
    }

    /// Invokes native, then toolkit, then foreign sinks, each group in attach order. Sinks
    /// for which `live` returns `false` (disconnected meanwhile) are skipped.
    pub(crate) fn run(
        &self,
        event: &Event,
        mut live: impl FnMut(ConnectionId) -> bool,
    ) -> Vec<(ConnectionId, SinkKind, SinkError)> {
        let mut failures = Vec::new();

        if !self.native.is_empty() {
            failures.extend(
                self.native.emit(event, &mut live).into_iter().map(|(id, err)| (id, SinkKind::Native, err)),
            );
        }

        for (id, slot) in &self.toolkit {
            if live(*id) {
                if let Err(err) = guarded(|| slot.invoke(event)) {
                    failures.push((*id, SinkKind::Toolkit, err));
                }
            }
        }

        for (id, callable) in &self.foreign {
            if live(*id) {
                if let Err(err) = guarded(|| callable.invoke(event)) {
                    failures.push((*id, SinkKind::Foreign, err));
                }
            }
        }

        failures
    }
}
