use super::SinkError;
use super::signature::Signature;
use crate::error::{CenterError, CenterErrorExt, Result};
use crate::event::Event;
use std::fmt;
use std::rc::Rc;

/// An object exposing slots through a static method table.
///
/// Implementors list their slot signatures in [`SlotTarget::slots`] and dispatch on the
/// index in [`SlotTarget::invoke_slot`]; the center resolves the index once, at attach time.
pub trait SlotTarget {
    /// Name used in diagnostics.
    fn object_name(&self) -> &str;

    /// Slot signatures, indexed by position. Entries are normalized before matching.
    fn slots(&self) -> &[&str];

    /// Invokes the slot at `index`. `args` holds as many leading signal arguments as the slot
    /// declares, so a `slot()` gets an empty slice and a `slot(Event)` gets the event.
    ///
    /// # Errors
    /// Implementations report slot failures as [`SinkError::Toolkit`].
    fn invoke_slot(&self, index: usize, args: &[&Event]) -> std::result::Result<(), SinkError>;
}

/// A slot that passed the signature and lookup checks.
#[derive(Clone)]
pub(crate) struct AttachedSlot {
    target: Rc<dyn SlotTarget>,
    slot: Signature,
    index: usize,
}

impl AttachedSlot {
    pub(crate) fn attach(target: Rc<dyn SlotTarget>, raw: &str, signal: &Signature) -> Result<Self> {
        let slot = Signature::parse(raw).context(format!("slot on {}", target.object_name()))?;

        if !signal.accepts(&slot) {
            return Err(CenterError::rejected(format!(
                "slot {slot} is not compatible with signal {signal}"
            )));
        }

        let index = resolve_index(target.as_ref(), &slot).ok_or_else(|| {
            CenterError::rejected(format!("{} has no slot {slot}", target.object_name()))
        })?;

        Ok(Self { target, slot, index })
    }

    pub(crate) fn invoke(&self, event: &Event) -> std::result::Result<(), SinkError> {
        let args = [event];
        let args = &args[..self.slot.arity().min(args.len())];
        self.target.invoke_slot(self.index, args)
    }
}

impl fmt::Debug for AttachedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachedSlot")
            .field("target", &self.target.object_name())
            .field("slot", &self.slot.to_string())
            .field("index", &self.index)
            .finish()
    }
}

fn resolve_index(target: &dyn SlotTarget, slot: &Signature) -> Option<usize> {
    target.slots().iter().position(|raw| Signature::parse(raw).is_ok_and(|candidate| &candidate == slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EventId;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Panel {
        calls: RefCell<Vec<(usize, usize)>>,
    }

    impl SlotTarget for Panel {
        fn object_name(&self) -> &str {
            "Panel"
        }

        fn slots(&self) -> &[&str] {
            &["refresh()", "onEvent(const herald::Event&)", "resize(int,int)"]
        }

        fn invoke_slot(&self, index: usize, args: &[&Event]) -> std::result::Result<(), SinkError> {
            self.calls.borrow_mut().push((index, args.len()));
            Ok(())
        }
    }

    fn signal() -> Signature {
        Signature::signal(&EventId::new("ui.changed").expect("valid"))
    }

    #[test]
    fn attach_resolves_index_and_passes_declared_args() {
        let panel = Rc::new(Panel::default());
        let target: Rc<dyn SlotTarget> = panel.clone();
        let event = Event::new(EventId::new("ui.changed").expect("valid"));

        let with_event = AttachedSlot::attach(Rc::clone(&target), "onEvent(Event)", &signal())
            .expect("compatible slot");
        let no_args = AttachedSlot::attach(target, "refresh()", &signal()).expect("compatible slot");

        with_event.invoke(&event).expect("slot call");
        no_args.invoke(&event).expect("slot call");
        assert_eq!(*panel.calls.borrow(), vec![(1, 1), (0, 0)]);
    }

    #[test]
    fn incompatible_or_missing_slots_are_rejected() {
        let target: Rc<dyn SlotTarget> = Rc::new(Panel::default());
        for raw in ["resize(int,int)", "missing(Event)", "refresh("] {
            let err = AttachedSlot::attach(Rc::clone(&target), raw, &signal()).expect_err(raw);
            assert!(matches!(err, CenterError::SinkAttachRejected { .. }));
        }
    }
}
