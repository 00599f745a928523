use herald_center::{
    CallableParts, Event, EventId, Fields, ForeignRuntime, SinkError, SlotTarget,
};
use parking_lot::Mutex;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::rc::Rc;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

pub fn id(name: &str) -> EventId {
    EventId::new(name).expect("valid event name")
}

/// Shared log of sink invocations, in call order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    entries: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A native sink that logs `tag`.
    pub fn tagged(&self, tag: &str) -> impl Fn(&Event) + 'static {
        let entries = Rc::clone(&self.entries);
        let tag = tag.to_owned();
        move |_| entries.borrow_mut().push(tag.clone())
    }

    /// A native sink that logs the `order` field.
    pub fn orders(&self) -> impl Fn(&Event) + 'static {
        let entries = Rc::clone(&self.entries);
        move |event| {
            let order = event.get("order").map(ToString::to_string).unwrap_or_default();
            entries.borrow_mut().push(order);
        }
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }
}

/// A slot target with a fixed method table that logs into a [`Recorder`].
#[derive(Debug)]
pub struct Panel {
    pub recorder: Recorder,
}

impl SlotTarget for Panel {
    fn object_name(&self) -> &str {
        "Panel"
    }

    fn slots(&self) -> &[&str] {
        &["refresh()", "onEvent(const herald::Event &)", "resize(int, int)", "fail(Event)"]
    }

    fn invoke_slot(&self, index: usize, args: &[&Event]) -> Result<(), SinkError> {
        match index {
            0 => self.recorder.push("toolkit:refresh"),
            1 => self.recorder.push(format!("toolkit:onEvent:{}", args.first().map_or("", |e| e.name()))),
            3 => {
                return Err(SinkError::Toolkit { message: "slot refused".into(), context: None });
            },
            _ => unreachable!("resize is never attached to an event signal"),
        }
        Ok(())
    }
}

/// A reference-counted object in the fake runtime.
#[derive(Debug, Clone)]
pub enum FakeObject {
    /// A bound method; calls log `foreign:<name>`.
    Method(Rc<str>),
    /// A bound method whose call raises.
    Raiser,
    /// Not callable.
    Plain,
}

#[derive(Debug)]
pub struct FakeError(pub &'static str);

impl fmt::Display for FakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// An embedded runtime stand-in that tracks its global lock and error indicator.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    pub recorder: Recorder,
    pub acquisitions: Cell<usize>,
    pub locked: Cell<bool>,
    pub pending_error: Cell<bool>,
    pub clears: Cell<usize>,
    pub fail_conversion: Cell<bool>,
    /// Size of the mapping each call received.
    pub argument_sizes: RefCell<Vec<usize>>,
}

pub struct FakeGuard<'a> {
    runtime: &'a FakeRuntime,
}

impl Drop for FakeGuard<'_> {
    fn drop(&mut self) {
        self.runtime.locked.set(false);
    }
}

impl ForeignRuntime for FakeRuntime {
    type Object = FakeObject;
    type Callable = FakeObject;
    type Value = BTreeMap<String, String>;
    type Error = FakeError;
    type Guard<'a> = FakeGuard<'a>;

    fn acquire(&self) -> FakeGuard<'_> {
        assert!(!self.locked.get(), "global lock is not re-entrant");
        self.locked.set(true);
        self.acquisitions.set(self.acquisitions.get() + 1);
        FakeGuard { runtime: self }
    }

    fn split(&self, object: &FakeObject) -> Option<CallableParts<FakeObject>> {
        match object {
            FakeObject::Plain => None,
            callable => Some(CallableParts {
                method: callable.clone(),
                instance: callable.clone(),
                class: callable.clone(),
            }),
        }
    }

    fn build_callable(
        &self,
        _guard: &FakeGuard<'_>,
        parts: &CallableParts<FakeObject>,
    ) -> Result<FakeObject, FakeError> {
        Ok(parts.method.clone())
    }

    fn to_foreign_value(&self, _guard: &FakeGuard<'_>, fields: &Fields) -> Result<Self::Value, FakeError> {
        if self.fail_conversion.get() {
            self.pending_error.set(true);
            return Err(FakeError("unsupported value"));
        }
        Ok(fields.iter().map(|(k, v)| (k.clone(), v.to_string())).collect())
    }

    fn empty_mapping(&self, _guard: &FakeGuard<'_>) -> Self::Value {
        BTreeMap::new()
    }

    fn call(
        &self,
        _guard: &FakeGuard<'_>,
        callable: &FakeObject,
        argument: Self::Value,
    ) -> Result<(), FakeError> {
        assert!(self.locked.get(), "calls must run under the global lock");
        self.argument_sizes.borrow_mut().push(argument.len());
        match callable {
            FakeObject::Method(name) => {
                self.recorder.push(format!("foreign:{name}"));
                Ok(())
            },
            FakeObject::Raiser => {
                self.pending_error.set(true);
                Err(FakeError("ValueError: raised in callback"))
            },
            FakeObject::Plain => unreachable!("plain objects never attach"),
        }
    }

    fn clear_error(&self, _guard: &FakeGuard<'_>) {
        self.pending_error.set(false);
        self.clears.set(self.clears.get() + 1);
    }
}

/// In-memory sink for formatted log lines.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Number of captured lines containing `needle`.
    pub fn lines_with(&self, needle: &str) -> usize {
        self.contents().lines().filter(|line| line.contains(needle)).count()
    }

    /// Runs `f` with a subscriber that writes into this buffer.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt().with_writer(self.clone()).with_ansi(false).finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
