use crate::connection::{Connection, ConnectionId, ConnectionState, ConnectionTable};
use crate::deferred::DeferredIndex;
use crate::dispatch::{DispatchRecord, Ingress, Poster};
use crate::error::Result;
use crate::event::{Event, KEY_ID, KEY_TYPE, PostMode, Priority};
use crate::identity::{EventId, OrdinalAllocator, SequentialOrdinals, WellKnownEvents};
use crate::registry::EventRegistry;
use crate::sink::{Signature, Sink, SinkKind, SlotTarget};
use fxhash::FxHashMap;
use herald_config::CenterConfig;
use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::fmt::Write as _;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// The notification center.
///
/// Lives on its owner thread (it is neither `Send` nor `Sync`); every table mutation happens
/// there. Other threads post through a [`Poster`], and the owner drains their posts with
/// [`NotificationCenter::process_events`] or [`NotificationCenter::run`].
///
/// All operations take `&self`, so sinks may connect, disconnect or post while being
/// delivered to.
pub struct NotificationCenter {
    tables: RefCell<Tables>,
    ingress: Arc<Ingress>,
    /// Events taken from the ingress but not yet delivered. A nested drain continues from here.
    backlog: RefCell<VecDeque<Event>>,
    well_known: WellKnownEvents,
    ordinals: Box<dyn OrdinalAllocator>,
    verbose: bool,
}

#[derive(Debug, Default)]
struct Tables {
    registry: EventRegistry,
    connections: ConnectionTable,
    deferred: DeferredIndex,
    dispatch: FxHashMap<u32, DispatchRecord>,
}

impl Tables {
    /// Removes a connection from the table and from whichever index holds it.
    fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(id)?;
        let fingerprint = connection.event.fingerprint();
        match connection.state {
            ConnectionState::Deferred => {
                self.deferred.remove(fingerprint, id);
            },
            ConnectionState::Active => {
                if let Some(record) = self.dispatch.get_mut(&fingerprint) {
                    record.detach(id, connection.kind());
                }
            },
        }
        Some(connection)
    }

    /// Moves every connection waiting on `id` into its dispatch record, in connect order.
    fn promote(&mut self, id: &EventId) -> Vec<(ConnectionId, SinkKind)> {
        let waiting = self.deferred.take(id.fingerprint());
        if waiting.is_empty() {
            return Vec::new();
        }

        let record = self.dispatch.entry(id.fingerprint()).or_default();
        let mut promoted = Vec::with_capacity(waiting.len());
        for connection_id in waiting {
            if !self.connections.activate(connection_id) {
                continue;
            }
            if let Some(connection) = self.connections.get(connection_id) {
                record.attach(connection_id, &connection.sink, || Signature::signal(id));
                promoted.push((connection_id, connection.kind()));
            }
        }
        promoted
    }
}

impl NotificationCenter {
    /// A center with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&CenterConfig::default())
    }

    #[must_use]
    pub fn with_config(config: &CenterConfig) -> Self {
        Self::with_allocator(config, Box::new(SequentialOrdinals))
    }

    /// A center that takes its ordinals from `ordinals`.
    ///
    /// The well-known identities are registered here, so three `EventRegistered` posts are
    /// queued before the center is returned.
    #[must_use]
    pub fn with_allocator(config: &CenterConfig, ordinals: Box<dyn OrdinalAllocator>) -> Self {
        let center = Self {
            tables: RefCell::new(Tables::default()),
            backlog: RefCell::new(VecDeque::new()),
            ingress: Arc::new(Ingress::new(config.coalesce, config.coalesce_interval())),
            well_known: WellKnownEvents::new(),
            ordinals,
            verbose: config.debug_flag_present(),
        };

        for id in center.well_known.iter() {
            center.register(id);
        }

        info!(
            verbose = center.verbose,
            coalesce = config.coalesce,
            interval_ms = center.coalesce_interval(),
            "Notification center created"
        );
        center
    }

    /// Registers `name`. Returns `false` for an invalid name or one already registered.
    pub fn register_event(&self, name: &str) -> bool {
        match EventId::new(name) {
            Ok(id) => self.register(&id),
            Err(err) => {
                warn!(error = %err, "Refusing to register event");
                false
            },
        }
    }

    /// Registers `id`, promotes connections waiting on it and posts `EventRegistered`.
    ///
    /// Returns `false` without any state change if the identity is already registered.
    pub fn register(&self, id: &EventId) -> bool {
        let promoted = {
            let mut tables = self.tables.borrow_mut();
            if tables.registry.contains(id.fingerprint()) {
                drop(tables);
                activity!(self.verbose, event = %id, "Event already registered");
                return false;
            }

            let ordinal = self.ordinals.allocate(id.name());
            tables.registry.insert(id.clone().with_ordinal(ordinal));
            activity!(self.verbose, event = %id, %ordinal, "Event registered");
            tables.promote(id)
        };

        for (connection, kind) in promoted {
            activity!(self.verbose, event = %id, %connection, %kind, "Deferred connection activated");
            self.notify_connection(&self.well_known.connected, id, kind);
        }

        self.post(Event::new(self.well_known.registered.clone()).with(KEY_ID, id.name()));
        true
    }

    /// Names of every registered identity.
    #[must_use]
    pub fn registered_events(&self) -> BTreeSet<String> {
        self.tables.borrow().registry.names()
    }

    /// The registered copy of `id`, carrying its ordinal.
    #[must_use]
    pub fn resolve(&self, id: &EventId) -> Option<EventId> {
        self.tables.borrow().registry.get(id.fingerprint()).cloned()
    }

    #[must_use]
    pub const fn well_known(&self) -> &WellKnownEvents {
        &self.well_known
    }

    /// Connects `sink` to `id`.
    ///
    /// The connection is active at once if `id` is registered, and deferred until it is
    /// otherwise. `EventConnected` is posted when the connection becomes active.
    ///
    /// # Errors
    /// Returns [`crate::CenterError::SinkAttachRejected`] when a slot signature is malformed,
    /// incompatible with the identity's signal or missing on the target, or when a foreign
    /// object is not callable. No connection or handle is created in that case.
    /// Returns [`crate::CenterError::Internal`] once connection handles are exhausted.
    pub fn connect(&self, id: &EventId, sink: Sink) -> Result<ConnectionId> {
        let kind = sink.kind();
        let attached = sink.attach(&Signature::signal(id)).inspect_err(|err| {
            warn!(event = %id, %kind, error = %err, "Connect rejected");
        })?;

        let (connection, state) = {
            let mut tables = self.tables.borrow_mut();
            let tables = &mut *tables;
            let state = if tables.registry.contains(id.fingerprint()) {
                ConnectionState::Active
            } else {
                ConnectionState::Deferred
            };

            let connection = tables
                .connections
                .insert(Connection { event: id.clone(), sink: attached.clone(), state })
                .inspect_err(|err| warn!(event = %id, %kind, error = %err, "Connect failed"))?;

            match state {
                ConnectionState::Active => tables
                    .dispatch
                    .entry(id.fingerprint())
                    .or_default()
                    .attach(connection, &attached, || Signature::signal(id)),
                ConnectionState::Deferred => tables.deferred.push(id.fingerprint(), connection),
            }
            (connection, state)
        };

        activity!(self.verbose, event = %id, %connection, %kind, %state, "Connected");
        if state == ConnectionState::Active {
            self.notify_connection(&self.well_known.connected, id, kind);
        }
        Ok(connection)
    }

    /// Connects a native closure.
    ///
    /// # Errors
    /// Native sinks are never rejected; the `Result` mirrors [`Self::connect`].
    pub fn connect_fn<F>(&self, id: &EventId, f: F) -> Result<ConnectionId>
    where
        F: Fn(&Event) + 'static,
    {
        self.connect(id, Sink::native(f))
    }

    /// Connects the slot named by `slot` on `target`.
    ///
    /// # Errors
    /// See [`Self::connect`].
    pub fn connect_slot(&self, id: &EventId, target: Rc<dyn SlotTarget>, slot: &str) -> Result<ConnectionId> {
        self.connect(id, Sink::slot(target, slot.to_owned()))
    }

    /// Removes a connection and posts `EventDisconnected`.
    ///
    /// An unknown or already removed handle is ignored with a warning; returns whether
    /// anything was removed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.tables.borrow_mut().remove_connection(id);
        let Some(connection) = removed else {
            warn!(connection = %id, "Disconnect of unknown connection ignored");
            return false;
        };

        let kind = connection.kind();
        activity!(self.verbose, event = %connection.event, connection = %id, %kind, "Disconnected");
        self.notify_connection(&self.well_known.disconnected, &connection.event, kind);
        true
    }

    /// Disconnects every handle in `ids` and clears the list.
    pub fn disconnect_all(&self, ids: &mut Vec<ConnectionId>) {
        for id in ids.drain(..) {
            self.disconnect(id);
        }
    }

    /// Whether `id` names a live connection.
    #[must_use]
    pub fn is_valid(&self, id: ConnectionId) -> bool {
        self.tables.borrow().connections.get(id).is_some()
    }

    #[must_use]
    pub fn is_deferred(&self, id: ConnectionId) -> bool {
        self.tables.borrow().connections.state(id) == Some(ConnectionState::Deferred)
    }

    #[must_use]
    pub fn is_active(&self, id: ConnectionId) -> bool {
        self.tables.borrow().connections.state(id) == Some(ConnectionState::Active)
    }

    /// Queues `event` at normal priority.
    pub fn post(&self, event: impl Into<Event>) {
        self.post_with(event, Priority::Normal, PostMode::Soon);
    }

    /// Posts `event`.
    ///
    /// `Soon` queues it for the owner loop. `Now` flushes coalesced posts, delivers everything
    /// already queued, then delivers `event` before returning; the priority is not used.
    /// Sink failures are logged, never returned.
    pub fn post_with(&self, event: impl Into<Event>, priority: Priority, mode: PostMode) {
        let event = event.into();
        match mode {
            PostMode::Soon => {
                activity!(self.verbose, event = %event.name(), %priority, "Event queued");
                if !self.ingress.push(event, priority) {
                    warn!("Ingress closed, dropping post");
                }
            },
            PostMode::Now => {
                self.ingress.flush_pending();
                self.drain();
                activity!(self.verbose, event = %event.name(), "Event sent now");
                self.deliver(&event);
            },
        }
    }

    /// Flushes coalesced posts whose tick is due and delivers everything queued.
    /// Returns the number of events delivered.
    pub fn process_events(&self) -> usize {
        self.ingress.flush_if_due(Instant::now());
        self.drain()
    }

    /// Drives delivery on the owner thread until [`Poster::quit`] is called.
    ///
    /// Wakes on every post and on the coalescing tick. Whatever is queued when the quit
    /// request arrives is delivered before returning.
    pub async fn run(&self) {
        activity!(self.verbose, "Owner loop started");
        loop {
            self.process_events();

            if self.ingress.take_quit() {
                self.ingress.flush_pending();
                self.drain();
                break;
            }

            match self.ingress.until_next_tick(Instant::now()) {
                Some(wait) => {
                    tokio::select! {
                        () = self.ingress.wait() => {},
                        () = tokio::time::sleep(wait) => {},
                    }
                },
                None => self.ingress.wait().await,
            }
        }
        activity!(self.verbose, "Owner loop stopped");
    }

    /// A cross-thread posting handle.
    #[must_use]
    pub fn poster(&self) -> Poster {
        Poster::new(Arc::clone(&self.ingress))
    }

    /// Sets the coalescing tick in milliseconds, clamped to at least 1.
    pub fn set_coalesce_interval(&self, millis: u64) {
        self.ingress.set_interval(Duration::from_millis(millis));
    }

    /// The coalescing tick in milliseconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn coalesce_interval(&self) -> u64 {
        self.ingress.interval().as_millis() as u64
    }

    /// Turns post coalescing on or off. Turning it off flushes held posts into the queue.
    pub fn set_coalescing(&self, enabled: bool) {
        self.ingress.set_coalescing(enabled);
    }

    #[must_use]
    pub fn is_coalescing(&self) -> bool {
        self.ingress.is_coalescing()
    }

    /// Posts waiting for delivery, coalesced ones included.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.ingress.len() + self.backlog.borrow().len()
    }

    /// Whether the diagnostic flag file was present at construction.
    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    #[must_use]
    pub fn registered_event_count(&self) -> usize {
        self.tables.borrow().registry.len()
    }

    /// Number of unregistered identities with connections waiting on them.
    #[must_use]
    pub fn deferred_event_count(&self) -> usize {
        self.tables.borrow().deferred.len()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.tables.borrow().connections.len()
    }

    /// Renders every registered identity with its connections, logs the report at `INFO` and
    /// returns it.
    pub fn dump_registered_events(&self) -> String {
        let tables = self.tables.borrow();
        let mut out = String::new();

        for id in tables.registry.sorted() {
            let _ = writeln!(out, "Registered event: {id}");
            if let Some(signal) = tables.dispatch.get(&id.fingerprint()).and_then(DispatchRecord::toolkit_signal) {
                let _ = writeln!(out, "     signal: {signal}");
            }
            let connections = tables.connections.for_event(id);
            if connections.is_empty() {
                let _ = writeln!(out, "     no connections");
            }
            for (connection_id, connection) in connections {
                let _ = writeln!(out, "     connection:");
                let _ = writeln!(out, "          type: {}", connection.kind());
                let _ = writeln!(out, "          id: {connection_id}");
            }
            out.push('\n');
        }

        let mut deferred: Vec<_> = tables
            .connections
            .ids()
            .into_iter()
            .filter_map(|id| tables.connections.get(id).map(|c| (id, c)))
            .filter(|(_, c)| c.state == ConnectionState::Deferred)
            .collect();
        deferred.sort_by(|(a, ca), (b, cb)| ca.event.name().cmp(cb.event.name()).then(a.cmp(b)));
        for (connection_id, connection) in deferred {
            let _ = writeln!(
                out,
                "Deferred connection: {} ({}, id {connection_id})",
                connection.event,
                connection.kind()
            );
        }

        info!("Registered events:\n{out}");
        out
    }

    /// Delivers the ingress snapshot one event at a time. A `Now` post from a sink drains
    /// re-entrantly, so whatever this call has not reached yet is delivered first.
    fn drain(&self) -> usize {
        self.backlog.borrow_mut().extend(self.ingress.take_batch());
        let mut delivered = 0;
        loop {
            let next = self.backlog.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            self.deliver(&event);
            delivered += 1;
        }
        delivered
    }

    fn deliver(&self, event: &Event) {
        let delivery =
            self.tables.borrow().dispatch.get(&event.id().fingerprint()).map(DispatchRecord::snapshot);
        let Some(delivery) = delivery else {
            activity!(self.verbose, event = %event.name(), "No sinks attached, event dropped");
            return;
        };

        activity!(self.verbose, event = %event.name(), sinks = delivery.len(), "Delivering event");
        for (connection, kind, err) in delivery.run(event, |id| self.is_active(id)) {
            match err {
                crate::SinkError::Panicked { .. } => {
                    error!(event = %event.name(), %connection, %kind, error = %err, "Sink panicked during delivery");
                },
                _ => warn!(event = %event.name(), %connection, %kind, error = %err, "Sink failed during delivery"),
            }
        }
    }

    fn notify_connection(&self, notice: &EventId, id: &EventId, kind: SinkKind) {
        self.post(Event::new(notice.clone()).with(KEY_ID, id.name()).with(KEY_TYPE, kind.as_str()));
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.borrow();
        f.debug_struct("NotificationCenter")
            .field("registered", &tables.registry.len())
            .field("connections", &tables.connections.len())
            .field("deferred", &tables.deferred.len())
            .field("pending", &self.pending_events())
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        let tables = self.tables.get_mut();
        let live = tables.connections.ids();
        if !live.is_empty() {
            warn!(count = live.len(), "Notification center shutting down with live connections");
        }
        for id in live {
            if let Some(connection) = tables.remove_connection(id) {
                warn!(
                    event = %connection.event,
                    connection = %id,
                    kind = %connection.kind(),
                    state = %connection.state,
                    "Forcing disconnect at shutdown"
                );
            }
        }

        let discarded = self.ingress.close() + self.backlog.get_mut().len();
        self.backlog.get_mut().clear();
        if discarded > 0 {
            warn!(discarded, "Discarding undelivered events at shutdown");
        }
    }
}
