use crate::event::{Event, Priority};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// The only structure shared with other threads: a lock-protected queue of posted events.
///
/// Appends may come from any thread; draining happens on the owner thread only.
#[derive(Debug)]
pub(crate) struct Ingress {
    queue: Mutex<Queue>,
    wake: Notify,
    quit: AtomicBool,
}

#[derive(Debug)]
struct Queue {
    /// One FIFO per priority, highest first.
    bands: [VecDeque<Event>; 3],
    /// Posts held back until the next coalescing tick, in post order.
    pending: Vec<(Event, Priority)>,
    coalesce: bool,
    interval: Duration,
    last_flush: Instant,
    closed: bool,
}

impl Queue {
    fn flush(&mut self, now: Instant) -> usize {
        let count = self.pending.len();
        for (event, priority) in self.pending.drain(..) {
            self.bands[priority.band()].push_back(event);
        }
        self.last_flush = now;
        count
    }

    fn queued(&self) -> usize {
        self.bands.iter().map(VecDeque::len).sum()
    }
}

impl Ingress {
    pub(crate) fn new(coalesce: bool, interval: Duration) -> Self {
        Self {
            queue: Mutex::new(Queue {
                bands: Default::default(),
                pending: Vec::new(),
                coalesce,
                interval: interval.max(Duration::from_millis(1)),
                last_flush: Instant::now(),
                closed: false,
            }),
            wake: Notify::new(),
            quit: AtomicBool::new(false),
        }
    }

    /// Appends a post. Returns `false` once the owning center is gone.
    pub(crate) fn push(&self, event: Event, priority: Priority) -> bool {
        {
            let mut queue = self.queue.lock();
            if queue.closed {
                return false;
            }
            if queue.coalesce {
                queue.pending.push((event, priority));
            } else {
                queue.bands[priority.band()].push_back(event);
            }
        }
        self.wake.notify_one();
        true
    }

    /// Moves every coalesced post into the queue, preserving post order.
    pub(crate) fn flush_pending(&self) -> usize {
        self.queue.lock().flush(Instant::now())
    }

    /// Flushes coalesced posts if a full interval has passed since the last flush.
    pub(crate) fn flush_if_due(&self, now: Instant) -> usize {
        let mut queue = self.queue.lock();
        if queue.pending.is_empty() || now.saturating_duration_since(queue.last_flush) < queue.interval {
            return 0;
        }
        queue.flush(now)
    }

    /// Time left until coalesced posts are due, if any are waiting.
    pub(crate) fn until_next_tick(&self, now: Instant) -> Option<Duration> {
        let queue = self.queue.lock();
        if queue.pending.is_empty() {
            return None;
        }
        Some(queue.interval.saturating_sub(now.saturating_duration_since(queue.last_flush)))
    }

    /// Takes everything queued so far, highest priority first, FIFO within a priority.
    /// Later posts wait for the next call.
    pub(crate) fn take_batch(&self) -> Vec<Event> {
        let mut queue = self.queue.lock();
        let mut batch = Vec::with_capacity(queue.queued());
        for priority in Priority::DESCENDING {
            batch.extend(queue.bands[priority.band()].drain(..));
        }
        batch
    }

    pub(crate) fn set_interval(&self, interval: Duration) {
        self.queue.lock().interval = interval.max(Duration::from_millis(1));
    }

    pub(crate) fn interval(&self) -> Duration {
        self.queue.lock().interval
    }

    pub(crate) fn set_coalescing(&self, enabled: bool) {
        let mut queue = self.queue.lock();
        queue.coalesce = enabled;
        if !enabled {
            queue.flush(Instant::now());
        }
    }

    pub(crate) fn is_coalescing(&self) -> bool {
        self.queue.lock().coalesce
    }

    /// Queued plus coalesced posts.
    pub(crate) fn len(&self) -> usize {
        let queue = self.queue.lock();
        queue.queued() + queue.pending.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.queue.lock().closed
    }

    /// Rejects further posts and discards whatever is left. Returns the discarded count.
    pub(crate) fn close(&self) -> usize {
        let discarded = {
            let mut queue = self.queue.lock();
            queue.closed = true;
            let count = queue.queued() + queue.pending.len();
            queue.pending.clear();
            queue.bands.iter_mut().for_each(VecDeque::clear);
            count
        };
        self.request_quit();
        discarded
    }

    pub(crate) async fn wait(&self) {
        self.wake.notified().await;
    }

    pub(crate) fn request_quit(&self) {
        self.quit.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    pub(crate) fn take_quit(&self) -> bool {
        self.quit.swap(false, Ordering::AcqRel)
    }
}
