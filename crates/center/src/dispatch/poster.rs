use super::Ingress;
use crate::event::{Event, PostMode, Priority};
use std::sync::Arc;
use tracing::{debug, warn};

/// A `Send + Sync` handle for posting into a center from any thread.
///
/// Posts are always queued: a `Now` post from a poster degrades to `Soon`, since another
/// thread cannot block on owner-thread delivery.
#[derive(Debug, Clone)]
pub struct Poster {
    ingress: Arc<Ingress>,
}

impl Poster {
    pub(crate) const fn new(ingress: Arc<Ingress>) -> Self {
        Self { ingress }
    }

    /// Queues `event` at normal priority. Returns `false` if the center is gone.
    pub fn post(&self, event: impl Into<Event>) -> bool {
        self.post_with(event, Priority::Normal, PostMode::Soon)
    }

    /// Queues `event` at `priority`. `PostMode::Now` is treated as `Soon`.
    pub fn post_with(&self, event: impl Into<Event>, priority: Priority, mode: PostMode) -> bool {
        let event = event.into();
        if mode == PostMode::Now {
            debug!(event = %event.name(), "Cross-thread post cannot be synchronous, queueing instead");
        }
        let name = event.id().clone();
        let accepted = self.ingress.push(event, priority);
        if !accepted {
            warn!(event = %name, "Notification center is shut down, dropping post");
        }
        accepted
    }

    /// Asks the owner loop to finish its current pass and return from `run`.
    pub fn quit(&self) {
        self.ingress.request_quit();
    }

    /// Whether the center has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.ingress.is_closed()
    }
}
