mod conflict;
mod constraint;
mod error;
mod mutations;
mod queries;
mod registry;
mod slots;

pub use conflict::{CapacityViolation, check_capacity, peak_demand, sweep_peak};
pub use constraint::{Constraint, validate};
pub use error::ScheduleError;
pub use registry::{EventRegistry, ResourceRegistry};
pub use slots::{OpenSlots, SlotFinder};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, RwLockReadGuard};

use crate::model::*;
use crate::notify::{NotifyHub, Notification};

/// Everything the scheduler decides over. Passed in explicitly; there is no
/// global state.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub resources: ResourceRegistry,
    pub events: EventRegistry,
    pub constraints: Vec<Constraint>,
}

/// A request to place an event.
#[derive(Debug, Clone)]
pub struct EventRequest {
    /// Caller-supplied id; generated when absent.
    pub id: Option<EventId>,
    pub name: String,
    pub span: Span,
    pub category: EventCategory,
    pub priority: u8,
    pub description: String,
    /// `(resource, quantity)` pairs, expanded into the allocation in this order.
    pub resources: Vec<(ResourceId, u32)>,
    /// On a capacity conflict, move to the nearest free window instead of failing.
    pub auto_reschedule: bool,
}

impl EventRequest {
    pub fn new(name: impl Into<String>, span: Span, category: EventCategory) -> Self {
        Self {
            id: None,
            name: name.into(),
            span,
            category,
            priority: 1,
            description: String::new(),
            resources: Vec::new(),
            auto_reschedule: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<EventId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_resource(mut self, id: impl Into<ResourceId>, quantity: u32) -> Self {
        self.resources.push((id.into(), quantity));
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn auto_reschedule(mut self, enabled: bool) -> Self {
        self.auto_reschedule = enabled;
        self
    }
}

/// A committed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scheduled {
    /// Committed at the requested window.
    Committed(Event),
    /// Committed at `event.span` after the requested window conflicted.
    Rescheduled { event: Event, requested: Span },
}

impl Scheduled {
    pub fn event(&self) -> &Event {
        match self {
            Scheduled::Committed(event) | Scheduled::Rescheduled { event, .. } => event,
        }
    }

    pub fn into_event(self) -> Event {
        match self {
            Scheduled::Committed(event) | Scheduled::Rescheduled { event, .. } => event,
        }
    }

    pub fn is_rescheduled(&self) -> bool {
        matches!(self, Scheduled::Rescheduled { .. })
    }
}

/// Public entry point. Every mutation holds the write lock from resolution
/// through commit, so feasibility checks cannot race each other.
pub struct Scheduler {
    state: RwLock<Registries>,
    pub notify: Arc<NotifyHub>,
    /// Bumped on every committed mutation.
    generation: AtomicU64,
}

impl Scheduler {
    pub fn new(registries: Registries, notify: Arc<NotifyHub>) -> Self {
        metrics::gauge!(crate::observability::EVENTS_REGISTERED)
            .set(registries.events.len() as f64);
        Self {
            state: RwLock::new(registries),
            notify,
            generation: AtomicU64::new(0),
        }
    }

    /// Shared read access to the registries. Holding the guard blocks commits.
    pub async fn read(&self) -> RwLockReadGuard<'_, Registries> {
        self.state.read().await
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self, registries: &Registries) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        metrics::gauge!(crate::observability::EVENTS_REGISTERED)
            .set(registries.events.len() as f64);
    }

    /// Fan a notification out to every distinct resource the event uses.
    fn publish(&self, event: &Event, notification: Notification) {
        for resource_id in event.distinct_resources() {
            self.notify.send(resource_id, &notification);
        }
    }
}
