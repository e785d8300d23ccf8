use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{EventId, ResourceId, Span};

const CHANNEL_CAPACITY: usize = 256;

/// What changed on a resource's schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Scheduled { event_id: EventId, span: Span },
    Cancelled { event_id: EventId },
    Deleted { event_id: EventId },
}

impl Notification {
    pub fn event_id(&self) -> &EventId {
        match self {
            Notification::Scheduled { event_id, .. }
            | Notification::Cancelled { event_id }
            | Notification::Deleted { event_id } => event_id,
        }
    }
}

/// Broadcast hub, one channel per resource. Fed after every commit.
pub struct NotifyHub {
    channels: DashMap<ResourceId, broadcast::Sender<Notification>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a resource's changes. Creates the channel if needed.
    pub fn subscribe(&self, resource_id: &ResourceId) -> broadcast::Receiver<Notification> {
        let sender = self
            .channels
            .entry(resource_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// No-op if nobody is listening.
    pub fn send(&self, resource_id: &ResourceId, notification: &Notification) {
        if let Some(sender) = self.channels.get(resource_id) {
            let _ = sender.send(notification.clone());
        }
    }

    /// Drop a resource's channel; live receivers see the channel close.
    pub fn remove(&self, resource_id: &ResourceId) {
        self.channels.remove(resource_id);
    }
}
