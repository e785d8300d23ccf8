use std::collections::BTreeMap;

use crate::model::*;

/// Sole owner of `Resource` records. Events hold ids and resolve them here.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<ResourceId, Resource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `resource`. Returns false, leaving the existing record alone, on a duplicate id.
    pub fn add(&mut self, resource: Resource) -> bool {
        if self.resources.contains_key(&resource.id) {
            return false;
        }
        self.resources.insert(resource.id.clone(), resource);
        true
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.resources.contains_key(id)
    }

    pub fn remove(&mut self, id: &ResourceId) -> Option<Resource> {
        self.resources.remove(id)
    }

    pub fn list_by_category(&self, category: ResourceCategory) -> Vec<&Resource> {
        self.resources
            .values()
            .filter(|r| r.category == category)
            .collect()
    }

    /// Case-insensitive substring match on the display name.
    pub fn find_by_name(&self, needle: &str) -> Vec<&Resource> {
        let needle = needle.to_lowercase();
        self.resources
            .values()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    events: BTreeMap<EventId, Event>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `event`. Returns false, leaving the existing record alone, on a duplicate id.
    pub fn add(&mut self, event: Event) -> bool {
        if self.events.contains_key(&event.id) {
            return false;
        }
        self.events.insert(event.id.clone(), event);
        true
    }

    pub fn get(&self, id: &EventId) -> Option<&Event> {
        self.events.get(id)
    }

    pub fn get_mut(&mut self, id: &EventId) -> Option<&mut Event> {
        self.events.get_mut(id)
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.events.contains_key(id)
    }

    pub fn remove(&mut self, id: &EventId) -> Option<Event> {
        self.events.remove(id)
    }

    pub fn list_by_category(&self, category: EventCategory) -> Vec<&Event> {
        self.events
            .values()
            .filter(|e| e.category == category)
            .collect()
    }

    /// Events whose start or end falls inside `[start, end]`.
    pub fn list_by_time_range(&self, start: Ms, end: Ms) -> Vec<&Event> {
        let range = Span { start, end };
        self.events
            .values()
            .filter(|e| {
                range.contains_inclusive(e.span.start) || range.contains_inclusive(e.span.end)
            })
            .collect()
    }

    pub fn list_by_resource(&self, resource: &ResourceId) -> Vec<&Event> {
        self.events.values().filter(|e| e.uses(resource)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
