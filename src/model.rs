use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds, UTC. The only time type.
pub type Ms = i64;

pub const MINUTE_MS: Ms = 60_000;
pub const HOUR_MS: Ms = 60 * MINUTE_MS;
pub const DAY_MS: Ms = 24 * HOUR_MS;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// `None` when the length does not fit in an `Ms`.
    pub fn checked_duration_ms(&self) -> Option<Ms> {
        self.end.checked_sub(self.start)
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Intersection with `other`, or `None` when it is empty.
    pub fn clip(&self, other: &Span) -> Option<Span> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Span { start, end })
    }

    /// Closed-range test used by listings: `start <= t <= end`.
    pub fn contains_inclusive(&self, t: Ms) -> bool {
        self.start <= t && t <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ── Identities ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("res_{}", Ulid::new().to_string().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("evt_{}", Ulid::new().to_string().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Categories ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Computational,
    Human,
    Space,
    Equipment,
}

impl ResourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Computational => "computational",
            ResourceCategory::Human => "human",
            ResourceCategory::Space => "space",
            ResourceCategory::Equipment => "equipment",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Training,
    Processing,
    Research,
    Meeting,
    Seminar,
    Inference,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Training => "training",
            EventCategory::Processing => "processing",
            EventCategory::Research => "research",
            EventCategory::Meeting => "meeting",
            EventCategory::Seminar => "seminar",
            EventCategory::Inference => "inference",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Resource ─────────────────────────────────────────────────────

/// A finite, typed resource. Owned exclusively by the resource registry;
/// events refer to it by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub category: ResourceCategory,
    /// Max concurrent units usable across all events at any instant.
    pub capacity: u32,
    /// Opaque metadata, never interpreted by the scheduler.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Resource {
    /// Build a resource, generating an id when none is given.
    /// Rejects an empty name or a zero capacity.
    pub fn new(
        id: Option<ResourceId>,
        name: impl Into<String>,
        category: ResourceCategory,
        capacity: u32,
    ) -> Result<Self, String> {
        let resource = Self {
            id: id.unwrap_or_else(ResourceId::generate),
            name: name.into(),
            category,
            capacity,
            attributes: BTreeMap::new(),
        };
        resource.check()?;
        Ok(resource)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Structural checks shared by construction and snapshot loading.
    pub fn check(&self) -> Result<(), String> {
        if self.id.as_str().is_empty() {
            return Err("resource id must not be empty".into());
        }
        if self.name.trim().is_empty() {
            return Err(format!("resource {} must have a name", self.id));
        }
        if self.capacity < 1 {
            return Err(format!("resource {} must have capacity of at least 1", self.id));
        }
        Ok(())
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.capacity > 1 {
            write!(f, "{} (x{}) [{}]", self.name, self.capacity, self.category)
        } else {
            write!(f, "{} [{}]", self.name, self.category)
        }
    }
}

// ── Event ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

/// A time-bounded use of resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub span: Span,
    pub category: EventCategory,
    /// 1 (lowest) to 5 (highest).
    pub priority: u8,
    #[serde(default)]
    pub description: String,
    /// Ordered multiset of resource ids; repetition encodes quantity.
    pub allocation: Vec<ResourceId>,
    /// Set once, when the event is cancelled. Cancellation is terminal.
    #[serde(default)]
    pub cancelled_at: Option<Ms>,
}

impl Event {
    pub fn status_at(&self, now: Ms) -> EventStatus {
        if self.cancelled_at.is_some() {
            EventStatus::Cancelled
        } else if now < self.span.start {
            EventStatus::Planned
        } else if now <= self.span.end {
            EventStatus::InProgress
        } else {
            EventStatus::Completed
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }

    /// Transition to `Cancelled`. Returns false if the event already was.
    pub fn cancel(&mut self, at: Ms) -> bool {
        if self.cancelled_at.is_some() {
            return false;
        }
        self.cancelled_at = Some(at);
        true
    }

    /// Units of `resource` this event demands.
    pub fn quantity_of(&self, resource: &ResourceId) -> u32 {
        self.allocation.iter().filter(|r| *r == resource).count() as u32
    }

    pub fn uses(&self, resource: &ResourceId) -> bool {
        self.allocation.contains(resource)
    }

    /// Distinct resource ids in order of first appearance.
    pub fn distinct_resources(&self) -> Vec<&ResourceId> {
        let mut seen: Vec<&ResourceId> = Vec::new();
        for id in &self.allocation {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }

    /// Overlap with `other` after widening this event by `margin` on both sides.
    pub fn overlaps_with_margin(&self, other: &Event, margin: Ms) -> bool {
        let widened = Span {
            start: self.span.start.saturating_sub(margin),
            end: self.span.end.saturating_add(margin),
        };
        widened.overlaps(&other.span)
    }

    pub fn duration_ms(&self) -> Ms {
        self.span.duration_ms()
    }

    pub fn check_window(&self) -> Result<(), String> {
        if self.span.start >= self.span.end {
            return Err(format!("event {} must start before it ends", self.id));
        }
        match self.span.checked_duration_ms() {
            Some(d) if d <= crate::limits::MAX_EVENT_DURATION_MS => {}
            _ => return Err(format!("event {} lasts longer than 7 days", self.id)),
        }
        Ok(())
    }
}
