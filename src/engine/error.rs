use crate::model::{EventId, ResourceId, Span};

use super::conflict::CapacityViolation;

#[derive(Debug)]
pub enum ScheduleError {
    /// Malformed request. Names the first violated rule.
    Validation(String),
    ResourceNotFound(ResourceId),
    EventNotFound(EventId),
    /// Requested quantity exceeds the resource's declared capacity.
    Capacity {
        resource_id: ResourceId,
        requested: u32,
        capacity: u32,
    },
    /// Every violated policy constraint, in constraint order.
    Constraint(Vec<String>),
    /// Capacity sweep found a collision and no rescheduling was requested.
    Conflict(Vec<CapacityViolation>),
    /// Automatic rescheduling exhausted its horizon.
    NoSlotAvailable { requested: Span },
    DuplicateEvent(EventId),
    DuplicateResource(ResourceId),
    Internal(String),
}

impl ScheduleError {
    /// Stable short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ScheduleError::Validation(_) => "validation",
            ScheduleError::ResourceNotFound(_) | ScheduleError::EventNotFound(_) => "not_found",
            ScheduleError::Capacity { .. } => "capacity",
            ScheduleError::Constraint(_) => "constraint",
            ScheduleError::Conflict(_) => "conflict",
            ScheduleError::NoSlotAvailable { .. } => "no_slot",
            ScheduleError::DuplicateEvent(_) | ScheduleError::DuplicateResource(_) => "duplicate",
            ScheduleError::Internal(_) => "internal",
        }
    }
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::Validation(msg) => write!(f, "invalid request: {msg}"),
            ScheduleError::ResourceNotFound(id) => write!(f, "resource not found: {id}"),
            ScheduleError::EventNotFound(id) => write!(f, "event not found: {id}"),
            ScheduleError::Capacity {
                resource_id,
                requested,
                capacity,
            } => write!(
                f,
                "requested {requested} units of {resource_id}, which has capacity {capacity}"
            ),
            ScheduleError::Constraint(messages) => {
                write!(f, "constraint violations: {}", messages.join("; "))
            }
            ScheduleError::Conflict(violations) => {
                write!(f, "scheduling conflict: ")?;
                for (i, v) in violations.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
            ScheduleError::NoSlotAvailable { requested } => write!(
                f,
                "no free slot within 7 days of requested window {requested}"
            ),
            ScheduleError::DuplicateEvent(id) => write!(f, "event already exists: {id}"),
            ScheduleError::DuplicateResource(id) => write!(f, "resource already exists: {id}"),
            ScheduleError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ScheduleError {}
