use std::time::Instant;

use tracing::{debug, info};

use crate::limits::*;
use crate::model::*;
use crate::notify::Notification;
use crate::observability;

use super::conflict::{check_capacity, now_ms, validate_request};
use super::constraint::{Constraint, validate};
use super::slots::SlotFinder;
use super::{EventRequest, ScheduleError, Scheduled, Scheduler};

impl Scheduler {
    /// Validate, resolve, check and commit an event as one atomic step.
    pub async fn schedule_event(&self, req: EventRequest) -> Result<Scheduled, ScheduleError> {
        let result = self.schedule_locked(req).await;
        let outcome = match &result {
            Ok(Scheduled::Committed(_)) => "committed",
            Ok(Scheduled::Rescheduled { .. }) => "rescheduled",
            Err(e) => e.label(),
        };
        metrics::counter!(observability::SCHEDULE_REQUESTS_TOTAL, "outcome" => outcome)
            .increment(1);
        if let Err(e) = &result {
            debug!("schedule request rejected: {e}");
        }
        result
    }

    async fn schedule_locked(&self, req: EventRequest) -> Result<Scheduled, ScheduleError> {
        validate_request(&req, now_ms())?;

        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let mut allocation = Vec::new();
        for (id, quantity) in &req.resources {
            let resource = state
                .resources
                .get(id)
                .ok_or_else(|| ScheduleError::ResourceNotFound(id.clone()))?;
            if *quantity > resource.capacity {
                return Err(ScheduleError::Capacity {
                    resource_id: id.clone(),
                    requested: *quantity,
                    capacity: resource.capacity,
                });
            }
            allocation.extend(std::iter::repeat_n(id.clone(), *quantity as usize));
        }

        let caller_supplied_id = req.id.is_some();
        let candidate = Event {
            id: req.id.unwrap_or_else(EventId::generate),
            name: req.name,
            span: req.span,
            category: req.category,
            priority: req.priority,
            description: req.description,
            allocation,
            cancelled_at: None,
        };

        let resolved: Vec<&Resource> = candidate
            .allocation
            .iter()
            .filter_map(|id| state.resources.get(id))
            .collect();
        validate(&resolved, &candidate, &state.constraints).map_err(ScheduleError::Constraint)?;

        let placed = match check_capacity(&candidate, state.events.iter(), &state.resources) {
            Ok(()) => Scheduled::Committed(candidate),
            Err(violations) if req.auto_reschedule => {
                let requested = candidate.span;
                debug!(
                    "event {} conflicts on {} resource(s), searching for a free slot",
                    candidate.id,
                    violations.len()
                );
                let started = Instant::now();
                let found = SlotFinder::new(
                    &state.resources,
                    &state.events,
                    &state.constraints,
                    candidate.clone(),
                )
                .reschedule_near();
                metrics::histogram!(observability::SLOT_SEARCH_DURATION_SECONDS)
                    .record(started.elapsed().as_secs_f64());
                let Some(span) = found else {
                    return Err(ScheduleError::NoSlotAvailable { requested });
                };
                let mut event = candidate;
                event.span = span;
                Scheduled::Rescheduled { event, requested }
            }
            Err(violations) => return Err(ScheduleError::Conflict(violations)),
        };

        let event = placed.event().clone();
        if !state.events.add(event.clone()) {
            return Err(if caller_supplied_id {
                ScheduleError::DuplicateEvent(event.id)
            } else {
                ScheduleError::Internal(format!("generated event id {} already in use", event.id))
            });
        }
        self.bump(state);
        self.publish(
            &event,
            Notification::Scheduled {
                event_id: event.id.clone(),
                span: event.span,
            },
        );

        match &placed {
            Scheduled::Committed(e) => info!("scheduled event {} at {}", e.id, e.span),
            Scheduled::Rescheduled { event, requested } => {
                metrics::counter!(observability::RESCHEDULES_TOTAL).increment(1);
                info!(
                    "rescheduled event {} from {} to {}",
                    event.id, requested, event.span
                );
            }
        }
        Ok(placed)
    }

    /// Mark an event cancelled. Cancelled events stop counting toward capacity.
    /// Cancellation is terminal: a second cancel is rejected.
    pub async fn cancel_event(&self, id: &EventId) -> Result<Event, ScheduleError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let event = state
            .events
            .get_mut(id)
            .ok_or_else(|| ScheduleError::EventNotFound(id.clone()))?;
        if !event.cancel(now_ms()) {
            return Err(ScheduleError::Validation(format!(
                "event {id} is already cancelled"
            )));
        }
        let event = event.clone();
        self.bump(state);
        self.publish(
            &event,
            Notification::Cancelled {
                event_id: event.id.clone(),
            },
        );
        info!("cancelled event {id}");
        Ok(event)
    }

    pub async fn delete_event(&self, id: &EventId) -> Result<Event, ScheduleError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let event = state
            .events
            .remove(id)
            .ok_or_else(|| ScheduleError::EventNotFound(id.clone()))?;
        self.bump(state);
        self.publish(
            &event,
            Notification::Deleted {
                event_id: event.id.clone(),
            },
        );
        info!("deleted event {id}");
        Ok(event)
    }

    /// Delete every non-cancelled event that ended strictly before `cutoff`.
    /// Cancelled events are kept as a record. Returns the removed ids.
    pub async fn purge_ended_before(&self, cutoff: Ms) -> Vec<EventId> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let expired: Vec<EventId> = state
            .events
            .iter()
            .filter(|e| !e.is_cancelled() && e.span.end < cutoff)
            .map(|e| e.id.clone())
            .collect();
        if expired.is_empty() {
            return expired;
        }
        for id in &expired {
            if let Some(event) = state.events.remove(id) {
                self.publish(
                    &event,
                    Notification::Deleted {
                        event_id: event.id.clone(),
                    },
                );
            }
        }
        self.bump(state);
        metrics::counter!(observability::EVENTS_PURGED_TOTAL).increment(expired.len() as u64);
        info!("purged {} event(s) that ended before {cutoff}", expired.len());
        expired
    }

    /// Purge events that ended more than `retention` ago.
    pub async fn purge_completed(&self, retention: Ms) -> Vec<EventId> {
        self.purge_ended_before(now_ms().saturating_sub(retention)).await
    }

    // ── Administration ───────────────────────────────────────

    pub async fn add_resource(&self, resource: Resource) -> Result<(), ScheduleError> {
        resource.check().map_err(ScheduleError::Validation)?;
        if resource.name.len() > MAX_NAME_LEN {
            return Err(ScheduleError::Validation("resource name too long".into()));
        }
        let mut guard = self.state.write().await;
        let id = resource.id.clone();
        if !guard.resources.add(resource) {
            return Err(ScheduleError::DuplicateResource(id));
        }
        self.bump(&guard);
        info!("added resource {id}");
        Ok(())
    }

    /// Remove a resource no event refers to.
    pub async fn remove_resource(&self, id: &ResourceId) -> Result<Resource, ScheduleError> {
        let mut guard = self.state.write().await;
        if !guard.resources.contains(id) {
            return Err(ScheduleError::ResourceNotFound(id.clone()));
        }
        let users = guard.events.list_by_resource(id).len();
        if users > 0 {
            return Err(ScheduleError::Validation(format!(
                "resource {id} is still referenced by {users} event(s)"
            )));
        }
        let removed = guard
            .resources
            .remove(id)
            .ok_or_else(|| ScheduleError::ResourceNotFound(id.clone()))?;
        self.bump(&guard);
        self.notify.remove(id);
        info!("removed resource {id}");
        Ok(removed)
    }

    pub async fn add_constraint(&self, constraint: Constraint) -> Result<(), ScheduleError> {
        constraint.check()?;
        let mut guard = self.state.write().await;
        guard.constraints.push(constraint);
        self.bump(&guard);
        Ok(())
    }
}
