use std::time::Instant;

use tracing::debug;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::{check_year, now_ms};
use super::constraint::Constraint;
use super::slots::SlotFinder;
use super::{ScheduleError, Scheduler};

impl Scheduler {
    /// Every window of `duration` within `horizon_days` of `from`, stepped by
    /// the scan quantum, in which all of `resource_ids` (one unit each) can
    /// be used together without violating a constraint or a capacity.
    pub async fn find_available_slots(
        &self,
        resource_ids: &[ResourceId],
        duration: Ms,
        from: Ms,
        horizon_days: u32,
    ) -> Result<Vec<Span>, ScheduleError> {
        if duration <= 0 || duration > MAX_EVENT_DURATION_MS {
            return Err(ScheduleError::Validation(
                "duration must be positive and at most 7 days".into(),
            ));
        }
        if horizon_days == 0 || horizon_days > MAX_HORIZON_DAYS {
            return Err(ScheduleError::Validation(format!(
                "horizon must be between 1 and {MAX_HORIZON_DAYS} days"
            )));
        }
        if resource_ids.is_empty() {
            return Err(ScheduleError::Validation(
                "at least one resource is required".into(),
            ));
        }
        check_year("from", from, now_ms())?;

        let state = self.state.read().await;
        for id in resource_ids {
            if !state.resources.contains(id) {
                return Err(ScheduleError::ResourceNotFound(id.clone()));
            }
        }

        let template = Event {
            id: EventId::generate(),
            name: "slot search".into(),
            span: Span::new(from, from + duration),
            category: EventCategory::Training,
            priority: MIN_PRIORITY,
            description: String::new(),
            allocation: resource_ids.to_vec(),
            cancelled_at: None,
        };

        let started = Instant::now();
        let finder = SlotFinder::new(&state.resources, &state.events, &state.constraints, template);
        let slots: Vec<Span> = finder.open_slots(from, duration, horizon_days).collect();
        metrics::histogram!(observability::SLOT_SEARCH_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        debug!(
            "slot search over {} resource(s): {} window(s) in {horizon_days} day(s)",
            resource_ids.len(),
            slots.len()
        );
        Ok(slots)
    }

    /// Events touching `range` (start or end inside it, inclusive), by start.
    pub async fn list_events(&self, range: Span) -> Vec<Event> {
        let state = self.state.read().await;
        let mut events: Vec<Event> = state
            .events
            .list_by_time_range(range.start, range.end)
            .into_iter()
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.span.start, e.span.end));
        events
    }

    /// Non-cancelled events starting within the next `days` days.
    pub async fn upcoming_events(&self, days: u32) -> Vec<Event> {
        let now = now_ms();
        let until = now + days as Ms * DAY_MS;
        let state = self.state.read().await;
        let mut events: Vec<Event> = state
            .events
            .iter()
            .filter(|e| !e.is_cancelled() && e.span.start >= now && e.span.start <= until)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.span.start);
        events
    }

    /// Events using `resource_id` that start within the next `horizon_days`.
    pub async fn resource_agenda(
        &self,
        resource_id: &ResourceId,
        horizon_days: u32,
    ) -> Result<Vec<Event>, ScheduleError> {
        let now = now_ms();
        let until = now + horizon_days as Ms * DAY_MS;
        let state = self.state.read().await;
        if !state.resources.contains(resource_id) {
            return Err(ScheduleError::ResourceNotFound(resource_id.clone()));
        }
        let mut events: Vec<Event> = state
            .events
            .list_by_resource(resource_id)
            .into_iter()
            .filter(|e| e.span.start >= now && e.span.start <= until)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.span.start);
        Ok(events)
    }

    pub async fn get_event(&self, id: &EventId) -> Option<Event> {
        self.state.read().await.events.get(id).cloned()
    }

    pub async fn get_resource(&self, id: &ResourceId) -> Option<Resource> {
        self.state.read().await.resources.get(id).cloned()
    }

    pub async fn list_resources(&self) -> Vec<Resource> {
        self.state.read().await.resources.iter().cloned().collect()
    }

    pub async fn constraints(&self) -> Vec<Constraint> {
        self.state.read().await.constraints.clone()
    }
}
