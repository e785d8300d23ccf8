use std::fmt;

use chrono::{DateTime, Datelike, Utc};

use crate::limits::*;
use crate::model::*;

use super::registry::ResourceRegistry;
use super::{EventRequest, ScheduleError};

pub(crate) fn now_ms() -> Ms {
    Utc::now().timestamp_millis()
}

fn year_of(ms: Ms) -> Option<i32> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.year())
}

/// Window checks for a scheduling request. Stops at the first failing rule.
pub(crate) fn validate_window(span: &Span, now: Ms) -> Result<(), ScheduleError> {
    if span.start >= span.end {
        return Err(ScheduleError::Validation("start must be before end".into()));
    }
    match span.checked_duration_ms() {
        Some(d) if d <= MAX_EVENT_DURATION_MS => {}
        _ => {
            return Err(ScheduleError::Validation(
                "events cannot last longer than 7 days".into(),
            ));
        }
    }
    if span.start < now - PAST_TOLERANCE_MS {
        return Err(ScheduleError::Validation(
            "start cannot be more than 5 minutes in the past".into(),
        ));
    }
    check_year("start", span.start, now)?;
    check_year("end", span.end, now)
}

/// `t` must fall in a year between `MIN_YEAR` and the current year plus
/// `MAX_YEARS_AHEAD`.
pub(crate) fn check_year(label: &str, t: Ms, now: Ms) -> Result<(), ScheduleError> {
    let max_year = year_of(now).unwrap_or(MIN_YEAR) + MAX_YEARS_AHEAD;
    match year_of(t) {
        Some(year) if (MIN_YEAR..=max_year).contains(&year) => Ok(()),
        Some(year) => Err(ScheduleError::Validation(format!(
            "{label} year {year} is not between {MIN_YEAR} and {max_year}"
        ))),
        None => Err(ScheduleError::Validation(format!(
            "{label} timestamp out of range"
        ))),
    }
}

/// Full shape validation of a request: window first, then the remaining fields.
pub(crate) fn validate_request(req: &EventRequest, now: Ms) -> Result<(), ScheduleError> {
    validate_window(&req.span, now)?;
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&req.priority) {
        return Err(ScheduleError::Validation(format!(
            "priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}"
        )));
    }
    if req.name.len() > MAX_NAME_LEN {
        return Err(ScheduleError::Validation("event name too long".into()));
    }
    if req.description.len() > MAX_DESCRIPTION_LEN {
        return Err(ScheduleError::Validation("event description too long".into()));
    }
    if req.resources.is_empty() {
        return Err(ScheduleError::Validation(
            "event must allocate at least one resource".into(),
        ));
    }
    let mut units: u32 = 0;
    for (id, quantity) in &req.resources {
        if *quantity == 0 {
            return Err(ScheduleError::Validation(format!(
                "quantity for resource {id} must be at least 1"
            )));
        }
        units = units.saturating_add(*quantity);
    }
    if units > MAX_ALLOCATION_UNITS {
        return Err(ScheduleError::Validation("too many resource units requested".into()));
    }
    if let Some(id) = &req.id
        && id.as_str().is_empty()
    {
        return Err(ScheduleError::Validation("event id must not be empty".into()));
    }
    Ok(())
}

// ── Capacity sweep ───────────────────────────────────────────────

/// Peak simultaneous demand on one resource exceeded its capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityViolation {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub peak: u32,
    pub capacity: u32,
}

impl fmt::Display for CapacityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capacity exceeded for '{}': {} required simultaneously, capacity {}",
            self.resource_name, self.peak, self.capacity
        )
    }
}

/// Sweep-line peak over signed `(time, delta)` points. Releases sort before
/// acquisitions at the same instant, since windows are half-open.
pub fn sweep_peak(mut deltas: Vec<(Ms, i64)>) -> u32 {
    deltas.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    let mut running: i64 = 0;
    let mut peak: i64 = 0;
    for (_, delta) in &deltas {
        running += delta;
        peak = peak.max(running);
    }
    peak as u32
}

/// Check `candidate` against every other non-cancelled event.
///
/// Events are selected with the 15-minute overlap margin, but their demand only
/// counts over the intersection of their raw window with the candidate's raw
/// window. Violations come back in order of first appearance in the allocation.
pub fn check_capacity<'a>(
    candidate: &Event,
    existing: impl IntoIterator<Item = &'a Event>,
    resources: &ResourceRegistry,
) -> Result<(), Vec<CapacityViolation>> {
    let neighbours: Vec<&Event> = existing
        .into_iter()
        .filter(|e| {
            e.id != candidate.id
                && !e.is_cancelled()
                && candidate.overlaps_with_margin(e, OVERLAP_MARGIN_MS)
        })
        .collect();

    let mut violations = Vec::new();
    for resource_id in candidate.distinct_resources() {
        let requested = candidate.quantity_of(resource_id);

        let mut deltas: Vec<(Ms, i64)> = Vec::with_capacity(2 * neighbours.len() + 2);
        for other in neighbours.iter().filter(|e| e.uses(resource_id)) {
            let Some(clipped) = other.span.clip(&candidate.span) else {
                continue;
            };
            let quantity = other.quantity_of(resource_id) as i64;
            deltas.push((clipped.start, quantity));
            deltas.push((clipped.end, -quantity));
        }
        deltas.push((candidate.span.start, requested as i64));
        deltas.push((candidate.span.end, -(requested as i64)));

        let peak = sweep_peak(deltas);
        let (name, capacity) = match resources.get(resource_id) {
            Some(r) => (r.name.clone(), r.capacity),
            None => (resource_id.to_string(), 0),
        };
        if peak > capacity {
            violations.push(CapacityViolation {
                resource_id: resource_id.clone(),
                resource_name: name,
                peak,
                capacity,
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Peak concurrent demand on `resource` across a whole set of events,
/// ignoring cancelled ones.
pub fn peak_demand<'a>(
    resource: &ResourceId,
    events: impl IntoIterator<Item = &'a Event>,
) -> u32 {
    let mut deltas = Vec::new();
    for e in events {
        if e.is_cancelled() {
            continue;
        }
        let quantity = e.quantity_of(resource) as i64;
        if quantity > 0 {
            deltas.push((e.span.start, quantity));
            deltas.push((e.span.end, -quantity));
        }
    }
    sweep_peak(deltas)
}
