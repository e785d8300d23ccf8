use crate::limits::*;
use crate::model::*;

use super::conflict::check_capacity;
use super::constraint::{Constraint, validate};
use super::registry::{EventRegistry, ResourceRegistry};

// ── Slot search ───────────────────────────────────────────────────

/// Answers "is this window feasible for this allocation?" repeatedly over a
/// fixed snapshot of the registries.
///
/// Only non-cancelled events sharing at least one resource with the template
/// are kept; nothing else can contribute demand.
pub struct SlotFinder<'a> {
    resources: &'a ResourceRegistry,
    constraints: &'a [Constraint],
    relevant: Vec<&'a Event>,
    template: Event,
}

impl<'a> SlotFinder<'a> {
    pub fn new(
        resources: &'a ResourceRegistry,
        events: &'a EventRegistry,
        constraints: &'a [Constraint],
        template: Event,
    ) -> Self {
        let relevant = events
            .iter()
            .filter(|e| {
                e.id != template.id
                    && !e.is_cancelled()
                    && template.allocation.iter().any(|r| e.uses(r))
            })
            .collect();
        Self {
            resources,
            constraints,
            relevant,
            template,
        }
    }

    /// Feasible iff the Constraint Engine and the Conflict Detector both pass.
    pub fn is_feasible(&self, span: Span) -> bool {
        let mut candidate = self.template.clone();
        candidate.span = span;
        let allocation: Vec<&Resource> = candidate
            .allocation
            .iter()
            .filter_map(|id| self.resources.get(id))
            .collect();
        if allocation.len() != candidate.allocation.len() {
            return false;
        }
        validate(&allocation, &candidate, self.constraints).is_ok()
            && check_capacity(&candidate, self.relevant.iter().copied(), self.resources).is_ok()
    }

    /// First feasible window of the template's duration, scanning forward from
    /// its requested start in quantum steps, within the reschedule horizon.
    pub fn reschedule_near(&self) -> Option<Span> {
        let original = self.template.span;
        let limit = original.start.saturating_add(RESCHEDULE_HORIZON_MS);
        let mut t = original.start;
        while t < limit {
            let end = t.checked_add(original.duration_ms())?;
            let window = Span::new(t, end);
            if self.is_feasible(window) {
                return Some(window);
            }
            t = t.saturating_add(QUANTUM_MS);
        }
        None
    }

    /// Every feasible window of `duration` starting at `from`, stepping by the
    /// quantum, until a window would end past `from + horizon_days`.
    pub fn open_slots(&self, from: Ms, duration: Ms, horizon_days: u32) -> OpenSlots<'_, 'a> {
        OpenSlots {
            finder: self,
            cursor: from,
            duration,
            limit: from.saturating_add(horizon_days as Ms * DAY_MS),
        }
    }
}

/// Lazy, finite sequence of feasible windows. Cloning restarts from the
/// clone's position.
#[derive(Clone)]
pub struct OpenSlots<'f, 'a> {
    finder: &'f SlotFinder<'a>,
    cursor: Ms,
    duration: Ms,
    limit: Ms,
}

impl Iterator for OpenSlots<'_, '_> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        if self.duration <= 0 {
            return None;
        }
        while let Some(end) = self.cursor.checked_add(self.duration)
            && end <= self.limit
        {
            let window = Span::new(self.cursor, end);
            self.cursor = self.cursor.saturating_add(QUANTUM_MS);
            if self.finder.is_feasible(window) {
                return Some(window);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: Ms = HOUR_MS;
    const M: Ms = MINUTE_MS;

    fn resources(entries: &[(&str, ResourceCategory, u32)]) -> ResourceRegistry {
        let mut reg = ResourceRegistry::new();
        for (id, category, capacity) in entries {
            reg.add(Resource::new(Some((*id).into()), *id, *category, *capacity).unwrap());
        }
        reg
    }

    fn event(id: &str, start: Ms, end: Ms, allocation: &[&str]) -> Event {
        Event {
            id: id.into(),
            name: id.into(),
            span: Span::new(start, end),
            category: EventCategory::Meeting,
            priority: 2,
            description: String::new(),
            allocation: allocation.iter().map(|s| ResourceId::new(*s)).collect(),
            cancelled_at: None,
        }
    }

    fn booked(events: Vec<Event>) -> EventRegistry {
        let mut reg = EventRegistry::new();
        for e in events {
            reg.add(e);
        }
        reg
    }

    #[test]
    fn reschedule_finds_first_window_after_conflict() {
        let res = resources(&[("gpu", ResourceCategory::Computational, 1)]);
        let events = booked(vec![event("a", 10 * H, 12 * H, &["gpu"])]);
        let finder = SlotFinder::new(&res, &events, &[], event("b", 11 * H, 13 * H, &["gpu"]));
        assert!(!finder.is_feasible(Span::new(11 * H, 13 * H)));
        assert_eq!(finder.reschedule_near(), Some(Span::new(12 * H, 14 * H)));
    }

    #[test]
    fn reschedule_keeps_original_when_free() {
        let res = resources(&[("gpu", ResourceCategory::Computational, 1)]);
        let events = EventRegistry::new();
        let finder = SlotFinder::new(&res, &events, &[], event("b", 11 * H, 13 * H, &["gpu"]));
        assert_eq!(finder.reschedule_near(), Some(Span::new(11 * H, 13 * H)));
    }

    #[test]
    fn reschedule_gives_up_after_horizon() {
        let res = resources(&[("gpu", ResourceCategory::Computational, 1)]);
        // Occupied for the whole horizon (two back-to-back week-long blocks).
        let events = booked(vec![
            event("w1", 0, 7 * DAY_MS, &["gpu"]),
            event("w2", 7 * DAY_MS, 14 * DAY_MS, &["gpu"]),
        ]);
        let finder = SlotFinder::new(&res, &events, &[], event("b", H, 2 * H, &["gpu"]));
        assert_eq!(finder.reschedule_near(), None);
    }

    #[test]
    fn constraint_failure_makes_every_window_infeasible() {
        let res = resources(&[
            ("gpu", ResourceCategory::Computational, 1),
            ("scientist", ResourceCategory::Human, 1),
        ]);
        let events = EventRegistry::new();
        let constraints = vec![Constraint::co_requisite("gpu", "scientist").unwrap()];
        let finder = SlotFinder::new(&res, &events, &constraints, event("b", 0, H, &["gpu"]));
        assert!(!finder.is_feasible(Span::new(0, H)));
        assert_eq!(finder.open_slots(0, H, 1).count(), 0);
    }

    #[test]
    fn open_slots_skip_the_booked_block() {
        let nine = 9 * H;
        let res = resources(&[("room", ResourceCategory::Space, 1)]);
        let events = booked(vec![event("a", 10 * H, 12 * H, &["room"])]);
        let template = event("search", nine, nine + 2 * H, &["room"]);
        let finder = SlotFinder::new(&res, &events, &[], template);
        let slots: Vec<Span> = finder.open_slots(nine, 2 * H, 1).collect();

        assert_eq!(slots.first(), Some(&Span::new(12 * H, 14 * H)));
        assert_eq!(slots.last(), Some(&Span::new(nine + DAY_MS - 2 * H, nine + DAY_MS)));
        for s in &slots {
            assert_eq!(s.duration_ms(), 2 * H);
            assert_eq!((s.start - nine) % (10 * M), 0);
            assert!(!s.overlaps(&Span::new(10 * H, 12 * H)));
        }
        // 12:00 .. 07:00 next day inclusive, every 10 minutes.
        assert_eq!(slots.len(), (19 * 6 + 1) as usize);
    }

    #[test]
    fn open_slots_stop_at_the_end_of_time() {
        let top = Ms::MAX - 2 * H;
        let res = resources(&[("room", ResourceCategory::Space, 1)]);
        let events = booked(vec![event("a", top, top + H, &["room"])]);
        let finder = SlotFinder::new(&res, &events, &[], event("search", top, top + H, &["room"]));

        let slots: Vec<Span> = finder.open_slots(top, H, MAX_HORIZON_DAYS).collect();
        assert!(!slots.is_empty());
        assert!(slots.iter().all(|s| s.start >= top + H && s.end <= Ms::MAX));
        assert!(finder.reschedule_near().is_some());
    }

    #[test]
    fn open_slots_are_restartable() {
        let res = resources(&[("room", ResourceCategory::Space, 1)]);
        let events = booked(vec![event("a", 2 * H, 3 * H, &["room"])]);
        let finder = SlotFinder::new(&res, &events, &[], event("search", 0, H, &["room"]));
        let slots = finder.open_slots(0, H, 1);
        let first: Vec<Span> = slots.clone().collect();
        let second: Vec<Span> = slots.collect();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn open_slots_respect_capacity_greater_than_one() {
        let res = resources(&[("pool", ResourceCategory::Computational, 2)]);
        let events = booked(vec![event("a", 0, 4 * H, &["pool"])]);
        let finder = SlotFinder::new(&res, &events, &[], event("search", 0, H, &["pool"]));
        let slots: Vec<Span> = finder.open_slots(0, H, 1).collect();
        assert_eq!(slots.first(), Some(&Span::new(0, H)));

        let finder = SlotFinder::new(&res, &events, &[], event("search", 0, H, &["pool", "pool"]));
        let slots: Vec<Span> = finder.open_slots(0, H, 1).collect();
        assert_eq!(slots.first(), Some(&Span::new(4 * H, 5 * H)));
    }

    #[test]
    fn open_slots_never_return_infeasible_windows() {
        let res = resources(&[
            ("gpu", ResourceCategory::Computational, 1),
            ("room", ResourceCategory::Space, 1),
        ]);
        let events = booked(vec![
            event("a", H, 3 * H, &["gpu"]),
            event("b", 5 * H, 6 * H, &["room"]),
        ]);
        let template = event("search", 0, H, &["gpu", "room"]);
        let finder = SlotFinder::new(&res, &events, &[], template.clone());
        for window in finder.open_slots(0, H, 1) {
            let mut candidate = template.clone();
            candidate.span = window;
            assert!(check_capacity(&candidate, events.iter(), &res).is_ok());
        }
    }
}
