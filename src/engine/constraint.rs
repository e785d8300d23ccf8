use serde::{Deserialize, Serialize};

use crate::model::*;

use super::ScheduleError;

/// A cross-resource policy rule. Stateless predicate over one event's allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    /// If `principal` is allocated, `dependent` must be too.
    CoRequisite {
        principal: ResourceId,
        dependent: ResourceId,
    },
    /// `a` and `b` must not both be allocated.
    MutualExclusion { a: ResourceId, b: ResourceId },
    /// At most `max` allocation members of `category`, counting repetitions.
    CapacityLimit { category: ResourceCategory, max: u32 },
}

impl Constraint {
    pub fn co_requisite(
        principal: impl Into<ResourceId>,
        dependent: impl Into<ResourceId>,
    ) -> Result<Self, ScheduleError> {
        let c = Constraint::CoRequisite {
            principal: principal.into(),
            dependent: dependent.into(),
        };
        c.check()?;
        Ok(c)
    }

    pub fn mutual_exclusion(
        a: impl Into<ResourceId>,
        b: impl Into<ResourceId>,
    ) -> Result<Self, ScheduleError> {
        let c = Constraint::MutualExclusion {
            a: a.into(),
            b: b.into(),
        };
        c.check()?;
        Ok(c)
    }

    pub fn capacity_limit(category: ResourceCategory, max: u32) -> Result<Self, ScheduleError> {
        let c = Constraint::CapacityLimit { category, max };
        c.check()?;
        Ok(c)
    }

    /// Parameter sanity, also applied to constraints read back from a snapshot.
    pub fn check(&self) -> Result<(), ScheduleError> {
        match self {
            Constraint::CoRequisite {
                principal,
                dependent,
            } if principal == dependent => Err(ScheduleError::Validation(format!(
                "resource {principal} cannot be a co-requisite of itself"
            ))),
            Constraint::MutualExclusion { a, b } if a == b => Err(ScheduleError::Validation(
                format!("resource {a} cannot exclude itself"),
            )),
            Constraint::CapacityLimit { max: 0, category } => Err(ScheduleError::Validation(
                format!("capacity limit for category '{category}' must be at least 1"),
            )),
            _ => Ok(()),
        }
    }

    pub fn is_satisfied(&self, allocation: &[&Resource], _event: &Event) -> bool {
        let has = |id: &ResourceId| allocation.iter().any(|r| &r.id == id);
        match self {
            Constraint::CoRequisite {
                principal,
                dependent,
            } => !has(principal) || has(dependent),
            Constraint::MutualExclusion { a, b } => !(has(a) && has(b)),
            Constraint::CapacityLimit { category, max } => {
                let count = allocation.iter().filter(|r| r.category == *category).count();
                count as u32 <= *max
            }
        }
    }

    /// Depends only on this constraint's parameters.
    pub fn error_message(&self) -> String {
        match self {
            Constraint::CoRequisite {
                principal,
                dependent,
            } => format!("using resource {principal} requires resource {dependent} as well"),
            Constraint::MutualExclusion { a, b } => {
                format!("resources {a} and {b} cannot be used together")
            }
            Constraint::CapacityLimit { category, max } => {
                format!("at most {max} resources of category '{category}' allowed per event")
            }
        }
    }
}

/// Evaluate every constraint and collect all violation messages, in constraint order.
pub fn validate(
    allocation: &[&Resource],
    event: &Event,
    constraints: &[Constraint],
) -> Result<(), Vec<String>> {
    let violations: Vec<String> = constraints
        .iter()
        .filter(|c| !c.is_satisfied(allocation, event))
        .map(Constraint::error_message)
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str, category: ResourceCategory) -> Resource {
        Resource::new(Some(id.into()), id, category, 4).unwrap()
    }

    fn event() -> Event {
        Event {
            id: "e".into(),
            name: "e".into(),
            span: Span::new(0, HOUR_MS),
            category: EventCategory::Research,
            priority: 3,
            description: String::new(),
            allocation: Vec::new(),
            cancelled_at: None,
        }
    }

    #[test]
    fn co_requisite() {
        let gpu = resource("gpu", ResourceCategory::Computational);
        let sci = resource("scientist", ResourceCategory::Human);
        let c = Constraint::co_requisite("gpu", "scientist").unwrap();
        assert!(!c.is_satisfied(&[&gpu], &event()));
        assert!(c.is_satisfied(&[&gpu, &sci], &event()));
        assert!(c.is_satisfied(&[&sci], &event()));
        assert!(c.is_satisfied(&[], &event()));

        let msg = c.error_message();
        assert!(msg.contains("gpu") && msg.contains("scientist"));
    }

    #[test]
    fn mutual_exclusion() {
        let a = resource("lab", ResourceCategory::Space);
        let b = resource("cloud", ResourceCategory::Computational);
        let c = Constraint::mutual_exclusion("lab", "cloud").unwrap();
        assert!(c.is_satisfied(&[&a], &event()));
        assert!(c.is_satisfied(&[&b], &event()));
        assert!(!c.is_satisfied(&[&a, &b], &event()));
    }

    #[test]
    fn capacity_limit_counts_repetitions() {
        let alice = resource("alice", ResourceCategory::Human);
        let gpu = resource("gpu", ResourceCategory::Computational);
        let c = Constraint::capacity_limit(ResourceCategory::Human, 2).unwrap();
        assert!(c.is_satisfied(&[&alice, &alice, &gpu, &gpu, &gpu], &event()));
        assert!(!c.is_satisfied(&[&alice, &alice, &alice], &event()));
    }

    #[test]
    fn constructors_reject_degenerate_parameters() {
        assert!(Constraint::co_requisite("gpu", "gpu").is_err());
        assert!(Constraint::mutual_exclusion("gpu", "gpu").is_err());
        assert!(Constraint::capacity_limit(ResourceCategory::Space, 0).is_err());
    }

    #[test]
    fn validate_reports_every_violation_in_order() {
        let gpu = resource("gpu", ResourceCategory::Computational);
        let cloud = resource("cloud", ResourceCategory::Computational);
        let constraints = vec![
            Constraint::co_requisite("gpu", "scientist").unwrap(),
            Constraint::capacity_limit(ResourceCategory::Human, 4).unwrap(),
            Constraint::mutual_exclusion("gpu", "cloud").unwrap(),
            Constraint::capacity_limit(ResourceCategory::Computational, 1).unwrap(),
        ];
        let errors = validate(&[&gpu, &cloud], &event(), &constraints).unwrap_err();
        assert_eq!(
            errors,
            vec![
                constraints[0].error_message(),
                constraints[2].error_message(),
                constraints[3].error_message(),
            ]
        );
    }

    #[test]
    fn validate_ok_with_no_constraints() {
        let gpu = resource("gpu", ResourceCategory::Computational);
        assert!(validate(&[&gpu], &event(), &[]).is_ok());
    }

    #[test]
    fn messages_are_stable_per_configuration() {
        let a = Constraint::capacity_limit(ResourceCategory::Human, 4).unwrap();
        let b = Constraint::capacity_limit(ResourceCategory::Human, 4).unwrap();
        assert_eq!(a.error_message(), b.error_message());
    }
}
