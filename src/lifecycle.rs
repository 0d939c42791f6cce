//! Lifecycle engine for organization records.
//!
//! ```text
//! DRAFT     -> IN_REVIEW
//! IN_REVIEW -> PUBLISHED, DRAFT
//! PUBLISHED -> ARCHIVED
//! ARCHIVED  -> (terminal)
//! ```
//!
//! The table above is what [`can_transition`] answers. Two operations are
//! wider than the table: [`submit_for_review`] also accepts
//! PUBLISHED and ARCHIVED records (re-evaluation), and [`archive`] accepts any
//! state (force archive, also used by deletion).
//!
//! Nothing here touches storage. Callers persist `Transition::to` together
//! with the updated_at bump.

use std::str::FromStr;

use crate::error::{RegistryError, Result};
use crate::models::{Organization, OrganizationStatus};
use crate::validation;

use crate::models::OrganizationStatus::{Archived, Draft, InReview, Published};

/// A decided status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrganizationStatus,
    pub to: OrganizationStatus,
}

impl Transition {
    fn new(from: OrganizationStatus, to: OrganizationStatus) -> Self {
        Self { from, to }
    }

    /// True when nothing needs to be written.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Outgoing edges of the static graph.
pub fn allowed_targets(from: OrganizationStatus) -> &'static [OrganizationStatus] {
    match from {
        Draft => &[InReview],
        InReview => &[Published, Draft],
        Published => &[Archived],
        Archived => &[],
    }
}

pub fn can_transition(from: OrganizationStatus, to: OrganizationStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Same lookup over wire names. Unknown names never transition.
pub fn can_transition_raw(from: &str, to: &str) -> bool {
    match (
        OrganizationStatus::from_str(from),
        OrganizationStatus::from_str(to),
    ) {
        (Ok(from), Ok(to)) => can_transition(from, to),
        _ => false,
    }
}

pub fn validate_transition(from: OrganizationStatus, to: OrganizationStatus) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(RegistryError::InvalidTransition { from, to })
    }
}

// ─── Operations ───────────────────────────────────────────────

pub fn submit_for_review(current: OrganizationStatus) -> Result<Transition> {
    match current {
        Draft | Published | Archived => Ok(Transition::new(current, InReview)),
        InReview => Err(RegistryError::InvalidTransition {
            from: current,
            to: InReview,
        }),
    }
}

/// Requires IN_REVIEW and a record that passes the publish checklist.
pub fn publish(current: OrganizationStatus, record: &Organization) -> Result<Transition> {
    if current != InReview {
        return Err(RegistryError::InvalidTransition {
            from: current,
            to: Published,
        });
    }
    validation::validate_for_publish(record)?;
    Ok(Transition::new(current, Published))
}

/// Always succeeds; a record that is already archived yields a no-op.
pub fn archive(current: OrganizationStatus) -> Transition {
    Transition::new(current, Archived)
}

pub fn reject(current: OrganizationStatus) -> Result<Transition> {
    if current != InReview {
        return Err(RegistryError::InvalidTransition {
            from: current,
            to: Draft,
        });
    }
    Ok(Transition::new(current, Draft))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    const GRAPH: &[(OrganizationStatus, OrganizationStatus)] = &[
        (Draft, InReview),
        (InReview, Published),
        (InReview, Draft),
        (Published, Archived),
    ];

    fn any_status() -> impl Strategy<Value = OrganizationStatus> {
        proptest::sample::select(OrganizationStatus::iter().collect::<Vec<_>>())
    }

    fn ready_record() -> Organization {
        Organization {
            id: "acme".into(),
            name: "Acme".into(),
            organization_type: "NGO".into(),
            sector_primary: "AgTech".into(),
            outcome_status: "Active".into(),
            country: "Chile".into(),
            region: "Biobío".into(),
            city: "Concepción".into(),
            description: Some("Soil sensors for smallholder farms".into()),
            website: Some("https://acme.example".into()),
            ..Default::default()
        }
    }

    proptest! {
        #[test]
        fn can_transition_matches_graph(from in any_status(), to in any_status()) {
            let in_graph = GRAPH.contains(&(from, to));
            prop_assert_eq!(can_transition(from, to), in_graph);
            prop_assert_eq!(validate_transition(from, to).is_ok(), in_graph);
            prop_assert_eq!(can_transition_raw(from.as_ref(), to.as_ref()), in_graph);
        }

        #[test]
        fn publish_requires_in_review(current in any_status()) {
            let result = publish(current, &ready_record());
            prop_assert_eq!(result.is_ok(), current == InReview);
        }
    }

    #[test]
    fn unknown_status_never_transitions() {
        assert!(!can_transition_raw("PENDING", "IN_REVIEW"));
        assert!(!can_transition_raw("DRAFT", "DELETED"));
        assert!(!can_transition_raw("draft", "in_review"));
    }

    #[test]
    fn archived_is_terminal_in_graph() {
        assert!(allowed_targets(Archived).is_empty());
    }

    #[test]
    fn submit_for_review_escape_hatch() {
        for from in [Draft, Published, Archived] {
            let t = submit_for_review(from).unwrap();
            assert_eq!(t.to, InReview);
        }
        // Not in the static table, reachable only through this operation.
        assert!(!can_transition(Published, InReview));
        assert!(!can_transition(Archived, InReview));

        match submit_for_review(InReview) {
            Err(RegistryError::InvalidTransition { from, to }) => {
                assert_eq!(from, InReview);
                assert_eq!(to, InReview);
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
    }

    #[test]
    fn publish_runs_checklist() {
        let mut record = ready_record();
        record.description = Some("too short".into());
        assert!(matches!(
            publish(InReview, &record),
            Err(RegistryError::ValidationFailed(_))
        ));
    }

    #[test]
    fn publish_rejects_wrong_state_before_checklist() {
        // An incomplete record in DRAFT reports the transition, not the checklist.
        let record = Organization::default();
        assert!(matches!(
            publish(Draft, &record),
            Err(RegistryError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn archive_is_idempotent() {
        let first = archive(Published);
        assert_eq!(first.to, Archived);
        assert!(!first.is_noop());

        let second = archive(first.to);
        assert_eq!(second.to, Archived);
        assert!(second.is_noop());

        for from in [Draft, InReview] {
            assert_eq!(archive(from).to, Archived);
        }
    }

    #[test]
    fn reject_only_from_in_review() {
        assert_eq!(reject(InReview).unwrap().to, Draft);
        for from in [Draft, Published, Archived] {
            assert!(matches!(
                reject(from),
                Err(RegistryError::InvalidTransition { to: Draft, .. })
            ));
        }
    }
}
