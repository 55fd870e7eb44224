//! Application status state machine.
//!
//! Two disjoint transition tables keyed by actor role, plus a terminal set.
//! Admin rejection is a cross-cutting override: it bypasses the table and is
//! allowed from any non-terminal state.

use placement_common::error::AppError;
use placement_common::types::{ApplicationStatus, Role};

use ApplicationStatus::*;

/// States with no outgoing transition.
pub const TERMINAL_STATES: [ApplicationStatus; 4] = [Placed, OfferDeclined, Withdrawn, Rejected];

/// Admin-initiated forward pipeline. Rejection is handled separately by
/// [`validate_reject`], so REJECTED appears here only for completeness of the
/// published flow.
const ADMIN_TRANSITIONS: [(ApplicationStatus, &[ApplicationStatus]); 6] = [
    (Applied, &[Selected, Rejected]),
    (Selected, &[InProcess, Rejected]),
    (InProcess, &[InterviewScheduled, Rejected]),
    (InterviewScheduled, &[Shortlisted, Rejected]),
    (Shortlisted, &[OfferReleased, Rejected]),
    (OfferReleased, &[Rejected]),
];

/// Student-initiated transitions: withdrawal and offer response.
const STUDENT_TRANSITIONS: [(ApplicationStatus, &[ApplicationStatus]); 2] = [
    (Applied, &[Withdrawn]),
    (OfferReleased, &[Placed, OfferDeclined]),
];

pub fn is_terminal(status: ApplicationStatus) -> bool {
    TERMINAL_STATES.contains(&status)
}

/// The transition table for a role, exposed for the status-flow endpoint.
pub fn transition_table(role: Role) -> &'static [(ApplicationStatus, &'static [ApplicationStatus])] {
    match role {
        Role::Admin => &ADMIN_TRANSITIONS,
        Role::Student => &STUDENT_TRANSITIONS,
    }
}

/// Targets reachable from `current` for the given role. Empty for terminal
/// states and states the role's table does not mention.
pub fn allowed_targets(role: Role, current: ApplicationStatus) -> &'static [ApplicationStatus] {
    if is_terminal(current) {
        return &[];
    }
    transition_table(role)
        .iter()
        .find(|(from, _)| *from == current)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

/// Validate a table-driven transition attempt.
///
/// Fails when `current` is terminal or `target` is not in the role's allowed
/// set for `current`. The error names the current status; callers must not
/// mutate state on failure.
pub fn validate_transition(
    role: Role,
    current: ApplicationStatus,
    target: ApplicationStatus,
) -> Result<(), AppError> {
    if allowed_targets(role, current).contains(&target) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition(format!(
            "Current status '{}' does not allow transition to '{}'",
            current, target
        )))
    }
}

/// Validate the admin reject override, allowed from any non-terminal state.
pub fn validate_reject(current: ApplicationStatus) -> Result<(), AppError> {
    if is_terminal(current) {
        Err(AppError::InvalidTransition(format!(
            "Cannot reject an application in terminal state '{}'",
            current
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [ApplicationStatus; 10] = [
        Applied,
        Selected,
        InProcess,
        InterviewScheduled,
        Shortlisted,
        OfferReleased,
        Placed,
        OfferDeclined,
        Withdrawn,
        Rejected,
    ];

    #[test]
    fn test_admin_transition_valid_iff_in_table() {
        for current in ALL_STATES {
            for target in ALL_STATES {
                let expected = !is_terminal(current)
                    && ADMIN_TRANSITIONS
                        .iter()
                        .any(|(from, targets)| *from == current && targets.contains(&target));
                let got = validate_transition(Role::Admin, current, target).is_ok();
                assert_eq!(got, expected, "{current} -> {target}");
            }
        }
    }

    #[test]
    fn test_student_transitions() {
        assert!(validate_transition(Role::Student, Applied, Withdrawn).is_ok());
        assert!(validate_transition(Role::Student, OfferReleased, Placed).is_ok());
        assert!(validate_transition(Role::Student, OfferReleased, OfferDeclined).is_ok());

        // Students cannot drive the admin pipeline.
        assert!(validate_transition(Role::Student, Applied, Selected).is_err());
        assert!(validate_transition(Role::Student, Shortlisted, OfferReleased).is_err());
    }

    #[test]
    fn test_terminal_states_allow_nothing() {
        for current in TERMINAL_STATES {
            for target in ALL_STATES {
                assert!(validate_transition(Role::Admin, current, target).is_err());
                assert!(validate_transition(Role::Student, current, target).is_err());
            }
        }
    }

    #[test]
    fn test_reject_allowed_from_any_non_terminal_state() {
        for current in ALL_STATES {
            assert_eq!(validate_reject(current).is_ok(), !is_terminal(current));
        }
    }

    #[test]
    fn test_withdrawn_is_terminal_for_second_withdraw() {
        assert!(validate_transition(Role::Student, Withdrawn, Withdrawn).is_err());
    }

    #[test]
    fn test_error_names_current_status() {
        let err = validate_transition(Role::Admin, Placed, Selected).unwrap_err();
        assert!(err.to_string().contains("PLACED"));
    }
}
