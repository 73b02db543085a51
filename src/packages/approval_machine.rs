use crate::packages::models::ApprovalStatus;

/// Error types for approval transitions
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApprovalError {
    #[error("Package is already approved")]
    AlreadyApproved,

    #[error("Invalid approval transition from {from} to {to}")]
    InvalidTransition {
        from: ApprovalStatus,
        to: ApprovalStatus,
    },
}

/// Service for managing package approval transitions
pub struct ApprovalMachine;

impl ApprovalMachine {
    /// Check if an approval transition is valid
    ///
    /// # Valid Transitions
    /// - Pending -> Approved (admin action)
    ///
    /// Approved is terminal: there is no way back to Pending, and a repeated
    /// approval is a distinct error so the grant and aggregate add can never
    /// run twice. Rejecting a package is modeled as deletion, not a state.
    pub fn is_valid_transition(from: ApprovalStatus, to: ApprovalStatus) -> bool {
        matches!((from, to), (ApprovalStatus::Pending, ApprovalStatus::Approved))
    }

    /// Attempt to transition from one approval status to another
    ///
    /// # Returns
    /// `Ok(to)` for the single valid transition; `AlreadyApproved` when an
    /// approved package is approved again; `InvalidTransition` otherwise.
    pub fn transition(
        from: ApprovalStatus,
        to: ApprovalStatus,
    ) -> Result<ApprovalStatus, ApprovalError> {
        match (from, to) {
            (ApprovalStatus::Pending, ApprovalStatus::Approved) => Ok(ApprovalStatus::Approved),
            (ApprovalStatus::Approved, ApprovalStatus::Approved) => {
                Err(ApprovalError::AlreadyApproved)
            }
            (from, to) => Err(ApprovalError::InvalidTransition { from, to }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_to_approved() {
        assert!(ApprovalMachine::is_valid_transition(
            ApprovalStatus::Pending,
            ApprovalStatus::Approved
        ));
        assert_eq!(
            ApprovalMachine::transition(ApprovalStatus::Pending, ApprovalStatus::Approved),
            Ok(ApprovalStatus::Approved)
        );
    }

    #[test]
    fn test_double_approval_is_rejected() {
        assert!(!ApprovalMachine::is_valid_transition(
            ApprovalStatus::Approved,
            ApprovalStatus::Approved
        ));
        assert_eq!(
            ApprovalMachine::transition(ApprovalStatus::Approved, ApprovalStatus::Approved),
            Err(ApprovalError::AlreadyApproved)
        );
    }

    #[test]
    fn test_approved_to_pending_is_invalid() {
        assert!(!ApprovalMachine::is_valid_transition(
            ApprovalStatus::Approved,
            ApprovalStatus::Pending
        ));
        assert_eq!(
            ApprovalMachine::transition(ApprovalStatus::Approved, ApprovalStatus::Pending),
            Err(ApprovalError::InvalidTransition {
                from: ApprovalStatus::Approved,
                to: ApprovalStatus::Pending,
            })
        );
    }

    #[test]
    fn test_pending_to_pending_is_invalid() {
        assert!(!ApprovalMachine::is_valid_transition(
            ApprovalStatus::Pending,
            ApprovalStatus::Pending
        ));
        assert!(
            ApprovalMachine::transition(ApprovalStatus::Pending, ApprovalStatus::Pending).is_err()
        );
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn approval_status_strategy() -> impl Strategy<Value = ApprovalStatus> {
        prop_oneof![
            Just(ApprovalStatus::Pending),
            Just(ApprovalStatus::Approved),
        ]
    }

    /// The only valid transition is Pending -> Approved
    #[test]
    fn prop_single_valid_transition() {
        proptest!(|(
            from in approval_status_strategy(),
            to in approval_status_strategy()
        )| {
            let is_valid = ApprovalMachine::is_valid_transition(from, to);
            let expected =
                from == ApprovalStatus::Pending && to == ApprovalStatus::Approved;
            prop_assert_eq!(is_valid, expected);
        });
    }

    /// transition() and is_valid_transition() agree for every pair
    #[test]
    fn prop_transition_consistency() {
        proptest!(|(
            from in approval_status_strategy(),
            to in approval_status_strategy()
        )| {
            let result = ApprovalMachine::transition(from, to);
            if ApprovalMachine::is_valid_transition(from, to) {
                prop_assert_eq!(result, Ok(to));
            } else {
                prop_assert!(result.is_err());
            }
        });
    }
}
