//! Fixed transition tables for lead status and provisioning stage.

use super::{DomainError, ErrorCode};

/// A status enum whose legal moves are listed per variant.
///
/// Implementors only list successors; checking and terminal detection
/// follow from that table.
pub trait StateMachine: Copy + PartialEq + std::fmt::Debug + 'static {
    /// States reachable in one step from `self`.
    fn successors(&self) -> &'static [Self];

    fn can_transition_to(&self, target: &Self) -> bool {
        self.successors().contains(target)
    }

    /// Returns `target` when the move is legal.
    fn transition_to(&self, target: Self) -> Result<Self, DomainError> {
        if !self.can_transition_to(&target) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("illegal transition {:?} -> {:?}", self, target),
            ));
        }
        Ok(target)
    }

    fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Attempt {
        Scheduled,
        Running,
        Retrying,
        Finished,
    }

    impl StateMachine for Attempt {
        fn successors(&self) -> &'static [Self] {
            match self {
                Attempt::Scheduled => &[Attempt::Running],
                Attempt::Running => &[Attempt::Finished, Attempt::Retrying],
                Attempt::Retrying => &[Attempt::Running],
                Attempt::Finished => &[],
            }
        }
    }

    #[test]
    fn listed_successor_is_accepted() {
        assert_eq!(
            Attempt::Retrying.transition_to(Attempt::Running).unwrap(),
            Attempt::Running
        );
    }

    #[test]
    fn skipping_ahead_is_rejected_with_both_states_named() {
        let err = Attempt::Scheduled
            .transition_to(Attempt::Finished)
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert!(err.message().contains("Scheduled -> Finished"));
    }

    #[test]
    fn state_without_successors_is_terminal() {
        assert!(Attempt::Finished.is_terminal());
        assert!(!Attempt::Retrying.is_terminal());
    }
}
