//! Attempt state table
//!
//! States only move forward along
//! `Created -> [AwaitingMethodChoice] -> AwaitingSigning -> Submitted ->
//! AwaitingConfirmation -> Settling -> Succeeded`. Every non-terminal state
//! may also end in `Cancelled` or `Failed`.

use crate::errors::FlowError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a transaction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    /// `start()` was called
    Created,
    /// Waiting for the user to pick WALLET or MANUAL
    AwaitingMethodChoice,
    /// Method resolved, signing requested
    AwaitingSigning,
    /// Provider accepted the transaction
    Submitted,
    /// Waiting for finality
    AwaitingConfirmation,
    /// Backend settlement in flight
    Settling,
    /// Settled
    Succeeded,
    /// Cancelled before any funds moved, or revoked by an identity switch
    Cancelled,
    /// Failed; see the attempt's failure
    Failed,
}

const FORWARD_TRANSITIONS: &[(AttemptState, AttemptState)] = &[
    (AttemptState::Created, AttemptState::AwaitingMethodChoice),
    (AttemptState::Created, AttemptState::AwaitingSigning),
    (AttemptState::AwaitingMethodChoice, AttemptState::AwaitingSigning),
    (AttemptState::AwaitingSigning, AttemptState::Submitted),
    (AttemptState::Submitted, AttemptState::AwaitingConfirmation),
    (AttemptState::AwaitingConfirmation, AttemptState::Settling),
    (AttemptState::Settling, AttemptState::Succeeded),
];

impl AttemptState {
    /// Every state, in table order
    pub const ALL: [AttemptState; 9] = [
        Self::Created,
        Self::AwaitingMethodChoice,
        Self::AwaitingSigning,
        Self::Submitted,
        Self::AwaitingConfirmation,
        Self::Settling,
        Self::Succeeded,
        Self::Cancelled,
        Self::Failed,
    ];

    /// Succeeded, Cancelled or Failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }

    /// States in which a user cancellation is honoured
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::AwaitingMethodChoice | Self::AwaitingSigning)
    }

    /// True once a transaction may have reached the provider
    pub fn is_past_submission(&self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::AwaitingConfirmation | Self::Settling | Self::Succeeded
        )
    }

    /// Whether `self -> to` is in the table
    pub fn can_transition(&self, to: AttemptState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if matches!(to, Self::Cancelled | Self::Failed) {
            return true;
        }
        FORWARD_TRANSITIONS.contains(&(*self, to))
    }

    /// `can_transition` as a `Result`
    pub fn validate_transition(&self, to: AttemptState) -> Result<(), FlowError> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition { from: *self, to })
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::AwaitingMethodChoice => "awaiting_method_choice",
            Self::AwaitingSigning => "awaiting_signing",
            Self::Submitted => "submitted",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Settling => "settling",
            Self::Succeeded => "succeeded",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_valid() {
        let path = [
            AttemptState::Created,
            AttemptState::AwaitingMethodChoice,
            AttemptState::AwaitingSigning,
            AttemptState::Submitted,
            AttemptState::AwaitingConfirmation,
            AttemptState::Settling,
            AttemptState::Succeeded,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].validate_transition(pair[1]).is_ok(), "{pair:?}");
        }
    }

    #[test]
    fn no_backwards_or_skipping() {
        assert!(!AttemptState::Submitted.can_transition(AttemptState::AwaitingSigning));
        assert!(!AttemptState::AwaitingSigning.can_transition(AttemptState::Settling));
        assert!(!AttemptState::Settling.can_transition(AttemptState::Settling));
        assert!(!AttemptState::Submitted.can_transition(AttemptState::AwaitingMethodChoice));
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [
            AttemptState::Succeeded,
            AttemptState::Cancelled,
            AttemptState::Failed,
        ] {
            assert!(terminal.is_terminal());
            for to in AttemptState::ALL {
                assert!(!terminal.can_transition(to));
            }
        }
    }

    #[test]
    fn cancellable_states() {
        let cancellable: Vec<_> = AttemptState::ALL
            .into_iter()
            .filter(AttemptState::is_cancellable)
            .collect();
        assert_eq!(
            cancellable,
            vec![AttemptState::AwaitingMethodChoice, AttemptState::AwaitingSigning]
        );
    }
}
