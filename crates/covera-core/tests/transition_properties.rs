#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]
//! # Attempt Transition Properties
//!
//! Random sequences of requested transitions are applied to an attempt. Every
//! request must succeed exactly when the state table allows it, and the
//! recorded history must only ever move forward.

use covera_core::flow::{AttemptState, Failure, FailureReason, TransactionAttempt};
use covera_core::identifiers::{Address, AttemptId, SettlementRef, TxRef};
use covera_core::types::{Amount, PaymentMethod, PolicyOptions, ProductKind, PurchaseIntent};
use covera_core::SettlementRecord;
use proptest::prelude::*;

fn forward_rank(state: AttemptState) -> Option<usize> {
    match state {
        AttemptState::Created => Some(0),
        AttemptState::AwaitingMethodChoice => Some(1),
        AttemptState::AwaitingSigning => Some(2),
        AttemptState::Submitted => Some(3),
        AttemptState::AwaitingConfirmation => Some(4),
        AttemptState::Settling => Some(5),
        AttemptState::Succeeded => Some(6),
        AttemptState::Cancelled | AttemptState::Failed => None,
    }
}

fn state_strategy() -> impl Strategy<Value = AttemptState> {
    prop_oneof![
        Just(AttemptState::Created),
        Just(AttemptState::AwaitingMethodChoice),
        Just(AttemptState::AwaitingSigning),
        Just(AttemptState::Submitted),
        Just(AttemptState::AwaitingConfirmation),
        Just(AttemptState::Settling),
        Just(AttemptState::Succeeded),
        Just(AttemptState::Cancelled),
        Just(AttemptState::Failed),
    ]
}

/// Requests biased towards the next forward step so long paths are common
fn request_strategy() -> impl Strategy<Value = Option<AttemptState>> {
    prop_oneof![
        3 => Just(None),
        2 => state_strategy().prop_map(Some),
    ]
}

fn next_forward(state: AttemptState) -> AttemptState {
    match state {
        AttemptState::Created => AttemptState::AwaitingMethodChoice,
        AttemptState::AwaitingMethodChoice => AttemptState::AwaitingSigning,
        AttemptState::AwaitingSigning => AttemptState::Submitted,
        AttemptState::Submitted => AttemptState::AwaitingConfirmation,
        AttemptState::AwaitingConfirmation => AttemptState::Settling,
        AttemptState::Settling => AttemptState::Succeeded,
        terminal => terminal,
    }
}

fn new_attempt() -> TransactionAttempt<PurchaseIntent> {
    TransactionAttempt::new(
        AttemptId::new(),
        Address::new("0x00000000000000000000000000000000000000aa"),
        PurchaseIntent::new(
            ProductKind::Parametric,
            Amount::from_cents(120),
            PolicyOptions::default(),
        ),
    )
}

fn apply(
    attempt: &mut TransactionAttempt<PurchaseIntent>,
    to: AttemptState,
) -> Result<(), covera_core::FlowError> {
    match to {
        AttemptState::Failed => attempt.fail(Failure::untouched(
            FailureReason::SubmissionRejected,
            "generated",
        )),
        AttemptState::Succeeded => attempt.succeed(SettlementRecord::new(
            SettlementRef::new("generated"),
            "0x0",
        )),
        AttemptState::Cancelled => attempt.cancel(),
        other => attempt.advance(other),
    }
}

proptest! {
    /// Property: a request succeeds iff the table allows it, and a refused
    /// request leaves the attempt untouched
    #[test]
    fn prop_requests_follow_table(requests in prop::collection::vec(request_strategy(), 0..24)) {
        let mut attempt = new_attempt();

        for request in requests {
            let from = attempt.state();
            let to = request.unwrap_or_else(|| next_forward(from));
            let history_len = attempt.history().len();

            let result = apply(&mut attempt, to);

            prop_assert_eq!(result.is_ok(), from.can_transition(to),
                "{:?} -> {:?} gave {:?}", from, to, result);
            if result.is_ok() {
                prop_assert_eq!(attempt.state(), to);
                prop_assert_eq!(attempt.history().len(), history_len + 1);
            } else {
                prop_assert_eq!(attempt.state(), from);
                prop_assert_eq!(attempt.history().len(), history_len);
            }
        }
    }

    /// Property: history ranks strictly increase; terminals appear only last
    #[test]
    fn prop_history_only_moves_forward(requests in prop::collection::vec(request_strategy(), 0..24)) {
        let mut attempt = new_attempt();
        for request in requests {
            let to = request.unwrap_or_else(|| next_forward(attempt.state()));
            let _ = apply(&mut attempt, to);
        }

        let history = attempt.history();
        for (idx, state) in history.iter().enumerate() {
            if state.is_terminal() {
                prop_assert_eq!(idx, history.len() - 1);
            }
        }
        let ranks: Vec<usize> = history.iter().filter_map(|s| forward_rank(*s)).collect();
        for pair in ranks.windows(2) {
            prop_assert!(pair[0] < pair[1], "history went backwards: {:?}", history);
        }
    }

    /// Property: failure is present exactly when the state is Failed, and
    /// settlement exactly when Succeeded
    #[test]
    fn prop_terminal_payloads_match_state(requests in prop::collection::vec(request_strategy(), 0..24)) {
        let mut attempt = new_attempt();
        for request in requests {
            let to = request.unwrap_or_else(|| next_forward(attempt.state()));
            let _ = apply(&mut attempt, to);
            prop_assert_eq!(attempt.failure().is_some(), attempt.state() == AttemptState::Failed);
            prop_assert_eq!(attempt.settlement().is_some(), attempt.state() == AttemptState::Succeeded);
        }
    }

    /// Property: the method can only be resolved before signing begins
    #[test]
    fn prop_method_frozen_from_signing(steps in 0usize..6) {
        let mut attempt = new_attempt();
        let mut state = AttemptState::Created;
        for _ in 0..steps {
            state = next_forward(state);
            if state == AttemptState::Succeeded {
                break;
            }
            attempt.advance(state).unwrap();
        }

        let result = attempt.resolve_method(PaymentMethod::Wallet);
        let allowed = matches!(attempt.state(), AttemptState::Created | AttemptState::AwaitingMethodChoice);
        prop_assert_eq!(result.is_ok(), allowed);
    }
}

#[test]
fn tx_ref_is_single_assignment_across_states() {
    let mut attempt = new_attempt();
    attempt.advance(AttemptState::AwaitingSigning).unwrap();
    attempt.assign_tx_ref(TxRef::new("0xabc")).unwrap();
    attempt.advance(AttemptState::Submitted).unwrap();
    assert!(attempt.assign_tx_ref(TxRef::new("0xdef")).is_err());
}
