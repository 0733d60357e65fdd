//! Transaction attempts
//!
//! A `TransactionAttempt` is owned by exactly one runner. Everything else
//! sees `AttemptReport` snapshots.

use super::failure::Failure;
use super::state::AttemptState;
use crate::errors::FlowError;
use crate::identifiers::{Address, AttemptId, TxRef};
use crate::types::{
    ClaimSubmission, ParametricEvent, PaymentMethod, ProductKind, PurchaseIntent,
    SettlementRecord,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flow family of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// Policy purchase
    Purchase,
    /// Liquidity stake
    Stake,
    /// Claim submission
    Claim,
    /// Parametric event simulation
    Parametric,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Purchase => "purchase",
            Self::Stake => "stake",
            Self::Claim => "claim",
            Self::Parametric => "parametric",
        })
    }
}

/// Anything that can be driven through the attempt state table
pub trait FlowSubject: Clone + fmt::Debug + Send + Sync + 'static {
    /// Flow family
    fn kind(&self) -> FlowKind;

    /// One-line description for reports and logs
    fn describe(&self) -> String;

    /// Payment method, for subjects that pay
    fn payment_method(&self) -> Option<PaymentMethod> {
        None
    }

    /// Resolve an `Auto` payment method
    fn resolve_method(&mut self, _method: PaymentMethod) -> Result<(), FlowError> {
        Ok(())
    }
}

impl FlowSubject for PurchaseIntent {
    fn kind(&self) -> FlowKind {
        if self.product() == ProductKind::Stake {
            FlowKind::Stake
        } else {
            FlowKind::Purchase
        }
    }

    fn describe(&self) -> String {
        format!("{} {}", self.product(), self.price())
    }

    fn payment_method(&self) -> Option<PaymentMethod> {
        Some(self.method())
    }

    fn resolve_method(&mut self, method: PaymentMethod) -> Result<(), FlowError> {
        PurchaseIntent::resolve_method(self, method)
    }
}

impl FlowSubject for ClaimSubmission {
    fn kind(&self) -> FlowKind {
        FlowKind::Claim
    }

    fn describe(&self) -> String {
        format!("claim of {:.2}", self.claimed_amount)
    }
}

impl FlowSubject for ParametricEvent {
    fn kind(&self) -> FlowKind {
        FlowKind::Parametric
    }

    fn describe(&self) -> String {
        format!(
            "{:?} event (magnitude {:.1})",
            self.sensor_data.event_type, self.sensor_data.magnitude
        )
    }
}

/// One run of a subject through the state table
#[derive(Debug, Clone)]
pub struct TransactionAttempt<S: FlowSubject> {
    id: AttemptId,
    owner: Address,
    subject: S,
    state: AttemptState,
    external_tx_ref: Option<TxRef>,
    failure: Option<Failure>,
    settlement: Option<SettlementRecord>,
    history: Vec<AttemptState>,
}

impl<S: FlowSubject> TransactionAttempt<S> {
    /// New attempt in `Created`
    pub fn new(id: AttemptId, owner: Address, subject: S) -> Self {
        Self {
            id,
            owner,
            subject,
            state: AttemptState::Created,
            external_tx_ref: None,
            failure: None,
            settlement: None,
            history: vec![AttemptState::Created],
        }
    }

    /// Attempt identifier
    pub fn id(&self) -> AttemptId {
        self.id
    }

    /// Identity the attempt runs for
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Subject
    pub fn subject(&self) -> &S {
        &self.subject
    }

    /// Current state
    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// States visited, in order
    pub fn history(&self) -> &[AttemptState] {
        &self.history
    }

    /// External reference, once submitted
    pub fn external_tx_ref(&self) -> Option<&TxRef> {
        self.external_tx_ref.as_ref()
    }

    /// Failure; present iff the state is `Failed`
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Settlement; present iff the state is `Succeeded`
    pub fn settlement(&self) -> Option<&SettlementRecord> {
        self.settlement.as_ref()
    }

    fn enter(&mut self, to: AttemptState) -> Result<(), FlowError> {
        self.state.validate_transition(to)?;
        self.state = to;
        self.history.push(to);
        Ok(())
    }

    /// Move to a non-terminal state or `Cancelled`
    ///
    /// `Failed` and `Succeeded` carry data and go through [`Self::fail`] and
    /// [`Self::succeed`].
    pub fn advance(&mut self, to: AttemptState) -> Result<(), FlowError> {
        if matches!(to, AttemptState::Failed | AttemptState::Succeeded) {
            return Err(FlowError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.enter(to)
    }

    /// Terminate with a failure
    pub fn fail(&mut self, failure: Failure) -> Result<(), FlowError> {
        self.enter(AttemptState::Failed)?;
        self.failure = Some(failure);
        Ok(())
    }

    /// Terminate as cancelled
    pub fn cancel(&mut self) -> Result<(), FlowError> {
        self.enter(AttemptState::Cancelled)
    }

    /// Terminate as settled
    pub fn succeed(&mut self, settlement: SettlementRecord) -> Result<(), FlowError> {
        self.enter(AttemptState::Succeeded)?;
        self.settlement = Some(settlement);
        Ok(())
    }

    /// Record the external transaction reference (once)
    pub fn assign_tx_ref(&mut self, tx_ref: TxRef) -> Result<(), FlowError> {
        if self.external_tx_ref.is_some() {
            return Err(FlowError::DuplicateSubmission);
        }
        if self.state.is_terminal() {
            return Err(FlowError::InvalidRequest {
                reason: format!("attempt is already {}", self.state),
            });
        }
        self.external_tx_ref = Some(tx_ref);
        Ok(())
    }

    /// Resolve the subject's payment method; frozen from `AwaitingSigning` on
    pub fn resolve_method(&mut self, method: PaymentMethod) -> Result<(), FlowError> {
        if !matches!(
            self.state,
            AttemptState::Created | AttemptState::AwaitingMethodChoice
        ) {
            return Err(FlowError::MethodAlreadyResolved);
        }
        self.subject.resolve_method(method)
    }

    /// Snapshot for observers
    pub fn report(&self) -> AttemptReport {
        AttemptReport {
            id: self.id,
            kind: self.subject.kind(),
            owner: self.owner.clone(),
            subject: self.subject.describe(),
            state: self.state,
            method: self.subject.payment_method(),
            history: self.history.clone(),
            external_tx_ref: self.external_tx_ref.clone(),
            failure: self.failure.clone(),
            settlement: self.settlement.clone(),
        }
    }
}

/// Point-in-time snapshot of an attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptReport {
    /// Attempt identifier
    pub id: AttemptId,
    /// Flow family
    pub kind: FlowKind,
    /// Identity the attempt runs for
    pub owner: Address,
    /// Subject description
    pub subject: String,
    /// State at snapshot time
    pub state: AttemptState,
    /// Payment method, for paying subjects
    pub method: Option<PaymentMethod>,
    /// States visited
    pub history: Vec<AttemptState>,
    /// External reference
    pub external_tx_ref: Option<TxRef>,
    /// Failure, if failed
    pub failure: Option<Failure>,
    /// Settlement, if succeeded
    pub settlement: Option<SettlementRecord>,
}

impl AttemptReport {
    /// Terminal state reached
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Number of times `state` was entered
    pub fn entries_of(&self, state: AttemptState) -> usize {
        self.history.iter().filter(|s| **s == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::failure::FailureReason;
    use crate::identifiers::SettlementRef;
    use crate::types::{Amount, PolicyOptions};

    fn attempt() -> TransactionAttempt<PurchaseIntent> {
        TransactionAttempt::new(
            AttemptId::new(),
            Address::new("0xabc"),
            PurchaseIntent::new(
                ProductKind::Vehicle,
                Amount::from_cents(75),
                PolicyOptions::default(),
            ),
        )
    }

    #[test]
    fn failure_only_with_failed_state() {
        let mut a = attempt();
        a.advance(AttemptState::AwaitingSigning).unwrap();
        assert!(a.failure().is_none());
        a.fail(Failure::untouched(FailureReason::SigningRejected, "no"))
            .unwrap();
        assert_eq!(a.state(), AttemptState::Failed);
        assert!(a.failure().is_some());
        assert!(a.advance(AttemptState::Submitted).is_err());
    }

    #[test]
    fn advance_refuses_data_carrying_terminals() {
        let mut a = attempt();
        assert!(a.advance(AttemptState::Failed).is_err());
        assert!(a.advance(AttemptState::Succeeded).is_err());
        assert_eq!(a.history(), &[AttemptState::Created]);
    }

    #[test]
    fn tx_ref_assigned_once() {
        let mut a = attempt();
        a.assign_tx_ref(TxRef::new("0x1")).unwrap();
        assert_eq!(
            a.assign_tx_ref(TxRef::new("0x2")),
            Err(FlowError::DuplicateSubmission)
        );
        assert_eq!(a.external_tx_ref().unwrap().as_str(), "0x1");
    }

    #[test]
    fn method_frozen_after_signing_starts() {
        let mut a = attempt();
        a.advance(AttemptState::AwaitingMethodChoice).unwrap();
        a.resolve_method(PaymentMethod::Manual).unwrap();
        a.advance(AttemptState::AwaitingSigning).unwrap();
        assert_eq!(
            a.resolve_method(PaymentMethod::Wallet),
            Err(FlowError::MethodAlreadyResolved)
        );
        assert_eq!(a.report().method, Some(PaymentMethod::Manual));
    }

    #[test]
    fn succeed_records_settlement() {
        let mut a = attempt();
        for s in [
            AttemptState::AwaitingSigning,
            AttemptState::Submitted,
            AttemptState::AwaitingConfirmation,
            AttemptState::Settling,
        ] {
            a.advance(s).unwrap();
        }
        a.succeed(SettlementRecord::new(SettlementRef::new("POL-1"), "0xfeed"))
            .unwrap();
        let report = a.report();
        assert_eq!(report.state, AttemptState::Succeeded);
        assert_eq!(report.settlement.unwrap().reference().as_str(), "POL-1");
        assert_eq!(report.kind, FlowKind::Purchase);
    }
}
