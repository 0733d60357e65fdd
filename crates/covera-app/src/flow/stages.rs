//! Per-flow stage implementations plugged into the runner

use super::sink::EventSink;
use async_trait::async_trait;
use covera_core::flow::{ChoiceRequest, Failure, FlowEvent, FlowSubject};
use covera_core::identifiers::{Address, AttemptId, TxRef};
use covera_core::types::{PaymentMethod, SettlementRecord};
use tokio::sync::mpsc;

/// What the runner must do about the payment method before signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodRequirement {
    /// The subject already carries its method, or has none
    Preset,
    /// Resolve to this method without asking
    Implied(PaymentMethod),
    /// Ask the user
    Choose(ChoiceRequest),
}

/// Why a stage stopped the attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// Terminal failure
    Failed(Failure),
    /// The attempt was withdrawn
    Cancelled,
}

impl From<Failure> for StageError {
    fn from(failure: Failure) -> Self {
        Self::Failed(failure)
    }
}

/// Runner-owned context handed to stages
pub struct StageContext {
    attempt_id: AttemptId,
    owner: Address,
    events: EventSink,
    manual_rx: mpsc::UnboundedReceiver<()>,
}

impl StageContext {
    pub(crate) fn new(
        attempt_id: AttemptId,
        owner: Address,
        events: EventSink,
        manual_rx: mpsc::UnboundedReceiver<()>,
    ) -> Self {
        Self {
            attempt_id,
            owner,
            events,
            manual_rx,
        }
    }

    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    /// Identity the attempt runs for
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn emit(&self, event: FlowEvent) {
        self.events.emit(event);
    }

    /// Wait for the next "I have sent the payment" signal
    ///
    /// Returns `false` once every attempt handle is gone.
    pub async fn manual_payment_sent(&mut self) -> bool {
        self.manual_rx.recv().await.is_some()
    }
}

/// Stages of one flow family
///
/// The runner owns sequencing, cancellation, timeouts and publication;
/// stages only perform the work of their step.
#[async_trait]
pub trait FlowStages<S: FlowSubject>: Send + Sync + 'static {
    /// Decide how the payment method gets resolved
    fn method_requirement(&self, subject: &S) -> MethodRequirement;

    /// Sign and submit; returns the external reference
    async fn sign_and_submit(
        &self,
        ctx: &mut StageContext,
        subject: &S,
    ) -> Result<TxRef, StageError>;

    /// Wait for finality of `tx`
    async fn await_confirmation(
        &self,
        ctx: &StageContext,
        subject: &S,
        tx: &TxRef,
    ) -> Result<(), StageError>;

    /// Register the confirmed transaction; called exactly once per attempt
    async fn settle(
        &self,
        ctx: &StageContext,
        subject: &S,
        tx: &TxRef,
    ) -> Result<SettlementRecord, StageError>;
}
