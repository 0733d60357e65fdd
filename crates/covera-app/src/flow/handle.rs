//! Caller-side view and controls of a running attempt

#![allow(clippy::disallowed_types)]

use super::sink::EventSink;
use covera_core::errors::FlowError;
use covera_core::flow::{AttemptReport, AttemptState, FlowEvent, MethodChoice};
use covera_core::identifiers::AttemptId;
use covera_core::types::PaymentMethod;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Single-use slot answering a pending method choice
#[derive(Debug, Default)]
pub(crate) struct ChoiceSlot {
    pending: Mutex<Option<oneshot::Sender<MethodChoice>>>,
}

impl ChoiceSlot {
    /// Arm the slot; any previous arming is discarded
    pub(crate) fn open(&self) -> oneshot::Receiver<MethodChoice> {
        let (tx, rx) = oneshot::channel();
        *self.pending.lock() = Some(tx);
        rx
    }

    pub(crate) fn close(&self) {
        self.pending.lock().take();
    }

    pub(crate) fn resolve(&self, choice: MethodChoice) -> Result<(), FlowError> {
        let tx = self.pending.lock().take().ok_or(FlowError::NoPendingChoice)?;
        tx.send(choice).map_err(|_| FlowError::NoPendingChoice)
    }
}

/// Handle to a running attempt
///
/// Cloning is cheap; all clones observe and control the same attempt.
#[derive(Debug, Clone)]
pub struct AttemptHandle {
    id: AttemptId,
    report: watch::Receiver<AttemptReport>,
    cancel: Arc<watch::Sender<bool>>,
    choice: Arc<ChoiceSlot>,
    manual: mpsc::UnboundedSender<()>,
    events: EventSink,
}

impl AttemptHandle {
    pub(crate) fn new(
        id: AttemptId,
        report: watch::Receiver<AttemptReport>,
        cancel: Arc<watch::Sender<bool>>,
        choice: Arc<ChoiceSlot>,
        manual: mpsc::UnboundedSender<()>,
        events: EventSink,
    ) -> Self {
        Self {
            id,
            report,
            cancel,
            choice,
            manual,
            events,
        }
    }

    pub fn id(&self) -> AttemptId {
        self.id
    }

    /// Current state
    pub fn state(&self) -> AttemptState {
        self.report.borrow().state
    }

    /// Latest snapshot
    pub fn report(&self) -> AttemptReport {
        self.report.borrow().clone()
    }

    /// Snapshot stream
    pub fn watch(&self) -> watch::Receiver<AttemptReport> {
        self.report.clone()
    }

    /// Every event published by the app from now on
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    /// Wait until a snapshot satisfies `predicate`
    ///
    /// Returns the last snapshot if the attempt ends first.
    pub async fn wait_for(&self, predicate: impl Fn(&AttemptReport) -> bool) -> AttemptReport {
        let mut rx = self.report.clone();
        let reached = rx.wait_for(|r| predicate(r)).await.map(|r| r.clone());
        reached.unwrap_or_else(|_| rx.borrow().clone())
    }

    /// Wait until the attempt enters `state` (or ends)
    pub async fn wait_for_state(&self, state: AttemptState) -> AttemptReport {
        self.wait_for(|r| r.state == state || r.is_terminal()).await
    }

    /// Wait for the terminal snapshot
    pub async fn outcome(&self) -> AttemptReport {
        self.wait_for(AttemptReport::is_terminal).await
    }

    /// Withdraw the attempt
    ///
    /// Accepted only in `AwaitingMethodChoice` and `AwaitingSigning`. An
    /// accepted cancel always ends the attempt `Cancelled`; if the provider
    /// had already taken the payment, the report keeps its tx ref and is
    /// recorded as unsettled.
    pub fn cancel(&self) -> Result<(), FlowError> {
        let state = self.state();
        if !state.is_cancellable() {
            return Err(FlowError::NotCancellable { state });
        }
        tracing::debug!(attempt_id = %self.id, state = %state, "Cancellation requested");
        self.cancel.send_replace(true);
        Ok(())
    }

    /// Answer the pending payment method choice
    pub fn resolve_choice(&self, choice: MethodChoice) -> Result<(), FlowError> {
        self.choice.resolve(choice)
    }

    /// Tell the attempt the manual transfer was sent; triggers one poll
    pub fn confirm_manual_payment_sent(&self) -> Result<(), FlowError> {
        {
            let report = self.report.borrow();
            if report.state != AttemptState::AwaitingSigning
                || report.method != Some(PaymentMethod::Manual)
            {
                return Err(FlowError::NoManualPaymentPending);
            }
        }
        self.manual
            .send(())
            .map_err(|_| FlowError::NoManualPaymentPending)
    }
}
