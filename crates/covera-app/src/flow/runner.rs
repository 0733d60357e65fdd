//! Attempt runner
//!
//! One runner task owns one `TransactionAttempt` and walks it through the
//! state table:
//!
//! ```text
//! Created -> [AwaitingMethodChoice] -> AwaitingSigning -> Submitted
//!         -> AwaitingConfirmation -> Settling -> Succeeded
//! ```
//!
//! User cancellation is honoured only while waiting for a choice or a
//! signature. Session revocation is honoured in every non-terminal state;
//! after submission it ends the attempt as `Cancelled` and records it in
//! the session's unsettled ledger.

use super::handle::{AttemptHandle, ChoiceSlot};
use super::sink::EventSink;
use super::stages::{FlowStages, MethodRequirement, StageContext, StageError};
use crate::session::{AttemptLease, Session};
use crate::tasks::TaskRegistry;
use covera_core::errors::FlowError;
use covera_core::flow::{
    AttemptReport, AttemptState, Failure, FailureReason, FlowEvent, FlowSubject, FundsStatus,
    MethodChoice, TransactionAttempt,
};
use covera_core::identifiers::{Address, AttemptId};
use covera_core::types::{PaymentMethod, SettlementRecord};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Starts attempts and spawns their runners
#[derive(Debug, Clone)]
pub struct FlowEngine {
    session: Arc<Session>,
    events: EventSink,
    tasks: Arc<TaskRegistry>,
    confirmation_timeout: Duration,
}

impl FlowEngine {
    pub fn new(
        session: Arc<Session>,
        events: EventSink,
        tasks: Arc<TaskRegistry>,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            session,
            events,
            tasks,
            confirmation_timeout,
        }
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Start an attempt for `owner`
    ///
    /// Exclusive attempts fail with `AttemptInProgress` while another
    /// exclusive attempt of the same owner is running.
    pub fn start<S, F>(
        &self,
        owner: Address,
        subject: S,
        stages: Arc<F>,
        exclusive: bool,
    ) -> Result<AttemptHandle, FlowError>
    where
        S: FlowSubject,
        F: FlowStages<S>,
    {
        let id = AttemptId::new();
        let lease = self.session.begin_attempt(&owner, id, exclusive)?;
        let attempt = TransactionAttempt::new(id, owner.clone(), subject);

        let (report_tx, report_rx) = watch::channel(attempt.report());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (manual_tx, manual_rx) = mpsc::unbounded_channel();
        let choice = Arc::new(ChoiceSlot::default());

        tracing::info!(
            attempt_id = %id,
            kind = %attempt.subject().kind(),
            owner = %owner,
            subject = %attempt.subject().describe(),
            "Attempt created"
        );
        self.events.emit(FlowEvent::StateChanged {
            attempt_id: id,
            state: AttemptState::Created,
            detail: None,
        });

        let runner = AttemptRunner {
            ctx: StageContext::new(id, owner, self.events.clone(), manual_rx),
            attempt,
            stages,
            events: self.events.clone(),
            session: self.session.clone(),
            report_tx,
            cancel_rx,
            choice: choice.clone(),
            lease,
            confirmation_timeout: self.confirmation_timeout,
        };
        self.tasks.spawn(runner.run());

        Ok(AttemptHandle::new(
            id,
            report_rx,
            Arc::new(cancel_tx),
            choice,
            manual_tx,
            self.events.clone(),
        ))
    }
}

enum Interrupt {
    UserCancel,
    Revoked,
}

async fn wait_true(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: the signal can never fire
            std::future::pending::<()>().await;
        }
    }
}

/// Run `work` unless revoked, or cancelled by the user when `cancel` is set
///
/// Completed work wins over a simultaneous signal.
async fn interruptible<T>(
    work: impl Future<Output = T>,
    cancel: Option<&mut watch::Receiver<bool>>,
    revoke: &mut watch::Receiver<bool>,
) -> Result<T, Interrupt> {
    let user_cancel = async move {
        match cancel {
            Some(rx) => wait_true(rx).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        biased;
        out = work => Ok(out),
        _ = wait_true(revoke) => Err(Interrupt::Revoked),
        _ = user_cancel => Err(Interrupt::UserCancel),
    }
}

impl From<Interrupt> for StageError {
    fn from(_: Interrupt) -> Self {
        StageError::Cancelled
    }
}

struct AttemptRunner<S: FlowSubject, F: FlowStages<S>> {
    attempt: TransactionAttempt<S>,
    stages: Arc<F>,
    ctx: StageContext,
    events: EventSink,
    session: Arc<Session>,
    report_tx: watch::Sender<AttemptReport>,
    cancel_rx: watch::Receiver<bool>,
    choice: Arc<ChoiceSlot>,
    lease: AttemptLease,
    confirmation_timeout: Duration,
}

impl<S: FlowSubject, F: FlowStages<S>> AttemptRunner<S, F> {
    async fn run(mut self) {
        let outcome = self.drive().await;
        self.choice.close();
        let id = self.attempt.id();
        let submitted = self.attempt.external_tx_ref().is_some();

        let (result, detail) = match outcome {
            Ok(record) => {
                let detail = record.reference().to_string();
                (self.attempt.succeed(record), Some(detail))
            }
            Err(StageError::Failed(failure)) => {
                tracing::warn!(
                    attempt_id = %id,
                    reason = %failure.reason,
                    funds = ?failure.funds,
                    message = %failure.message,
                    "Attempt failed"
                );
                let detail = failure.user_message();
                (self.attempt.fail(failure), Some(detail))
            }
            Err(StageError::Cancelled) => {
                tracing::info!(attempt_id = %id, submitted, "Attempt cancelled");
                (self.attempt.cancel(), None)
            }
        };
        if let Err(e) = result {
            tracing::error!(attempt_id = %id, error = %e, "Attempt could not terminate");
        }

        let report = self.attempt.report();
        let unsettled = match &report.failure {
            Some(failure) => failure.needs_reconciliation(),
            None => report.state == AttemptState::Cancelled && submitted,
        };
        if unsettled {
            self.session.record_unsettled(report.clone());
        }

        // Free the owner before observers can see the terminal state
        self.lease.release();
        self.publish(detail);
    }

    fn publish(&self, detail: Option<String>) {
        self.report_tx.send_replace(self.attempt.report());
        self.events.emit(FlowEvent::StateChanged {
            attempt_id: self.attempt.id(),
            state: self.attempt.state(),
            detail,
        });
    }

    fn enter(&mut self, to: AttemptState, detail: Option<String>) {
        let from = self.attempt.state();
        if let Err(e) = self.attempt.advance(to) {
            tracing::error!(attempt_id = %self.attempt.id(), error = %e, "Rejected transition");
            return;
        }
        tracing::info!(attempt_id = %self.attempt.id(), from = %from, to = %to, "Attempt transition");
        self.publish(detail);
    }

    fn resolve_method(&mut self, method: PaymentMethod) -> Result<(), StageError> {
        self.attempt.resolve_method(method).map_err(|e| {
            StageError::Failed(Failure::untouched(
                FailureReason::SubmissionRejected,
                format!("payment method could not be resolved: {e}"),
            ))
        })
    }

    async fn drive(&mut self) -> Result<SettlementRecord, StageError> {
        let subject = self.attempt.subject().clone();

        match self.stages.method_requirement(&subject) {
            MethodRequirement::Preset => {}
            MethodRequirement::Implied(method) => self.resolve_method(method)?,
            MethodRequirement::Choose(request) => {
                // Armed before the state is published so observers can answer
                let answer = self.choice.open();
                self.enter(AttemptState::AwaitingMethodChoice, None);
                self.events.emit(FlowEvent::ChoiceRequested {
                    attempt_id: self.attempt.id(),
                    request,
                });
                let choice = interruptible(
                    answer,
                    Some(&mut self.cancel_rx),
                    self.lease.revocation(),
                )
                .await?
                .map_err(|_| StageError::Cancelled)?;
                self.choice.close();
                tracing::info!(attempt_id = %self.attempt.id(), choice = ?choice, "Payment method chosen");
                match choice {
                    MethodChoice::Wallet => self.resolve_method(PaymentMethod::Wallet)?,
                    MethodChoice::Manual => self.resolve_method(PaymentMethod::Manual)?,
                    MethodChoice::Decline => return Err(StageError::Cancelled),
                }
            }
        }

        let subject = self.attempt.subject().clone();
        self.enter(AttemptState::AwaitingSigning, None);
        let tx = interruptible(
            self.stages.sign_and_submit(&mut self.ctx, &subject),
            Some(&mut self.cancel_rx),
            self.lease.revocation(),
        )
        .await??;

        if let Err(e) = self.attempt.assign_tx_ref(tx.clone()) {
            return Err(StageError::Failed(Failure::new(
                FailureReason::SubmissionRejected,
                FundsStatus::InFlight,
                e.to_string(),
            )));
        }
        // A cancel accepted while the submission was completing still ends the
        // attempt; the tx ref is kept so it lands in the unsettled ledger
        if *self.cancel_rx.borrow() {
            tracing::warn!(attempt_id = %self.attempt.id(), tx = %tx, "Cancelled after the provider accepted the payment");
            return Err(StageError::Cancelled);
        }
        self.enter(AttemptState::Submitted, Some(tx.to_string()));
        self.enter(AttemptState::AwaitingConfirmation, None);

        let confirmed = interruptible(
            tokio::time::timeout(
                self.confirmation_timeout,
                self.stages.await_confirmation(&self.ctx, &subject, &tx),
            ),
            None,
            self.lease.revocation(),
        )
        .await?;
        match confirmed {
            Ok(result) => result?,
            Err(_) => {
                return Err(StageError::Failed(Failure::new(
                    FailureReason::ConfirmationTimeout,
                    FundsStatus::InFlight,
                    format!(
                        "{tx} not final after {}s",
                        self.confirmation_timeout.as_secs_f32()
                    ),
                )))
            }
        }

        self.enter(AttemptState::Settling, None);
        interruptible(
            self.stages.settle(&self.ctx, &subject, &tx),
            None,
            self.lease.revocation(),
        )
        .await?
    }
}
