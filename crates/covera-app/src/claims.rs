//! Claim submission flow
//!
//! The claimant signs the claim payload with the session identity, the
//! backend assesses it, and the decision is fetched back before the attempt
//! settles. No funds move, so every failure leaves funds untouched.

#![allow(clippy::disallowed_types)]

use crate::flow::{
    AttemptHandle, FlowEngine, FlowStages, MethodRequirement, NarrationFeed, StageContext,
    StageError,
};
use crate::identity::IdentityProvider;
use crate::payment::identity_failure;
use crate::session::Session;
use async_trait::async_trait;
use covera_core::effects::BackendEffects;
use covera_core::errors::{FlowError, WalletError};
use covera_core::flow::{Failure, FailureReason};
use covera_core::identifiers::{SettlementRef, TxRef};
use covera_core::types::{Amount, ClaimRecord, ClaimSubmission, Identity, SettlementRecord};
use parking_lot::Mutex;
use std::sync::Arc;

struct ClaimStages {
    identity: Identity,
    provider: Arc<IdentityProvider>,
    backend: Arc<dyn BackendEffects>,
    narration: NarrationFeed,
    decision: Mutex<Option<ClaimRecord>>,
}

#[async_trait]
impl FlowStages<ClaimSubmission> for ClaimStages {
    fn method_requirement(&self, _claim: &ClaimSubmission) -> MethodRequirement {
        MethodRequirement::Preset
    }

    async fn sign_and_submit(
        &self,
        ctx: &mut StageContext,
        claim: &ClaimSubmission,
    ) -> Result<TxRef, StageError> {
        let handle = self
            .provider
            .get_signing_handle(&self.identity)
            .await
            .map_err(identity_failure)?;
        let signature = handle.sign(&claim.signing_payload()).await.map_err(|e| {
            let reason = match e {
                WalletError::UserRejected => FailureReason::SigningRejected,
                _ => FailureReason::SubmissionRejected,
            };
            Failure::untouched(reason, e.to_string())
        })?;

        let signed = ClaimSubmission {
            signature: Some(signature),
            ..claim.clone()
        };
        let receipt = self.backend.submit_claim(&signed).await.map_err(|e| {
            Failure::untouched(FailureReason::BackendUnreachable, e.to_string())
        })?;
        if let Some(error) = receipt.error.as_deref() {
            return Err(Failure::untouched(FailureReason::SubmissionRejected, error).into());
        }
        if receipt.claim_id.is_empty() {
            return Err(Failure::untouched(
                FailureReason::SubmissionRejected,
                "backend returned no claim id",
            )
            .into());
        }
        tracing::info!(
            attempt_id = %ctx.attempt_id(),
            claim_id = %receipt.claim_id,
            decision = receipt.status().label(),
            "Claim assessed"
        );
        self.narration
            .play(Some(ctx.attempt_id()), receipt.thinking_steps.clone());
        Ok(TxRef::new(receipt.claim_id))
    }

    async fn await_confirmation(
        &self,
        _ctx: &StageContext,
        _claim: &ClaimSubmission,
        tx: &TxRef,
    ) -> Result<(), StageError> {
        let record = self.backend.fetch_claim(tx.as_str()).await.map_err(|e| {
            Failure::untouched(FailureReason::BackendUnreachable, e.to_string())
        })?;
        *self.decision.lock() = Some(record);
        Ok(())
    }

    async fn settle(
        &self,
        _ctx: &StageContext,
        _claim: &ClaimSubmission,
        tx: &TxRef,
    ) -> Result<SettlementRecord, StageError> {
        let record = self.decision.lock().take().ok_or_else(|| {
            Failure::untouched(FailureReason::BackendUnreachable, "claim decision missing")
        })?;
        let mut note = format!("decision: {}", record.decision().label());
        if let Some(payout) = record.payout_amount {
            note.push_str(&format!(", payout {payout:.2}"));
        }
        Ok(SettlementRecord::new(
            SettlementRef::new(record.claim_id),
            record.on_chain_tx_hash.unwrap_or_default(),
        )
        .with_note(note))
    }
}

#[derive(Clone)]
pub struct ClaimFlow {
    engine: FlowEngine,
    session: Arc<Session>,
    provider: Arc<IdentityProvider>,
    backend: Arc<dyn BackendEffects>,
    narration: NarrationFeed,
}

impl ClaimFlow {
    pub fn new(
        engine: FlowEngine,
        session: Arc<Session>,
        provider: Arc<IdentityProvider>,
        backend: Arc<dyn BackendEffects>,
        narration: NarrationFeed,
    ) -> Self {
        Self {
            engine,
            session,
            provider,
            backend,
            narration,
        }
    }

    /// Submit a claim for `amount` as the session identity
    pub fn submit(&self, description: &str, amount: Amount) -> Result<AttemptHandle, FlowError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(FlowError::InvalidRequest {
                reason: "claim description is empty".to_string(),
            });
        }
        if amount.is_zero() {
            return Err(FlowError::InvalidRequest {
                reason: "claimed amount must be positive".to_string(),
            });
        }
        let identity = self.session.identity().ok_or(FlowError::NoIdentity)?;
        let claim = ClaimSubmission {
            description: description.to_string(),
            claimed_amount: amount.as_f64(),
            wallet_address: identity.address.clone(),
            signature: None,
        };
        let stages = ClaimStages {
            identity: identity.clone(),
            provider: self.provider.clone(),
            backend: self.backend.clone(),
            narration: self.narration.clone(),
            decision: Mutex::new(None),
        };
        self.engine
            .start(identity.address, claim, Arc::new(stages), true)
    }
}
