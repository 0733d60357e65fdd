//! Payment Orchestration
//!
//! Turns a `PurchaseIntent` into a running attempt. Identities backed by an
//! external wallet (or a local key with an attached payer wallet) pay from
//! the wallet directly; bare local keys are offered a choice between the
//! wallet and a manual transfer verified by backend polling.

mod stages;

pub(crate) use stages::identity_failure;

use crate::config::PaymentTerms;
use crate::flow::{AttemptHandle, FlowEngine};
use crate::identity::IdentityProvider;
use crate::pricing;
use crate::session::Session;
use covera_core::effects::BackendEffects;
use covera_core::errors::FlowError;
use covera_core::types::{Amount, PolicyOptions, ProductKind, PurchaseIntent, Wei};
use stages::PaymentStages;
use std::sync::Arc;

#[derive(Clone)]
pub struct PaymentOrchestrator {
    engine: FlowEngine,
    session: Arc<Session>,
    provider: Arc<IdentityProvider>,
    backend: Arc<dyn BackendEffects>,
    terms: PaymentTerms,
}

impl PaymentOrchestrator {
    pub fn new(
        engine: FlowEngine,
        session: Arc<Session>,
        provider: Arc<IdentityProvider>,
        backend: Arc<dyn BackendEffects>,
        terms: PaymentTerms,
    ) -> Self {
        Self {
            engine,
            session,
            provider,
            backend,
            terms,
        }
    }

    /// Buy a policy at its quoted price
    pub fn purchase(
        &self,
        product: ProductKind,
        options: PolicyOptions,
    ) -> Result<AttemptHandle, FlowError> {
        self.start(pricing::policy_intent(product, options)?)
    }

    /// Stake `amount` into the liquidity pool
    pub fn stake(&self, amount: Amount) -> Result<AttemptHandle, FlowError> {
        self.start(pricing::stake_intent(amount)?)
    }

    /// Start an attempt for a prepared intent
    pub fn start(&self, intent: PurchaseIntent) -> Result<AttemptHandle, FlowError> {
        if intent.price().is_zero() {
            return Err(FlowError::InvalidRequest {
                reason: "price must be positive".to_string(),
            });
        }
        let identity = self.session.identity().ok_or(FlowError::NoIdentity)?;
        let stages = PaymentStages {
            identity: identity.clone(),
            payer_wallet: self.session.payer_wallet(),
            provider: self.provider.clone(),
            backend: self.backend.clone(),
            terms: self.terms.clone(),
        };
        self.engine
            .start(identity.address, intent, Arc::new(stages), true)
    }

    /// Native value that paying for `intent` transfers
    pub fn payment_value(&self, intent: &PurchaseIntent) -> Wei {
        stages::payment_value(&self.terms, intent)
    }
}

impl std::fmt::Debug for PaymentOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentOrchestrator")
            .field("terms", &self.terms)
            .finish_non_exhaustive()
    }
}
