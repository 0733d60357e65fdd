//! Payment stages for policy purchases and stakes

use crate::config::PaymentTerms;
use crate::flow::{FlowStages, MethodRequirement, StageContext, StageError};
use crate::identity::IdentityProvider;
use async_trait::async_trait;
use covera_core::effects::{BackendEffects, Confirmation, TransactionRequest, WalletEffects};
use covera_core::errors::{IdentityError, WalletError};
use covera_core::flow::{
    ChoiceRequest, Failure, FailureReason, FlowEvent, FundsStatus, ManualPaymentRequest,
    MethodChoice,
};
use covera_core::identifiers::{Address, TxRef};
use covera_core::types::{
    Identity, ManualPaymentQuery, PaymentMethod, ProductKind, PurchaseIntent, SettlementRecord,
    SettlementRequest, Wei,
};
use std::sync::Arc;

/// Map an identity failure into the attempt failure taxonomy
pub(crate) fn identity_failure(err: IdentityError) -> Failure {
    let reason = match &err {
        IdentityError::NoProviderAvailable { .. } => FailureReason::NoProviderAvailable,
        IdentityError::InvalidKeyMaterial { .. } | IdentityError::ExportFailed { .. } => {
            FailureReason::InvalidKeyMaterial
        }
        IdentityError::CapabilityExpired { .. } => FailureReason::CapabilityExpired,
    };
    Failure::untouched(reason, err.to_string())
}

/// Stages bound to the identity and payer captured at start
pub(crate) struct PaymentStages {
    pub(crate) identity: Identity,
    pub(crate) payer_wallet: Option<Address>,
    pub(crate) provider: Arc<IdentityProvider>,
    pub(crate) backend: Arc<dyn BackendEffects>,
    pub(crate) terms: PaymentTerms,
}

impl PaymentStages {
    fn transaction_for(&self, intent: &PurchaseIntent, from: Address) -> TransactionRequest {
        if intent.product() == ProductKind::Stake {
            TransactionRequest {
                from,
                to: self.terms.insurance_contract.clone(),
                value: intent.price().to_wei(),
                gas_limit: self.terms.stake_gas_limit,
                data: Some(self.terms.stake_call_data.clone()),
            }
        } else {
            TransactionRequest {
                from,
                to: self.terms.pool_address.clone(),
                value: self.terms.policy_value,
                gas_limit: self.terms.policy_gas_limit,
                data: None,
            }
        }
    }

    /// Account that signs the payment
    async fn payer(&self) -> Result<(Arc<dyn WalletEffects>, Address), Failure> {
        let wallet = self.provider.wallet().ok_or_else(|| {
            Failure::untouched(
                FailureReason::NoProviderAvailable,
                "no wallet provider configured",
            )
        })?;
        let address = if !self.identity.is_local() {
            self.provider
                .get_signing_handle(&self.identity)
                .await
                .map_err(identity_failure)?
                .address()
                .clone()
        } else if let Some(payer) = &self.payer_wallet {
            payer.clone()
        } else {
            self.provider
                .resolve_payer()
                .await
                .map_err(identity_failure)?
        };
        Ok((wallet, address))
    }

    async fn pay_with_wallet(&self, intent: &PurchaseIntent) -> Result<TxRef, StageError> {
        let (wallet, from) = self.payer().await?;
        self.provider.ensure_network(wallet.as_ref()).await;
        let request = self.transaction_for(intent, from);

        match wallet.get_balance(&request.from).await {
            Ok(balance) if balance < request.value => {
                return Err(Failure::untouched(
                    FailureReason::InsufficientBalance,
                    format!(
                        "balance {} {} is below {} {}",
                        balance.format_ether(),
                        self.terms.network.native_symbol,
                        request.value.format_ether(),
                        self.terms.network.native_symbol
                    ),
                )
                .into())
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(payer = %request.from, error = %e, "Balance check skipped"),
        }

        tracing::info!(
            from = %request.from,
            to = %request.to,
            value = %request.value.format_ether(),
            gas_limit = request.gas_limit,
            "Requesting wallet signature"
        );
        wallet.send_transaction(&request).await.map_err(|e| {
            let reason = match e {
                WalletError::UserRejected => FailureReason::SigningRejected,
                _ => FailureReason::SubmissionRejected,
            };
            Failure::untouched(reason, e.to_string()).into()
        })
    }

    async fn pay_manually(
        &self,
        ctx: &mut StageContext,
        intent: &PurchaseIntent,
    ) -> Result<TxRef, StageError> {
        let value = payment_value(&self.terms, intent);
        let label = format!(
            "{} {} (${} USDC)",
            value.format_ether(),
            self.terms.network.native_symbol,
            intent.price()
        );
        ctx.emit(FlowEvent::ManualPaymentRequested {
            attempt_id: ctx.attempt_id(),
            request: ManualPaymentRequest::new(
                self.terms.pool_address.clone(),
                self.terms.network.chain_id,
                value,
                label,
            ),
        });

        let query = ManualPaymentQuery {
            wallet_address: ctx.owner().clone(),
            pay_to: self.terms.pool_address.clone(),
            value,
            chain_id: self.terms.network.chain_id,
        };
        let mut polls = 0u32;
        loop {
            if !ctx.manual_payment_sent().await {
                return Err(StageError::Cancelled);
            }
            polls += 1;
            match self.backend.poll_manual_payment(&query).await {
                Ok(status) if status.received => {
                    let tx = status
                        .tx_hash
                        .unwrap_or_else(|| format!("manual-{}", ctx.attempt_id().uuid()));
                    tracing::info!(attempt_id = %ctx.attempt_id(), polls, tx = %tx, "Manual payment observed");
                    return Ok(TxRef::new(tx));
                }
                Ok(_) => {
                    tracing::debug!(attempt_id = %ctx.attempt_id(), polls, "Manual payment not seen yet");
                }
                Err(e) => {
                    tracing::warn!(attempt_id = %ctx.attempt_id(), polls, error = %e, "Manual payment poll failed");
                }
            }
            ctx.emit(FlowEvent::ManualPollNegative {
                attempt_id: ctx.attempt_id(),
                polls,
            });
        }
    }
}

#[async_trait]
impl FlowStages<PurchaseIntent> for PaymentStages {
    fn method_requirement(&self, intent: &PurchaseIntent) -> MethodRequirement {
        if intent.method() != PaymentMethod::Auto {
            return MethodRequirement::Preset;
        }
        if self.identity.is_local() && self.payer_wallet.is_none() {
            MethodRequirement::Choose(ChoiceRequest {
                product: intent.product(),
                price: intent.price(),
                options: vec![MethodChoice::Wallet, MethodChoice::Manual],
            })
        } else {
            MethodRequirement::Implied(PaymentMethod::Wallet)
        }
    }

    async fn sign_and_submit(
        &self,
        ctx: &mut StageContext,
        intent: &PurchaseIntent,
    ) -> Result<TxRef, StageError> {
        match intent.method() {
            PaymentMethod::Wallet => self.pay_with_wallet(intent).await,
            PaymentMethod::Manual => self.pay_manually(ctx, intent).await,
            PaymentMethod::Auto => Err(Failure::untouched(
                FailureReason::SubmissionRejected,
                "payment method unresolved",
            )
            .into()),
        }
    }

    async fn await_confirmation(
        &self,
        _ctx: &StageContext,
        intent: &PurchaseIntent,
        tx: &TxRef,
    ) -> Result<(), StageError> {
        // A positive manual poll already means the backend saw the transfer
        if intent.method() == PaymentMethod::Manual {
            return Ok(());
        }
        let wallet = self.provider.wallet().ok_or_else(|| {
            Failure::new(
                FailureReason::ConfirmationDenied,
                FundsStatus::InFlight,
                "wallet provider disappeared",
            )
        })?;
        match wallet.wait_for_confirmation(tx).await {
            Ok(Confirmation::Confirmed { block_number }) => {
                tracing::info!(tx = %tx, block_number, "Payment confirmed");
                Ok(())
            }
            Ok(Confirmation::Reverted) => Err(Failure::untouched(
                FailureReason::ConfirmationDenied,
                format!("{tx} reverted"),
            )
            .into()),
            Err(e) => Err(Failure::new(
                FailureReason::ConfirmationDenied,
                FundsStatus::InFlight,
                e.to_string(),
            )
            .into()),
        }
    }

    async fn settle(
        &self,
        ctx: &StageContext,
        intent: &PurchaseIntent,
        tx: &TxRef,
    ) -> Result<SettlementRecord, StageError> {
        let request = SettlementRequest::from_intent(ctx.owner(), intent, tx);
        match self.backend.create_policy_or_stake(&request).await {
            Ok(response) if response.success => {
                let reference = response.reference(tx);
                let on_chain = response
                    .on_chain_tx
                    .clone()
                    .unwrap_or_else(|| tx.to_string());
                tracing::info!(attempt_id = %ctx.attempt_id(), reference = %reference, "Settlement registered");
                let record = SettlementRecord::new(reference, on_chain);
                Ok(match response.message {
                    Some(note) => record.with_note(note),
                    None => record,
                })
            }
            Ok(response) => Err(Failure::funds_moved(
                FailureReason::SettlementRejectedAfterConfirmation,
                response
                    .message
                    .unwrap_or_else(|| "backend refused registration".to_string()),
            )
            .into()),
            Err(e) => Err(Failure::funds_moved(FailureReason::BackendUnreachable, e.to_string()).into()),
        }
    }
}

/// Value actually transferred for `intent`
pub(crate) fn payment_value(terms: &PaymentTerms, intent: &PurchaseIntent) -> Wei {
    // A stake moves the staked amount whichever way it is paid
    match (intent.product(), intent.method()) {
        (ProductKind::Stake, _) => intent.price().to_wei(),
        (_, PaymentMethod::Manual) => terms.manual_value,
        _ => terms.policy_value,
    }
}
