#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]
//! Policy purchase and stake flows end to end against mock effects

mod support;

use assert_matches::assert_matches;
use covera_app::config::AppConfig;
use covera_core::errors::{BackendError, FlowError, WalletError};
use covera_core::flow::{AttemptState, FailureReason, FlowEvent, FlowKind, FundsStatus, MethodChoice};
use covera_core::types::{Amount, PaymentMethod, PolicyOptions, ProductKind, Wei};
use covera_testkit::alice;
use support::{eventually, harness, harness_with, reach, settled, test_config};

#[tokio::test]
async fn external_wallet_purchase_settles() {
    let h = harness();
    h.login_external().await;

    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    let report = settled(&handle).await;

    assert_eq!(report.state, AttemptState::Succeeded);
    assert_eq!(
        report.history,
        vec![
            AttemptState::Created,
            AttemptState::AwaitingSigning,
            AttemptState::Submitted,
            AttemptState::AwaitingConfirmation,
            AttemptState::Settling,
            AttemptState::Succeeded,
        ]
    );
    assert_eq!(report.method, Some(PaymentMethod::Wallet));
    assert_eq!(report.settlement.as_ref().unwrap().reference().as_str(), "POL-1");

    let config = AppConfig::default();
    let sent = h.wallet.sent_transactions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, alice());
    assert_eq!(sent[0].to, config.chain.pool_address);
    assert_eq!(sent[0].value, Wei::parse_ether("0.0001").unwrap());
    assert_eq!(sent[0].gas_limit, 100_000);
    assert_eq!(sent[0].data, None);

    let settlements = h.backend.settlements();
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0].wallet_address, alice());
    assert_eq!(settlements[0].product, ProductKind::Health);
    assert_eq!(settlements[0].amount, Amount::from_cents(50));
    assert_eq!(Some(&settlements[0].payment_tx), report.external_tx_ref.as_ref());

    // The renderer saw exactly the states the attempt went through
    assert_eq!(h.renderer.states_for(report.id), report.history);
    assert!(h.app.unsettled().is_empty());
}

#[tokio::test]
async fn local_key_chooses_wallet() {
    let h = harness();
    let identity = h.login_local().await;

    let handle = h
        .app
        .purchase(ProductKind::Vehicle, PolicyOptions::private())
        .unwrap();
    reach(&handle, AttemptState::AwaitingMethodChoice).await;
    assert_eq!(
        h.renderer.count(|e| matches!(
            e,
            FlowEvent::ChoiceRequested { request, .. }
                if request.options == vec![MethodChoice::Wallet, MethodChoice::Manual]
                    && request.price == Amount::from_cents(75)
        )),
        1
    );

    handle.resolve_choice(MethodChoice::Wallet).unwrap();
    let report = settled(&handle).await;
    assert_eq!(report.state, AttemptState::Succeeded);
    assert_eq!(report.method, Some(PaymentMethod::Wallet));

    // Paid from the wallet account, registered to the local identity
    assert_eq!(h.wallet.sent_transactions()[0].from, alice());
    let settlement = &h.backend.settlements()[0];
    assert_eq!(settlement.wallet_address, identity.address);
    assert!(settlement.is_private);
}

#[tokio::test]
async fn manual_payment_polls_until_seen() {
    let h = harness();
    let identity = h.login_local().await;
    h.backend.script_manual_polls([false, false, true]);

    let handle = h
        .app
        .purchase(
            ProductKind::Parametric,
            PolicyOptions::default().with_trigger("earthquake > 7.0"),
        )
        .unwrap();
    reach(&handle, AttemptState::AwaitingMethodChoice).await;
    assert_eq!(
        handle.confirm_manual_payment_sent(),
        Err(FlowError::NoManualPaymentPending)
    );
    handle.resolve_choice(MethodChoice::Manual).unwrap();
    assert_eq!(
        handle.resolve_choice(MethodChoice::Wallet),
        Err(FlowError::NoPendingChoice)
    );
    let signing = reach(&handle, AttemptState::AwaitingSigning).await;
    assert_eq!(signing.method, Some(PaymentMethod::Manual));

    eventually(|| {
        h.renderer.count(|e| {
            matches!(e, FlowEvent::ManualPaymentRequested { request, .. }
                if request.amount_label == "0.01 ARC ($1.20 USDC)"
                    && request.qr_payload.ends_with("@5042002?value=10000000000000000"))
        }) == 1
    })
    .await;

    for polls in 1..=2u32 {
        handle.confirm_manual_payment_sent().unwrap();
        eventually(|| {
            h.renderer.count(|e| matches!(e, FlowEvent::ManualPollNegative { .. })) == polls as usize
        })
        .await;
        assert_eq!(handle.state(), AttemptState::AwaitingSigning);
    }
    handle.confirm_manual_payment_sent().unwrap();

    let report = settled(&handle).await;
    assert_eq!(report.state, AttemptState::Succeeded);
    assert_eq!(report.external_tx_ref.as_ref().unwrap().as_str(), "0xmanual3");
    assert_eq!(h.backend.poll_count(), 3);
    assert_eq!(h.backend.poll_queries()[0].wallet_address, identity.address);
    assert!(h.wallet.sent_transactions().is_empty());

    let settlement = &h.backend.settlements()[0];
    assert_eq!(settlement.trigger.as_deref(), Some("earthquake > 7.0"));
    assert_eq!(h.renderer.states_for(report.id), report.history);
}

#[tokio::test]
async fn declining_the_choice_cancels_and_releases() {
    let h = harness();
    h.login_local().await;

    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    reach(&handle, AttemptState::AwaitingMethodChoice).await;
    handle.resolve_choice(MethodChoice::Decline).unwrap();

    let report = settled(&handle).await;
    assert_eq!(report.state, AttemptState::Cancelled);
    assert_eq!(report.external_tx_ref, None);
    assert!(h.wallet.sent_transactions().is_empty());
    assert!(h.app.unsettled().is_empty());

    // The identity is free again
    let again = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    reach(&again, AttemptState::AwaitingMethodChoice).await;
    again.cancel().unwrap();
    assert_eq!(settled(&again).await.state, AttemptState::Cancelled);
}

#[tokio::test]
async fn one_attempt_per_identity_until_cancelled() {
    let h = harness();
    h.login_external().await;
    h.wallet.hold_sends();

    let first = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    reach(&first, AttemptState::AwaitingSigning).await;

    assert_matches!(
        h.app.purchase(ProductKind::Vehicle, PolicyOptions::default()),
        Err(FlowError::AttemptInProgress { owner, active }) if owner == alice() && active == first.id()
    );
    assert_matches!(
        h.app.submit_claim("water damage", Amount::from_cents(10_000)),
        Err(FlowError::AttemptInProgress { .. })
    );

    first.cancel().unwrap();
    let report = settled(&first).await;
    assert_eq!(report.state, AttemptState::Cancelled);
    assert_eq!(report.entries_of(AttemptState::Cancelled), 1);
    assert!(h.app.unsettled().is_empty());

    let second = h
        .app
        .purchase(ProductKind::Vehicle, PolicyOptions::default())
        .unwrap();
    reach(&second, AttemptState::AwaitingSigning).await;
    second.cancel().unwrap();
    settled(&second).await;
}

#[tokio::test]
async fn cancel_refused_once_submitted() {
    let h = harness();
    h.login_external().await;
    h.wallet.hold_confirmations();

    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    reach(&handle, AttemptState::AwaitingConfirmation).await;
    assert_eq!(
        handle.cancel(),
        Err(FlowError::NotCancellable {
            state: AttemptState::AwaitingConfirmation
        })
    );
    assert_eq!(handle.state(), AttemptState::AwaitingConfirmation);
    h.app.shutdown();
}

#[tokio::test]
async fn cancel_racing_a_submission_still_cancels() {
    let h = harness();
    h.login_local().await;
    h.backend.script_manual_polls([true]);

    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    reach(&handle, AttemptState::AwaitingMethodChoice).await;
    handle.resolve_choice(MethodChoice::Manual).unwrap();
    reach(&handle, AttemptState::AwaitingSigning).await;

    // Both land before the runner is polled again: the poll completes,
    // then the accepted cancel is honoured
    handle.confirm_manual_payment_sent().unwrap();
    handle.cancel().unwrap();

    let report = settled(&handle).await;
    assert_eq!(report.state, AttemptState::Cancelled);
    assert_eq!(report.entries_of(AttemptState::Submitted), 0);
    assert_eq!(report.external_tx_ref.as_ref().unwrap().as_str(), "0xmanual1");
    assert!(h.backend.settlements().is_empty());
    assert_eq!(h.app.unsettled().len(), 1);
    assert_eq!(h.app.unsettled()[0].id, report.id);
}

#[tokio::test]
async fn confirmation_timeout_is_unsettled() {
    let mut config = test_config();
    config.flow.confirmation_timeout_ms = 50;
    let h = harness_with(config, covera_testkit::MockWallet::new(alice()), true);
    h.login_external().await;
    h.wallet.hold_confirmations();

    let handle = h
        .app
        .purchase(ProductKind::Vehicle, PolicyOptions::default())
        .unwrap();
    let report = settled(&handle).await;

    let failure = report.failure.clone().unwrap();
    assert_eq!(failure.reason, FailureReason::ConfirmationTimeout);
    assert_eq!(failure.funds, FundsStatus::InFlight);
    assert!(report.external_tx_ref.is_some());
    assert!(h.backend.settlements().is_empty());

    let unsettled = h.app.unsettled();
    assert_eq!(unsettled.len(), 1);
    assert_eq!(unsettled[0].id, report.id);
}

#[tokio::test]
async fn insufficient_balance_touches_nothing() {
    let h = harness();
    h.login_external().await;
    h.wallet.set_balance(&alice(), Wei(0));

    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    let report = settled(&handle).await;
    let failure = report.failure.unwrap();
    assert_eq!(failure.reason, FailureReason::InsufficientBalance);
    assert_eq!(failure.funds, FundsStatus::Untouched);
    assert!(failure.user_message().starts_with("Nothing was charged."));
    assert!(h.wallet.sent_transactions().is_empty());
    assert!(h.app.unsettled().is_empty());
}

#[tokio::test]
async fn wallet_refusals_map_to_failure_reasons() {
    let h = harness();
    h.login_external().await;

    h.wallet.fail_sends(WalletError::UserRejected);
    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    let report = settled(&handle).await;
    assert_eq!(report.failure.unwrap().reason, FailureReason::SigningRejected);
    assert_eq!(report.external_tx_ref, None);

    h.wallet.fail_sends(WalletError::Rejected {
        reason: "nonce too low".to_string(),
    });
    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    let report = settled(&handle).await;
    let failure = report.failure.unwrap();
    assert_eq!(failure.reason, FailureReason::SubmissionRejected);
    assert!(failure.message.contains("nonce too low"));
    assert!(h.backend.settlements().is_empty());
}

#[tokio::test]
async fn reverted_transaction_is_denied() {
    let h = harness();
    h.login_external().await;
    h.wallet.revert_transactions();

    let handle = h
        .app
        .purchase(ProductKind::Vehicle, PolicyOptions::default())
        .unwrap();
    let report = settled(&handle).await;
    assert_eq!(
        report.failure.unwrap().reason,
        FailureReason::ConfirmationDenied
    );
    assert!(h.backend.settlements().is_empty());
}

#[tokio::test]
async fn settlement_rejection_after_confirmation_keeps_reference() {
    let h = harness();
    h.login_external().await;
    h.backend.reject_settlements("policy registry full");

    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    let report = settled(&handle).await;

    let failure = report.failure.clone().unwrap();
    assert_eq!(
        failure.reason,
        FailureReason::SettlementRejectedAfterConfirmation
    );
    assert_eq!(failure.funds, FundsStatus::Moved);
    assert!(failure.message.contains("policy registry full"));
    assert!(failure.user_message().contains("registration did not complete"));
    assert_eq!(report.entries_of(AttemptState::Settling), 1);
    assert_eq!(h.backend.settlements().len(), 1);

    let unsettled = h.app.unsettled();
    assert_eq!(unsettled.len(), 1);
    assert_eq!(unsettled[0].external_tx_ref, report.external_tx_ref);
}

#[tokio::test]
async fn unreachable_backend_at_settlement_means_funds_moved() {
    let h = harness();
    h.login_external().await;
    h.backend.fail_settlements(BackendError::Unreachable {
        message: "connection refused".to_string(),
    });

    let handle = h
        .app
        .purchase(ProductKind::Parametric, PolicyOptions::default())
        .unwrap();
    let failure = settled(&handle).await.failure.unwrap();
    assert_eq!(failure.reason, FailureReason::BackendUnreachable);
    assert_eq!(failure.funds, FundsStatus::Moved);
    assert_eq!(h.app.unsettled().len(), 1);
}

#[tokio::test]
async fn stake_calls_the_contract() {
    let h = harness();
    h.login_external().await;

    let amount = Amount::parse("25").unwrap();
    let handle = h.app.stake(amount).unwrap();
    let report = settled(&handle).await;
    assert_eq!(report.state, AttemptState::Succeeded);
    assert_eq!(report.kind, FlowKind::Stake);

    let config = AppConfig::default();
    let sent = &h.wallet.sent_transactions()[0];
    assert_eq!(sent.to, config.chain.insurance_contract);
    assert_eq!(sent.value, Wei::parse_ether("25").unwrap());
    assert_eq!(sent.gas_limit, 120_000);
    assert_eq!(sent.data.as_deref(), Some("0x3a4b66f1"));

    let settlement = &h.backend.settlements()[0];
    assert_eq!(settlement.product, ProductKind::Stake);
    assert_eq!(settlement.amount, amount);
    assert_eq!(settlement.trigger, None);
}

#[tokio::test]
async fn manual_stake_asks_for_the_staked_amount() {
    let h = harness();
    h.login_local().await;
    h.backend.script_manual_polls([true]);

    let amount = Amount::parse("25").unwrap();
    let staked = Wei::parse_ether("25").unwrap();
    let handle = h.app.stake(amount).unwrap();
    reach(&handle, AttemptState::AwaitingMethodChoice).await;
    handle.resolve_choice(MethodChoice::Manual).unwrap();
    reach(&handle, AttemptState::AwaitingSigning).await;

    eventually(|| {
        h.renderer.count(|e| {
            matches!(e, FlowEvent::ManualPaymentRequested { request, .. }
                if request.amount_label == "25.0 ARC ($25.00 USDC)"
                    && request.qr_payload.ends_with("?value=25000000000000000000"))
        }) == 1
    })
    .await;
    handle.confirm_manual_payment_sent().unwrap();

    let report = settled(&handle).await;
    assert_eq!(report.state, AttemptState::Succeeded);
    assert_eq!(h.backend.poll_queries()[0].value, staked);
    assert_eq!(h.backend.settlements()[0].amount, amount);
    assert_eq!(h.app.payments().payment_value(&manual_stake_intent(amount)), staked);
}

fn manual_stake_intent(amount: Amount) -> covera_core::types::PurchaseIntent {
    covera_app::pricing::stake_intent(amount)
        .unwrap()
        .with_method(PaymentMethod::Manual)
}

#[tokio::test]
async fn invalid_requests_fail_synchronously() {
    let h = harness();
    assert_eq!(
        h.app
            .purchase(ProductKind::Health, PolicyOptions::default())
            .unwrap_err(),
        FlowError::NoIdentity
    );

    h.login_external().await;
    assert_matches!(h.app.stake(Amount::ZERO), Err(FlowError::InvalidRequest { .. }));
    assert_eq!(
        h.app
            .purchase(ProductKind::Stake, PolicyOptions::default())
            .unwrap_err(),
        FlowError::PriceUnavailable {
            product: ProductKind::Stake
        }
    );
    assert_eq!(h.app.session().in_flight(), 0);
}

#[tokio::test]
async fn attached_payer_wallet_skips_the_choice() {
    let h = harness();
    let identity = h.login_local().await;
    assert_eq!(h.app.attach_payer_wallet().await.unwrap(), alice());

    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    let report = settled(&handle).await;
    assert_eq!(report.state, AttemptState::Succeeded);
    assert_eq!(report.entries_of(AttemptState::AwaitingMethodChoice), 0);
    assert_eq!(h.wallet.sent_transactions()[0].from, alice());
    assert_eq!(h.backend.settlements()[0].wallet_address, identity.address);
}

#[tokio::test]
async fn revoked_wallet_authorization_expires_capability() {
    let h = harness();
    h.login_external().await;
    h.wallet.revoke_authorization();

    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    let failure = settled(&handle).await.failure.unwrap();
    assert_eq!(failure.reason, FailureReason::CapabilityExpired);
    assert_eq!(failure.funds, FundsStatus::Untouched);
    assert!(h.wallet.sent_transactions().is_empty());
}

#[tokio::test]
async fn preset_manual_method_is_honoured_for_external_identity() {
    let h = harness();
    h.login_external().await;
    h.backend.script_manual_polls([true]);

    let intent = covera_app::pricing::policy_intent(ProductKind::Health, PolicyOptions::default())
        .unwrap()
        .with_method(PaymentMethod::Manual);
    let handle = h.app.payments().start(intent).unwrap();
    reach(&handle, AttemptState::AwaitingSigning).await;
    handle.confirm_manual_payment_sent().unwrap();

    let report = settled(&handle).await;
    assert_eq!(report.state, AttemptState::Succeeded);
    assert_eq!(report.entries_of(AttemptState::AwaitingMethodChoice), 0);
    assert!(h.wallet.sent_transactions().is_empty());
}
