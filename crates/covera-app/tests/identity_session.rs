#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]
//! Identity resolution and session revocation

mod support;

use assert_matches::assert_matches;
use covera_app::{CoveraApp, IdentityRequest};
use covera_core::errors::IdentityError;
use covera_core::flow::AttemptState;
use covera_core::types::{PolicyOptions, ProductKind, SigningCapability};
use covera_testkit::{alice, MemoryKeyExporter, MockBackend, MockWallet};
use std::sync::Arc;
use support::{harness, harness_with, reach, settled, test_config};

#[tokio::test]
async fn external_login_switches_network() {
    let h = harness();
    let identity = h.login_external().await;
    assert_eq!(identity.address, alice());
    assert_eq!(identity.capability, SigningCapability::ExternalWallet);
    assert_eq!(h.wallet.network_switches(), vec![5_042_002]);
    assert_eq!(h.app.identity(), Some(identity));
}

#[tokio::test]
async fn network_switch_failure_is_not_fatal() {
    let h = harness();
    h.wallet.fail_network_switch(covera_core::errors::WalletError::UserRejected);
    assert!(h.app.login(IdentityRequest::ExternalWallet).await.is_ok());
}

#[tokio::test]
async fn external_login_needs_a_provider_with_accounts() {
    let h = harness_with(test_config(), MockWallet::new(alice()), false);
    assert_matches!(
        h.app.login(IdentityRequest::ExternalWallet).await,
        Err(IdentityError::NoProviderAvailable { .. })
    );

    let h = harness_with(test_config(), MockWallet::with_accounts(Vec::new()), true);
    assert_matches!(
        h.app.login(IdentityRequest::ExternalWallet).await,
        Err(IdentityError::NoProviderAvailable { reason }) if reason.contains("no accounts")
    );

    let h = harness_with(test_config(), MockWallet::unavailable(), true);
    assert_matches!(
        h.app.login(IdentityRequest::ExternalWallet).await,
        Err(IdentityError::NoProviderAvailable { .. })
    );
    assert_eq!(h.app.identity(), None);
}

#[tokio::test]
async fn generated_key_is_exported_before_use() {
    let h = harness();
    let identity = h.login_local().await;
    assert_eq!(identity.capability, SigningCapability::LocalKey);

    let exported = h.keys.exported();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].address, identity.address);
    assert!(exported[0].private_key.starts_with("0x"));
}

#[tokio::test]
async fn failed_export_leaves_no_identity() {
    let app = CoveraApp::builder(test_config())
        .backend(Arc::new(MockBackend::new()))
        .key_exporter(Arc::new(MemoryKeyExporter::failing()))
        .build()
        .unwrap();
    assert_matches!(
        app.login(IdentityRequest::GenerateLocalKey).await,
        Err(IdentityError::ExportFailed { reason }) if reason.contains("disk full")
    );
    assert_eq!(app.identity(), None);
}

#[tokio::test]
async fn exported_bundle_imports_into_a_new_session() {
    let first = harness();
    let identity = first.login_local().await;
    let bundle = serde_json::to_string(&first.keys.exported()[0]).unwrap();

    let second = harness();
    let imported = second
        .app
        .login(IdentityRequest::ImportLocalKey(bundle))
        .await
        .unwrap();
    assert_eq!(imported, identity);
    // Importing does not export again
    assert!(second.keys.exported().is_empty());

    assert_matches!(
        second
            .app
            .login(IdentityRequest::ImportLocalKey("{}".to_string()))
            .await,
        Err(IdentityError::InvalidKeyMaterial { .. })
    );
    assert_eq!(second.app.identity(), Some(imported));
}

#[tokio::test]
async fn identity_switch_after_submission_cancels_and_ledgers() {
    let h = harness();
    h.login_external().await;
    h.wallet.hold_confirmations();

    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    reach(&handle, AttemptState::AwaitingConfirmation).await;

    let local = h.login_local().await;
    let report = settled(&handle).await;
    assert_eq!(report.state, AttemptState::Cancelled);
    assert_eq!(report.entries_of(AttemptState::Cancelled), 1);
    assert!(report.external_tx_ref.is_some());

    let unsettled = h.app.unsettled();
    assert_eq!(unsettled.len(), 1);
    assert_eq!(unsettled[0].external_tx_ref, report.external_tx_ref);
    assert_eq!(h.app.identity(), Some(local));
    assert!(h.backend.settlements().is_empty());
}

#[tokio::test]
async fn logout_during_choice_cancels_without_ledger() {
    let h = harness();
    h.login_local().await;

    let handle = h
        .app
        .purchase(ProductKind::Vehicle, PolicyOptions::default())
        .unwrap();
    reach(&handle, AttemptState::AwaitingMethodChoice).await;

    assert_eq!(h.app.logout(), vec![handle.id()]);
    let report = settled(&handle).await;
    assert_eq!(report.state, AttemptState::Cancelled);
    assert!(h.app.unsettled().is_empty());
    assert_eq!(h.app.identity(), None);
    // A second logout has nothing left to revoke
    assert!(h.app.logout().is_empty());
}

#[tokio::test]
async fn relogin_with_same_identity_keeps_attempts() {
    let h = harness();
    h.login_external().await;
    h.wallet.hold_sends();

    let handle = h
        .app
        .purchase(ProductKind::Health, PolicyOptions::default())
        .unwrap();
    reach(&handle, AttemptState::AwaitingSigning).await;

    h.login_external().await;
    tokio::task::yield_now().await;
    assert_eq!(handle.state(), AttemptState::AwaitingSigning);

    handle.cancel().unwrap();
    assert_eq!(settled(&handle).await.state, AttemptState::Cancelled);
}

#[tokio::test]
async fn logout_forgets_local_key() {
    let h = harness();
    h.login_local().await;
    h.app.logout();
    assert_eq!(h.app.identity(), None);
    assert_eq!(
        h.app
            .submit_claim("lost luggage", covera_core::types::Amount::from_cents(500))
            .unwrap_err(),
        covera_core::errors::FlowError::NoIdentity
    );
}
