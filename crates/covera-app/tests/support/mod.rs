//! Shared harness for app integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use covera_app::{AppConfig, AttemptHandle, CoveraApp, IdentityRequest};
use covera_core::flow::{AttemptReport, AttemptState};
use covera_core::types::Identity;
use covera_testkit::{alice, MemoryKeyExporter, MockBackend, MockWallet, RecordingRenderer};
use std::sync::Arc;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(5);

pub struct Harness {
    pub app: CoveraApp,
    pub wallet: MockWallet,
    pub backend: MockBackend,
    pub keys: MemoryKeyExporter,
    pub renderer: RecordingRenderer,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.flow.confirmation_timeout_ms = 2_000;
    config.flow.narration_step_ms = 1;
    config.polling.portfolio_interval_ms = 20;
    config
}

/// App with a wallet exposing `alice()`
pub fn harness() -> Harness {
    harness_with(test_config(), MockWallet::new(alice()), true)
}

pub fn harness_with(config: AppConfig, wallet: MockWallet, attach_wallet: bool) -> Harness {
    let backend = MockBackend::new();
    let keys = MemoryKeyExporter::new();
    let renderer = RecordingRenderer::new();
    let mut builder = CoveraApp::builder(config)
        .backend(Arc::new(backend.clone()))
        .key_exporter(Arc::new(keys.clone()))
        .renderer(Arc::new(renderer.clone()));
    if attach_wallet {
        builder = builder.wallet(Arc::new(wallet.clone()));
    }
    Harness {
        app: builder.build().unwrap(),
        wallet,
        backend,
        keys,
        renderer,
    }
}

impl Harness {
    pub async fn login_external(&self) -> Identity {
        self.app.login(IdentityRequest::ExternalWallet).await.unwrap()
    }

    pub async fn login_local(&self) -> Identity {
        self.app
            .login(IdentityRequest::GenerateLocalKey)
            .await
            .unwrap()
    }
}

/// Wait for the terminal report
pub async fn settled(handle: &AttemptHandle) -> AttemptReport {
    tokio::time::timeout(DEADLINE, handle.outcome())
        .await
        .expect("attempt did not terminate")
}

/// Wait until the attempt enters `state`
pub async fn reach(handle: &AttemptHandle, state: AttemptState) -> AttemptReport {
    let report = tokio::time::timeout(DEADLINE, handle.wait_for_state(state))
        .await
        .expect("state not reached");
    assert_eq!(report.state, state, "attempt ended early: {report:?}");
    report
}

/// Poll `check` until it holds
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + DEADLINE;
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "condition never held");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
