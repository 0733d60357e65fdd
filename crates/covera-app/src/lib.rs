//! Covera Application Core
//!
//! Portable, frontend-agnostic application logic: the session identity,
//! the transaction flow engine and every flow built on it (policy purchase,
//! staking, claims with evidence analysis, parametric events), background
//! read-model refresh and view routing. Frontends supply effect handlers
//! and a renderer and drive everything through [`CoveraApp`].
//!
//! ```rust,ignore
//! let app = CoveraApp::builder(config)
//!     .wallet(Arc::new(wallet))
//!     .backend(Arc::new(backend))
//!     .renderer(Arc::new(renderer))
//!     .build()?;
//! app.login(IdentityRequest::ExternalWallet).await?;
//! let attempt = app.purchase(ProductKind::Health, PolicyOptions::default())?;
//! let report = attempt.outcome().await;
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::disallowed_types)]

pub mod claims;
pub mod config;
pub mod flow;
pub mod identity;
pub mod parametric;
pub mod payment;
pub mod polling;
pub mod pool;
pub mod pricing;
pub mod router;
pub mod session;
pub mod tasks;

pub use claims::ClaimFlow;
pub use config::AppConfig;
pub use flow::{AttemptHandle, EventSink, FlowEngine};
pub use identity::{FileKeyExporter, IdentityProvider, IdentityRequest, SigningHandle};
pub use parametric::ParametricFlow;
pub use payment::PaymentOrchestrator;
pub use polling::{PortfolioPoller, PortfolioView};
pub use pool::{PoolPosition, StakeProjection};
pub use router::{Router, ViewId};
pub use session::Session;
pub use tasks::TaskRegistry;

use covera_core::effects::{
    BackendEffects, KeyExportEffects, NullRenderer, Renderer, WalletEffects,
};
use covera_core::errors::{BackendError, CoveraError, FlowError, IdentityError};
use covera_core::flow::{AttemptReport, FlowEvent};
use covera_core::identifiers::{Address, AttemptId};
use covera_core::types::{
    Amount, ClaimRecord, EvidenceAnalysis, EvidenceFile, Identity, PolicyOptions, ProductKind,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Assembles a [`CoveraApp`] from configuration and effect handlers
pub struct CoveraAppBuilder {
    config: AppConfig,
    wallet: Option<Arc<dyn WalletEffects>>,
    backend: Option<Arc<dyn BackendEffects>>,
    exporter: Option<Arc<dyn KeyExportEffects>>,
    renderer: Arc<dyn Renderer>,
}

impl CoveraAppBuilder {
    /// Wallet provider; without one only local keys and manual payment work
    pub fn wallet(mut self, wallet: Arc<dyn WalletEffects>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Backend API (required)
    pub fn backend(mut self, backend: Arc<dyn BackendEffects>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Key bundle exporter; defaults to files under `identity.key_dir`
    pub fn key_exporter(mut self, exporter: Arc<dyn KeyExportEffects>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Validate the configuration and wire the app
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(self) -> Result<CoveraApp, CoveraError> {
        self.config.validate()?;
        let backend = self
            .backend
            .ok_or_else(|| CoveraError::invalid("a backend handler is required"))?;
        let terms = self.config.chain.payment_terms()?;
        let exporter = self.exporter.unwrap_or_else(|| {
            Arc::new(FileKeyExporter::new(self.config.identity.key_dir.clone()))
        });

        let session = Session::new();
        let tasks = Arc::new(TaskRegistry::new());
        let events = EventSink::new(self.renderer, self.config.flow.event_buffer);
        let provider = Arc::new(IdentityProvider::new(
            self.wallet,
            exporter,
            self.config.chain.network.clone(),
        ));
        let engine = FlowEngine::new(
            session.clone(),
            events.clone(),
            tasks.clone(),
            self.config.flow.confirmation_timeout(),
        );
        let narration = flow::NarrationFeed::new(
            events.clone(),
            tasks.clone(),
            self.config.flow.narration_step(),
        );

        let payments = PaymentOrchestrator::new(
            engine.clone(),
            session.clone(),
            provider.clone(),
            backend.clone(),
            terms,
        );
        let claims = ClaimFlow::new(
            engine.clone(),
            session.clone(),
            provider.clone(),
            backend.clone(),
            narration.clone(),
        );
        let parametric = ParametricFlow::new(
            engine,
            session.clone(),
            backend.clone(),
            narration,
            self.config.identity.demo_address.clone(),
        );
        let poller = PortfolioPoller::new(
            backend.clone(),
            session.clone(),
            self.config.polling.interval(),
            self.config.polling.events_limit,
        );

        tracing::info!(
            api_url = %self.config.backend.api_url,
            chain_id = self.config.chain.network.chain_id,
            "Covera app ready"
        );
        Ok(CoveraApp {
            config: self.config,
            session,
            provider,
            backend,
            events,
            tasks,
            payments,
            claims,
            parametric,
            poller,
            router: Mutex::new(Router::new()),
        })
    }
}

/// Application facade
pub struct CoveraApp {
    config: AppConfig,
    session: Arc<Session>,
    provider: Arc<IdentityProvider>,
    backend: Arc<dyn BackendEffects>,
    events: EventSink,
    tasks: Arc<TaskRegistry>,
    payments: PaymentOrchestrator,
    claims: ClaimFlow,
    parametric: ParametricFlow,
    poller: Arc<PortfolioPoller>,
    router: Mutex<Router>,
}

impl CoveraApp {
    pub fn builder(config: AppConfig) -> CoveraAppBuilder {
        CoveraAppBuilder {
            config,
            wallet: None,
            backend: None,
            exporter: None,
            renderer: Arc::new(NullRenderer),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    // ---------------------------------------------------------------------
    // Identity
    // ---------------------------------------------------------------------

    /// Resolve an identity and make it the session identity
    ///
    /// A different previous identity has its running attempts revoked.
    pub async fn login(&self, request: IdentityRequest) -> Result<Identity, IdentityError> {
        let identity = self.provider.resolve_identity(request).await?;
        let previous = self.session.identity();
        let revoked = self.session.replace(identity.clone());
        if !revoked.is_empty() {
            tracing::info!(count = revoked.len(), "Attempts revoked by identity switch");
        }
        if let Some(previous) = previous.filter(|p| p.is_local() && p != &identity) {
            self.provider.forget(&previous.address);
        }
        Ok(identity)
    }

    /// Clear the session identity; returns the revoked attempts
    pub fn logout(&self) -> Vec<AttemptId> {
        if let Some(identity) = self.session.identity().filter(Identity::is_local) {
            self.provider.forget(&identity.address);
        }
        self.session.clear()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.session.identity()
    }

    /// Connect the wallet as payer for a local-key identity
    pub async fn attach_payer_wallet(&self) -> Result<Address, IdentityError> {
        let payer = self.provider.resolve_payer().await?;
        tracing::info!(payer = %payer, "Payer wallet attached");
        self.session.set_payer_wallet(Some(payer.clone()));
        Ok(payer)
    }

    pub fn detach_payer_wallet(&self) {
        self.session.set_payer_wallet(None);
    }

    // ---------------------------------------------------------------------
    // Flows
    // ---------------------------------------------------------------------

    pub fn purchase(
        &self,
        product: ProductKind,
        options: PolicyOptions,
    ) -> Result<AttemptHandle, FlowError> {
        self.payments.purchase(product, options)
    }

    pub fn stake(&self, amount: Amount) -> Result<AttemptHandle, FlowError> {
        self.payments.stake(amount)
    }

    pub fn payments(&self) -> &PaymentOrchestrator {
        &self.payments
    }

    pub fn submit_claim(
        &self,
        description: &str,
        amount: Amount,
    ) -> Result<AttemptHandle, FlowError> {
        self.claims.submit(description, amount)
    }

    /// Have the backend assess an evidence file
    ///
    /// Read-only: no attempt is started. A positive estimate comes back as
    /// the amount to pre-fill the claim with.
    pub async fn analyze_evidence(
        &self,
        file: &EvidenceFile,
    ) -> Result<(EvidenceAnalysis, Option<Amount>), BackendError> {
        let analysis = self.backend.analyze_evidence(file).await?;
        let suggested = analysis.suggested_claim_amount();
        tracing::info!(
            file = %file.file_name,
            bytes = file.bytes.len(),
            severity = ?analysis.severity_score,
            fraud = analysis.fraud_indicator,
            suggested = ?suggested.map(|amount| amount.to_string()),
            "Evidence analysed"
        );
        Ok((analysis, suggested))
    }

    pub fn simulate_event(&self, event_key: &str) -> Result<AttemptHandle, FlowError> {
        self.parametric.simulate(event_key)
    }

    /// Attempts whose funds may need reconciliation
    pub fn unsettled(&self) -> Vec<AttemptReport> {
        self.session.unsettled()
    }

    // ---------------------------------------------------------------------
    // Read models
    // ---------------------------------------------------------------------

    pub async fn claim_detail(&self, claim_id: &str) -> Result<ClaimRecord, BackendError> {
        self.backend.fetch_claim(claim_id).await
    }

    /// Projection for staking `amount` at the current pool size
    pub fn stake_projection(&self, amount: f64) -> StakeProjection {
        let latest = self.poller.latest();
        let (total_locked, apy) = latest
            .pool
            .as_ref()
            .map(|p| (p.total_locked, pool::snapshot_apy(p)))
            .unwrap_or((pool::FALLBACK_TVL, pool::DEFAULT_APY));
        StakeProjection::compute(amount, total_locked, apy)
    }

    /// Position of the session identity, once the pool has been read
    pub fn pool_position(&self) -> Option<PoolPosition> {
        self.poller
            .latest()
            .pool
            .map(|p| PoolPosition::from_snapshot(&p, pool::snapshot_apy(&p)))
    }

    pub async fn refresh_portfolio(&self) -> PortfolioView {
        self.poller.refresh_once().await
    }

    pub fn portfolio(&self) -> watch::Receiver<PortfolioView> {
        self.poller.subscribe()
    }

    pub fn start_polling(&self) {
        self.poller.start(&self.tasks);
    }

    // ---------------------------------------------------------------------
    // Routing
    // ---------------------------------------------------------------------

    pub fn navigate(&self, key: &str) -> ViewId {
        self.router.lock().navigate(key)
    }

    pub fn on_external_navigation(&self, key: &str) -> ViewId {
        self.router.lock().on_external_navigation(key)
    }

    pub fn current_view(&self) -> ViewId {
        self.router.lock().current().clone()
    }

    /// Stop runners, narration and polling
    pub fn shutdown(&self) {
        tracing::info!(tasks = self.tasks.active(), "Shutting down");
        self.tasks.shutdown();
    }
}

impl std::fmt::Debug for CoveraApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoveraApp")
            .field("identity", &self.session.identity())
            .field("tasks", &self.tasks.active())
            .finish_non_exhaustive()
    }
}
