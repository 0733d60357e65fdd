//! Background portfolio refresh
//!
//! Periodically pulls the read models for the session identity and
//! publishes them as one `PortfolioView`. Read failures keep the previous
//! values and are logged.

use crate::session::Session;
use crate::tasks::TaskRegistry;
use covera_core::effects::BackendEffects;
use covera_core::errors::BackendError;
use covera_core::identifiers::Address;
use covera_core::types::{
    BlockchainProof, ClaimRecord, ClaimStats, PolicyPortfolio, PoolSnapshot, ProtocolEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Latest read models
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioView {
    /// Identity the owner-scoped fields belong to
    pub owner: Option<Address>,
    /// Pool figures
    pub pool: Option<PoolSnapshot>,
    /// Policies of the owner
    pub portfolio: Option<PolicyPortfolio>,
    /// Claim statistics of the owner
    pub stats: Option<ClaimStats>,
    /// Claim history of the owner
    pub claims: Vec<ClaimRecord>,
    /// On-chain decision proofs of the owner
    pub proofs: Vec<BlockchainProof>,
    /// Recent protocol activity
    pub events: Vec<ProtocolEvent>,
    /// Completed refreshes
    pub refreshes: u64,
}

pub struct PortfolioPoller {
    backend: Arc<dyn BackendEffects>,
    session: Arc<Session>,
    interval: Duration,
    events_limit: usize,
    tx: watch::Sender<PortfolioView>,
}

fn keep<T>(label: &str, result: Result<T, BackendError>, previous: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(read = label, error = %e, "Read model refresh failed");
            previous
        }
    }
}

impl PortfolioPoller {
    pub fn new(
        backend: Arc<dyn BackendEffects>,
        session: Arc<Session>,
        interval: Duration,
        events_limit: usize,
    ) -> Arc<Self> {
        let (tx, _) = watch::channel(PortfolioView::default());
        Arc::new(Self {
            backend,
            session,
            interval,
            events_limit,
            tx,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<PortfolioView> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> PortfolioView {
        self.tx.borrow().clone()
    }

    /// Refresh every read model once
    pub async fn refresh_once(&self) -> PortfolioView {
        let owner = self.session.identity().map(|identity| identity.address);
        let mut view = self.latest();
        if view.owner != owner {
            // Owner-scoped data of the previous identity must not leak
            view = PortfolioView {
                refreshes: view.refreshes,
                pool: view.pool,
                events: view.events,
                ..PortfolioView::default()
            };
        }

        let (pool, events) = futures::join!(
            self.backend.fetch_pool(owner.as_ref()),
            self.backend.fetch_events(self.events_limit),
        );
        view.pool = keep("pool", pool.map(Some), view.pool);
        view.events = keep("events", events, view.events);

        if let Some(owner) = &owner {
            let (policies, stats, history, proofs) = futures::join!(
                self.backend.fetch_policies(owner),
                self.backend.fetch_stats(owner),
                self.backend.fetch_claim_history(owner),
                self.backend.fetch_proofs(owner),
            );
            view.portfolio = keep("policies", policies.map(Some), view.portfolio);
            view.stats = keep("stats", stats.map(Some), view.stats);
            view.claims = keep(
                "claims",
                history.map(|history| history.claims),
                view.claims,
            );
            view.proofs = keep("proofs", proofs, view.proofs);
        }
        view.owner = owner;
        view.refreshes += 1;
        self.tx.send_replace(view.clone());
        view
    }

    /// Refresh on every interval tick until shutdown
    pub fn start(self: &Arc<Self>, tasks: &TaskRegistry) {
        let poller = Arc::clone(self);
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Portfolio polling started");
        tasks.spawn_interval_until(self.interval, move || {
            let poller = poller.clone();
            async move {
                poller.refresh_once().await;
                true
            }
        });
    }
}

impl std::fmt::Debug for PortfolioPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioPoller")
            .field("interval", &self.interval)
            .field("events_limit", &self.events_limit)
            .finish_non_exhaustive()
    }
}
