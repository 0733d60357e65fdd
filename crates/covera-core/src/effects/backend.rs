//! Backend API effects
//!
//! # Effect Classification
//!
//! - **Category**: Application Effect
//! - **Implementation**: `covera-http::HttpBackend`, `covera-testkit::MockBackend`
//! - **Usage**: settlement, manual payment polling, claims, evidence analysis,
//!   read-only views

use crate::errors::BackendError;
use crate::identifiers::Address;
use crate::types::{
    BlockchainProof, ClaimHistory, ClaimReceipt, ClaimRecord, ClaimStats, ClaimSubmission,
    EvidenceAnalysis, EvidenceFile, ManualPaymentQuery, ManualPaymentStatus, ParametricEvent,
    ParametricOutcome, PolicyPortfolio, PoolSnapshot, ProtocolEvent, SettlementRequest,
    SettlementResponse,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Backend operations used by the flows and the portfolio poller
#[async_trait]
pub trait BackendEffects: Send + Sync {
    /// Register a confirmed payment as a policy or a stake
    async fn create_policy_or_stake(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementResponse, BackendError>;

    /// Ask whether a manual transfer has been observed
    async fn poll_manual_payment(
        &self,
        query: &ManualPaymentQuery,
    ) -> Result<ManualPaymentStatus, BackendError>;

    /// Submit a claim for assessment
    async fn submit_claim(&self, claim: &ClaimSubmission) -> Result<ClaimReceipt, BackendError>;

    /// Fetch one stored claim
    async fn fetch_claim(&self, claim_id: &str) -> Result<ClaimRecord, BackendError>;

    /// Feed a sensor event to the parametric oracle
    async fn simulate_parametric(
        &self,
        event: &ParametricEvent,
    ) -> Result<ParametricOutcome, BackendError>;

    /// Upload one evidence file for damage assessment
    async fn analyze_evidence(&self, file: &EvidenceFile) -> Result<EvidenceAnalysis, BackendError>;

    /// Policies held by `owner`
    async fn fetch_policies(&self, owner: &Address) -> Result<PolicyPortfolio, BackendError>;

    /// Pool figures, with the caller's position when `owner` is given
    async fn fetch_pool(&self, owner: Option<&Address>) -> Result<PoolSnapshot, BackendError>;

    /// Latest protocol activity
    async fn fetch_events(&self, limit: usize) -> Result<Vec<ProtocolEvent>, BackendError>;

    /// Claim statistics of `owner`
    async fn fetch_stats(&self, owner: &Address) -> Result<ClaimStats, BackendError>;

    /// Claims filed by `owner`
    async fn fetch_claim_history(&self, owner: &Address) -> Result<ClaimHistory, BackendError>;

    /// On-chain decision proofs for `owner`
    async fn fetch_proofs(&self, owner: &Address) -> Result<Vec<BlockchainProof>, BackendError>;
}

/// Blanket implementation for Arc<T> where T: BackendEffects
#[async_trait]
impl<T: BackendEffects + ?Sized> BackendEffects for Arc<T> {
    async fn create_policy_or_stake(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementResponse, BackendError> {
        (**self).create_policy_or_stake(request).await
    }

    async fn poll_manual_payment(
        &self,
        query: &ManualPaymentQuery,
    ) -> Result<ManualPaymentStatus, BackendError> {
        (**self).poll_manual_payment(query).await
    }

    async fn submit_claim(&self, claim: &ClaimSubmission) -> Result<ClaimReceipt, BackendError> {
        (**self).submit_claim(claim).await
    }

    async fn fetch_claim(&self, claim_id: &str) -> Result<ClaimRecord, BackendError> {
        (**self).fetch_claim(claim_id).await
    }

    async fn simulate_parametric(
        &self,
        event: &ParametricEvent,
    ) -> Result<ParametricOutcome, BackendError> {
        (**self).simulate_parametric(event).await
    }

    async fn analyze_evidence(&self, file: &EvidenceFile) -> Result<EvidenceAnalysis, BackendError> {
        (**self).analyze_evidence(file).await
    }

    async fn fetch_policies(&self, owner: &Address) -> Result<PolicyPortfolio, BackendError> {
        (**self).fetch_policies(owner).await
    }

    async fn fetch_pool(&self, owner: Option<&Address>) -> Result<PoolSnapshot, BackendError> {
        (**self).fetch_pool(owner).await
    }

    async fn fetch_events(&self, limit: usize) -> Result<Vec<ProtocolEvent>, BackendError> {
        (**self).fetch_events(limit).await
    }

    async fn fetch_stats(&self, owner: &Address) -> Result<ClaimStats, BackendError> {
        (**self).fetch_stats(owner).await
    }

    async fn fetch_claim_history(&self, owner: &Address) -> Result<ClaimHistory, BackendError> {
        (**self).fetch_claim_history(owner).await
    }

    async fn fetch_proofs(&self, owner: &Address) -> Result<Vec<BlockchainProof>, BackendError> {
        (**self).fetch_proofs(owner).await
    }
}
