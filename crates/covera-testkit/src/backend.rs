//! Scriptable backend API
//!
//! Settlement succeeds and manual polls come back negative unless scripted
//! otherwise. Every call is recorded so tests can assert on call counts.

#![allow(clippy::disallowed_types)]

use async_trait::async_trait;
use covera_core::effects::BackendEffects;
use covera_core::errors::BackendError;
use covera_core::identifiers::Address;
use covera_core::types::{
    BlockchainProof, ClaimDecision, ClaimHistory, ClaimReceipt, ClaimRecord, ClaimStats,
    ClaimSubmission, EvidenceAnalysis, EvidenceFile, ManualPaymentQuery, ManualPaymentStatus,
    ParametricEvent, ParametricOutcome, PolicyPortfolio, PoolSnapshot, ProtocolEvent,
    SettlementRequest, SettlementResponse,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct BackendState {
    unreachable: bool,
    settlement: Option<Result<SettlementResponse, BackendError>>,
    settlements: Vec<SettlementRequest>,
    polls: VecDeque<bool>,
    poll_queries: Vec<ManualPaymentQuery>,
    claim_decision: String,
    thinking_steps: Vec<String>,
    claims: Vec<ClaimSubmission>,
    claim_fetches: u32,
    parametric: ParametricOutcome,
    parametric_events: Vec<ParametricEvent>,
    evidence: EvidenceAnalysis,
    evidence_uploads: Vec<EvidenceFile>,
    pool: PoolSnapshot,
    portfolio: PolicyPortfolio,
    events: Vec<ProtocolEvent>,
    stats: ClaimStats,
    proofs: Vec<BlockchainProof>,
    read_calls: u32,
}

/// In-memory backend with scriptable outcomes
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<Mutex<BackendState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Backend that accepts every settlement
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState {
                unreachable: false,
                settlement: None,
                settlements: Vec::new(),
                polls: VecDeque::new(),
                poll_queries: Vec::new(),
                claim_decision: "approve".to_string(),
                thinking_steps: vec![
                    "Reading claim description".to_string(),
                    "Scoring fraud signals".to_string(),
                ],
                claims: Vec::new(),
                claim_fetches: 0,
                parametric: ParametricOutcome {
                    payout_executed: true,
                    settlement_tx: Some("0xpayout".to_string()),
                    message: None,
                },
                parametric_events: Vec::new(),
                evidence: EvidenceAnalysis {
                    severity_score: Some(6.0),
                    estimated_amount: Some(850.0),
                    fraud_indicator: false,
                    summary: Some("Rear bumper damage consistent with a low-speed impact".to_string()),
                    damage_description: None,
                },
                evidence_uploads: Vec::new(),
                pool: PoolSnapshot {
                    total_locked: 14_250_000.0,
                    yield_rate: 12.4,
                    user_stake: None,
                    user_rewards: None,
                },
                portfolio: PolicyPortfolio::default(),
                events: Vec::new(),
                stats: ClaimStats::default(),
                proofs: Vec::new(),
                read_calls: 0,
            })),
        }
    }

    /// Fail every call with `Unreachable`
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    /// Answer settlements with `success: false`
    pub fn reject_settlements(&self, message: &str) {
        self.state.lock().unwrap().settlement = Some(Ok(SettlementResponse {
            success: false,
            policy_id: None,
            on_chain_tx: None,
            message: Some(message.to_string()),
        }));
    }

    /// Answer settlements with an error
    pub fn fail_settlements(&self, error: BackendError) {
        self.state.lock().unwrap().settlement = Some(Err(error));
    }

    /// Queue manual poll answers; exhausted scripts answer `false`
    pub fn script_manual_polls(&self, answers: impl IntoIterator<Item = bool>) {
        self.state.lock().unwrap().polls.extend(answers);
    }

    /// Decision string returned for claims
    pub fn set_claim_decision(&self, decision: &str) {
        self.state.lock().unwrap().claim_decision = decision.to_string();
    }

    /// Oracle verdict for parametric events
    pub fn set_parametric_outcome(&self, outcome: ParametricOutcome) {
        self.state.lock().unwrap().parametric = outcome;
    }

    /// Assessment returned for evidence uploads
    pub fn set_evidence_analysis(&self, analysis: EvidenceAnalysis) {
        self.state.lock().unwrap().evidence = analysis;
    }

    /// Pool figures
    pub fn set_pool(&self, pool: PoolSnapshot) {
        self.state.lock().unwrap().pool = pool;
    }

    /// Policies returned for every owner
    pub fn set_portfolio(&self, portfolio: PolicyPortfolio) {
        self.state.lock().unwrap().portfolio = portfolio;
    }

    /// Settlement requests received
    pub fn settlements(&self) -> Vec<SettlementRequest> {
        self.state.lock().unwrap().settlements.clone()
    }

    /// Number of manual polls received
    pub fn poll_count(&self) -> usize {
        self.state.lock().unwrap().poll_queries.len()
    }

    /// Manual poll queries received
    pub fn poll_queries(&self) -> Vec<ManualPaymentQuery> {
        self.state.lock().unwrap().poll_queries.clone()
    }

    /// Claims submitted
    pub fn claims(&self) -> Vec<ClaimSubmission> {
        self.state.lock().unwrap().claims.clone()
    }

    /// Number of `fetch_claim` calls
    pub fn claim_fetches(&self) -> u32 {
        self.state.lock().unwrap().claim_fetches
    }

    /// Parametric events submitted
    pub fn parametric_events(&self) -> Vec<ParametricEvent> {
        self.state.lock().unwrap().parametric_events.clone()
    }

    /// Evidence files uploaded
    pub fn evidence_uploads(&self) -> Vec<EvidenceFile> {
        self.state.lock().unwrap().evidence_uploads.clone()
    }

    /// Read-only calls received
    pub fn read_calls(&self) -> u32 {
        self.state.lock().unwrap().read_calls
    }

    fn reachable(&self) -> Result<(), BackendError> {
        if self.state.lock().unwrap().unreachable {
            Err(BackendError::Unreachable {
                message: "mock backend offline".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn read(&self) -> Result<std::sync::MutexGuard<'_, BackendState>, BackendError> {
        self.reachable()?;
        let mut state = self.state.lock().unwrap();
        state.read_calls += 1;
        Ok(state)
    }
}

#[async_trait]
impl BackendEffects for MockBackend {
    async fn create_policy_or_stake(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementResponse, BackendError> {
        self.reachable()?;
        let mut state = self.state.lock().unwrap();
        state.settlements.push(request.clone());
        match &state.settlement {
            Some(scripted) => scripted.clone(),
            None => Ok(SettlementResponse {
                success: true,
                policy_id: Some(format!("POL-{}", state.settlements.len())),
                on_chain_tx: Some(format!("0xregistry{}", state.settlements.len())),
                message: None,
            }),
        }
    }

    async fn poll_manual_payment(
        &self,
        query: &ManualPaymentQuery,
    ) -> Result<ManualPaymentStatus, BackendError> {
        self.reachable()?;
        let mut state = self.state.lock().unwrap();
        state.poll_queries.push(query.clone());
        let received = state.polls.pop_front().unwrap_or(false);
        Ok(ManualPaymentStatus {
            received,
            tx_hash: received.then(|| format!("0xmanual{}", state.poll_queries.len())),
        })
    }

    async fn submit_claim(&self, claim: &ClaimSubmission) -> Result<ClaimReceipt, BackendError> {
        self.reachable()?;
        let mut state = self.state.lock().unwrap();
        state.claims.push(claim.clone());
        Ok(ClaimReceipt {
            claim_id: format!("CLM-{}", state.claims.len()),
            decision: ClaimDecision {
                decision: Some(state.claim_decision.clone()),
                fraud_score: Some(12.0),
                recommended_payout: Some(claim.claimed_amount),
                reason: Some("Consistent with policy terms".to_string()),
            },
            thinking_steps: state.thinking_steps.clone(),
            on_chain_tx_hash: Some("0xdecision".to_string()),
            error: None,
        })
    }

    async fn fetch_claim(&self, claim_id: &str) -> Result<ClaimRecord, BackendError> {
        self.reachable()?;
        let mut state = self.state.lock().unwrap();
        state.claim_fetches += 1;
        let index = claim_id
            .strip_prefix("CLM-")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n >= 1 && *n <= state.claims.len())
            .ok_or_else(|| BackendError::Status {
                status: 404,
                body: format!("claim {claim_id} not found"),
            })?;
        let claim = &state.claims[index - 1];
        Ok(ClaimRecord {
            claim_id: claim_id.to_string(),
            claim_type: Some("HEALTH".to_string()),
            status: state.claim_decision.clone(),
            claimed_amount: Some(claim.claimed_amount),
            payout_amount: Some(claim.claimed_amount),
            fraud_score: Some(12.0),
            created_at: Some("2026-01-01T00:00:00Z".to_string()),
            on_chain_tx_hash: Some("0xdecision".to_string()),
            thinking_steps: state.thinking_steps.clone(),
        })
    }

    async fn simulate_parametric(
        &self,
        event: &ParametricEvent,
    ) -> Result<ParametricOutcome, BackendError> {
        self.reachable()?;
        let mut state = self.state.lock().unwrap();
        state.parametric_events.push(event.clone());
        Ok(state.parametric.clone())
    }

    async fn analyze_evidence(&self, file: &EvidenceFile) -> Result<EvidenceAnalysis, BackendError> {
        self.reachable()?;
        let mut state = self.state.lock().unwrap();
        state.evidence_uploads.push(file.clone());
        Ok(state.evidence.clone())
    }

    async fn fetch_policies(&self, _owner: &Address) -> Result<PolicyPortfolio, BackendError> {
        Ok(self.read()?.portfolio.clone())
    }

    async fn fetch_pool(&self, _owner: Option<&Address>) -> Result<PoolSnapshot, BackendError> {
        Ok(self.read()?.pool.clone())
    }

    async fn fetch_events(&self, limit: usize) -> Result<Vec<ProtocolEvent>, BackendError> {
        Ok(self.read()?.events.iter().take(limit).cloned().collect())
    }

    async fn fetch_stats(&self, _owner: &Address) -> Result<ClaimStats, BackendError> {
        Ok(self.read()?.stats.clone())
    }

    async fn fetch_claim_history(&self, owner: &Address) -> Result<ClaimHistory, BackendError> {
        let state = self.read()?;
        let claims = state
            .claims
            .iter()
            .enumerate()
            .filter(|(_, c)| &c.wallet_address == owner)
            .map(|(i, c)| ClaimRecord {
                claim_id: format!("CLM-{}", i + 1),
                status: state.claim_decision.clone(),
                claimed_amount: Some(c.claimed_amount),
                ..ClaimRecord::default()
            })
            .collect();
        Ok(ClaimHistory { claims })
    }

    async fn fetch_proofs(&self, _owner: &Address) -> Result<Vec<BlockchainProof>, BackendError> {
        Ok(self.read()?.proofs.clone())
    }
}
