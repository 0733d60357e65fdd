//! Backend wire models
//!
//! Field names follow the backend's JSON. Read models are lenient: missing
//! fields fall back to defaults rather than failing the whole response.

use super::amount::{Amount, Wei};
use super::product::{ProductKind, PurchaseIntent};
use crate::identifiers::{Address, SettlementRef, TxRef};
use serde::{Deserialize, Serialize};

// ============================================================================
// Settlement
// ============================================================================

/// Registration of a confirmed payment as a policy or stake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// Identity the policy or stake belongs to
    pub wallet_address: Address,
    /// Product being registered
    pub product: ProductKind,
    /// Price or staked amount
    pub amount: Amount,
    /// Shielded payout flag
    pub is_private: bool,
    /// Parametric trigger
    pub trigger: Option<String>,
    /// External reference of the payment
    pub payment_tx: TxRef,
}

impl SettlementRequest {
    /// Build from a frozen intent and its payment reference
    pub fn from_intent(owner: &Address, intent: &PurchaseIntent, payment_tx: &TxRef) -> Self {
        let trigger = if intent.product() == ProductKind::Parametric {
            intent.options().trigger.clone()
        } else {
            None
        };
        Self {
            wallet_address: owner.clone(),
            product: intent.product(),
            amount: intent.price(),
            is_private: intent.options().is_private,
            trigger,
            payment_tx: payment_tx.clone(),
        }
    }
}

/// Backend answer to a settlement request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SettlementResponse {
    /// Sole success criterion
    #[serde(default)]
    pub success: bool,
    /// Identifier of the registered policy, if issued
    #[serde(default)]
    pub policy_id: Option<String>,
    /// Registry transaction on chain
    #[serde(default)]
    pub on_chain_tx: Option<String>,
    /// Backend message
    #[serde(default)]
    pub message: Option<String>,
}

impl SettlementResponse {
    /// Backend reference, falling back to the payment reference
    pub fn reference(&self, payment_tx: &TxRef) -> SettlementRef {
        SettlementRef::new(
            self.policy_id
                .clone()
                .unwrap_or_else(|| payment_tx.as_str().to_string()),
        )
    }
}

/// Query for an out-of-band manual transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPaymentQuery {
    /// Identity the payment is for
    pub wallet_address: Address,
    /// Destination the user was asked to pay
    pub pay_to: Address,
    /// Expected value
    pub value: Wei,
    /// Chain the payment was requested on
    pub chain_id: u64,
}

/// Result of one manual payment poll
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManualPaymentStatus {
    /// Payment observed by the backend
    #[serde(default)]
    pub received: bool,
    /// Transaction the backend matched, if any
    #[serde(default)]
    pub tx_hash: Option<String>,
}

// ============================================================================
// Claims
// ============================================================================

/// Claim submitted for AI assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSubmission {
    /// Free-form description of the incident
    pub description: String,
    /// Requested amount
    pub claimed_amount: f64,
    /// Claimant
    pub wallet_address: Address,
    /// Signature over the claim payload by the claimant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ClaimSubmission {
    /// Canonical bytes signed by the claimant
    pub fn signing_payload(&self) -> Vec<u8> {
        format!(
            "covera-claim:{}:{}:{}",
            self.wallet_address, self.claimed_amount, self.description
        )
        .into_bytes()
    }
}

/// Claim decision as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Payout approved
    Approved,
    /// Claim rejected
    Rejected,
    /// Awaiting human review
    ManualReview,
}

impl ClaimStatus {
    /// Interpret a free-form backend decision string
    pub fn from_decision(decision: &str) -> Self {
        match decision.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Self::Approved,
            "reject" | "rejected" => Self::Rejected,
            _ => Self::ManualReview,
        }
    }

    /// Label shown to the user
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::ManualReview => "UNDER REVIEW",
        }
    }
}

/// Decision block of a claim submission response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClaimDecision {
    /// Raw decision (`approve`, `reject`, `manual_review`, ...)
    #[serde(default)]
    pub decision: Option<String>,
    /// Fraud score out of 100
    #[serde(default)]
    pub fraud_score: Option<f64>,
    /// Recommended payout
    #[serde(default)]
    pub recommended_payout: Option<f64>,
    /// Reasoning summary
    #[serde(default)]
    pub reason: Option<String>,
}

/// Response to a claim submission
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClaimReceipt {
    /// Backend claim identifier
    #[serde(default)]
    pub claim_id: String,
    /// Decision block
    #[serde(default)]
    pub decision: ClaimDecision,
    /// Agent reasoning steps, shown as narration
    #[serde(default)]
    pub thinking_steps: Vec<String>,
    /// Decision hash on chain
    #[serde(default)]
    pub on_chain_tx_hash: Option<String>,
    /// Explicit backend error
    #[serde(default)]
    pub error: Option<String>,
}

impl ClaimReceipt {
    /// Parsed decision; missing decisions read as manual review
    pub fn status(&self) -> ClaimStatus {
        self.decision
            .decision
            .as_deref()
            .map_or(ClaimStatus::ManualReview, ClaimStatus::from_decision)
    }
}

/// Stored claim as returned by `/api/claims/{id}` and the history endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Backend claim identifier
    #[serde(default)]
    pub claim_id: String,
    /// Product the claim was filed against
    #[serde(default)]
    pub claim_type: Option<String>,
    /// Raw status string
    #[serde(default)]
    pub status: String,
    /// Requested amount
    #[serde(default)]
    pub claimed_amount: Option<f64>,
    /// Granted payout
    #[serde(default)]
    pub payout_amount: Option<f64>,
    /// Fraud score out of 100
    #[serde(default)]
    pub fraud_score: Option<f64>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
    /// Decision hash on chain
    #[serde(default)]
    pub on_chain_tx_hash: Option<String>,
    /// Agent reasoning steps
    #[serde(default)]
    pub thinking_steps: Vec<String>,
}

impl ClaimRecord {
    /// Parsed status
    pub fn decision(&self) -> ClaimStatus {
        ClaimStatus::from_decision(&self.status)
    }
}

/// Claim history of one identity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClaimHistory {
    /// Claims, newest first as returned
    #[serde(default)]
    pub claims: Vec<ClaimRecord>,
}

// ============================================================================
// Parametric events
// ============================================================================

/// Kind of sensor event fed to the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorEventType {
    /// Seismic event
    Earthquake,
    /// Flight delay
    FlightDelay,
}

/// Sensor reading submitted to the parametric oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    /// Event kind
    pub event_type: SensorEventType,
    /// Magnitude; zero when not applicable
    pub magnitude: f64,
    /// Unix seconds
    pub timestamp: f64,
}

impl SensorData {
    /// Magnitude reported for event keys that mention an 8
    pub const HIGH_MAGNITUDE: f64 = 8.2;

    /// Build a reading from a simulator event key such as `earthquake_8`
    pub fn from_event_key(key: &str, timestamp: f64) -> Self {
        let lower = key.to_ascii_lowercase();
        let event_type = if lower.contains("earthquake") {
            SensorEventType::Earthquake
        } else {
            SensorEventType::FlightDelay
        };
        let magnitude = if lower.contains('8') {
            Self::HIGH_MAGNITUDE
        } else {
            0.0
        };
        Self {
            event_type,
            magnitude,
            timestamp,
        }
    }
}

/// Parametric simulation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametricEvent {
    /// Reading
    pub sensor_data: SensorData,
    /// Policy holder the event is evaluated for
    pub wallet_address: Address,
}

/// Oracle verdict for a parametric event
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParametricOutcome {
    /// Payout settled
    #[serde(default)]
    pub payout_executed: bool,
    /// Settlement transaction, when paid out
    #[serde(default)]
    pub settlement_tx: Option<String>,
    /// Backend message
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// Evidence
// ============================================================================

/// Evidence file uploaded for damage assessment
#[derive(Clone, PartialEq, Eq)]
pub struct EvidenceFile {
    /// File name reported to the backend
    pub file_name: String,
    /// MIME type of the content
    pub content_type: String,
    /// Raw content
    pub bytes: Vec<u8>,
}

impl EvidenceFile {
    /// Wrap `bytes`, deriving the MIME type from the file extension
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "pdf" => "application/pdf",
            "txt" => "text/plain",
            _ => "application/octet-stream",
        };
        Self {
            file_name,
            content_type: content_type.to_string(),
            bytes,
        }
    }
}

impl std::fmt::Debug for EvidenceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Damage assessment of an evidence file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvidenceAnalysis {
    /// Severity on a 0-10 scale
    #[serde(default)]
    pub severity_score: Option<f64>,
    /// Estimated damage in the reference currency
    #[serde(default)]
    pub estimated_amount: Option<f64>,
    /// Set when the evidence looks manipulated
    #[serde(default)]
    pub fraud_indicator: bool,
    /// Assessment summary
    #[serde(default)]
    pub summary: Option<String>,
    /// Damage description, sent by older backends instead of a summary
    #[serde(default)]
    pub damage_description: Option<String>,
}

impl EvidenceAnalysis {
    /// Summary, falling back to the damage description
    pub fn description(&self) -> &str {
        self.summary
            .as_deref()
            .or(self.damage_description.as_deref())
            .unwrap_or("No description available")
    }

    /// Amount to pre-fill a claim with; only positive estimates count
    pub fn suggested_claim_amount(&self) -> Option<Amount> {
        let estimate = self.estimated_amount.filter(|v| v.is_finite() && *v > 0.0)?;
        let cents = (estimate * 100.0).round();
        (cents >= 1.0).then(|| Amount::from_cents(cents as u64))
    }
}

/// Evidence upload response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvidenceResponse {
    /// Assessment
    #[serde(default)]
    pub analysis: EvidenceAnalysis,
}

// ============================================================================
// Read models
// ============================================================================

/// One active policy of a portfolio
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicySummary {
    /// Backend policy identifier
    #[serde(default)]
    pub policy_id: Option<String>,
    /// `HEALTH`, `VEHICLE`, `PARAMETRIC` or `Institutional` for stakers
    #[serde(default)]
    pub policy_type: String,
    /// Parametric trigger description
    #[serde(default)]
    pub parametric_trigger: Option<String>,
    /// Coverage limit
    #[serde(default)]
    pub coverage_amount: Option<f64>,
    /// Expiry date as returned
    #[serde(default)]
    pub expiry_date: Option<String>,
    /// Shielded payout
    #[serde(default)]
    pub is_private: bool,
}

impl PolicySummary {
    /// Policies granted to liquidity providers
    pub fn is_staker_benefit(&self) -> bool {
        self.policy_type == "Institutional"
    }
}

/// Policies held by an identity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyPortfolio {
    /// At least one policy exists
    #[serde(default)]
    pub has_policy: bool,
    /// Latest policy is active
    #[serde(default)]
    pub active: bool,
    /// Policies
    #[serde(default)]
    pub policies: Vec<PolicySummary>,
}

/// Reinsurance pool figures
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Total value locked
    #[serde(default)]
    pub total_locked: f64,
    /// Yield rate in percent
    #[serde(default)]
    pub yield_rate: f64,
    /// Caller's stake, when queried with a wallet
    #[serde(default)]
    pub user_stake: Option<f64>,
    /// Caller's accrued rewards
    #[serde(default)]
    pub user_rewards: Option<f64>,
}

/// Protocol activity feed entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProtocolEvent {
    /// Display text
    #[serde(default)]
    pub text: String,
    /// Related transaction
    #[serde(default)]
    pub tx_hash: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Claim statistics of one identity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClaimStats {
    /// Claims filed
    #[serde(default)]
    pub total_claims: u64,
    /// Claims approved
    #[serde(default)]
    pub approved: u64,
    /// Claims rejected
    #[serde(default)]
    pub rejected: u64,
    /// Sum of payouts
    #[serde(default)]
    pub total_payout: f64,
}

/// On-chain record of one AI decision
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainProof {
    /// Hash of the decision payload
    #[serde(default)]
    pub decision_hash: String,
    /// Registry transaction
    #[serde(default)]
    pub tx_hash: String,
    /// Block the decision landed in
    #[serde(default)]
    pub block_number: u64,
    /// Explorer link
    #[serde(default)]
    pub explorer_url: String,
    /// Fraud score out of 100
    #[serde(default)]
    pub fraud_score: f64,
    /// Approved amount
    #[serde(default)]
    pub approved_amount: f64,
    /// Unix seconds
    #[serde(default)]
    pub timestamp: u64,
    /// Payout transaction, once settled
    #[serde(default)]
    pub settlement_tx_hash: Option<String>,
}

/// Proof list wrapper
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProofList {
    /// Proofs
    #[serde(default)]
    pub proofs: Vec<BlockchainProof>,
}
