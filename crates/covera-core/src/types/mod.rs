//! Domain value types

pub mod amount;
pub mod backend;
pub mod identity;
pub mod product;
pub mod settlement;

pub use amount::{Amount, AmountParseError, Wei, MICROS_PER_UNIT};
pub use backend::{
    BlockchainProof, ClaimDecision, ClaimHistory, ClaimReceipt, ClaimRecord, ClaimStats,
    ClaimStatus, ClaimSubmission, EvidenceAnalysis, EvidenceFile, EvidenceResponse,
    ManualPaymentQuery, ManualPaymentStatus, ParametricEvent, ParametricOutcome, PolicyPortfolio,
    PolicySummary, PoolSnapshot, ProofList, ProtocolEvent, SensorData, SensorEventType,
    SettlementRequest, SettlementResponse,
};
pub use identity::{Identity, SigningCapability};
pub use product::{PaymentMethod, PolicyOptions, ProductKind, PurchaseIntent};
pub use settlement::SettlementRecord;
