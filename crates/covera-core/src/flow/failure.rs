//! Terminal failure taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No external wallet reachable, or it exposed no account
    NoProviderAvailable,
    /// Local key material unusable
    InvalidKeyMaterial,
    /// Wallet session ended between resolution and use
    CapabilityExpired,
    /// Another attempt of this identity is in flight
    AttemptInProgress,
    /// User declined in the wallet
    SigningRejected,
    /// Provider refused the transaction
    SubmissionRejected,
    /// Finality not observed in time
    ConfirmationTimeout,
    /// Transaction reverted or was dropped
    ConfirmationDenied,
    /// Funds moved but the backend refused registration
    SettlementRejectedAfterConfirmation,
    /// Backend unreachable
    BackendUnreachable,
    /// Balance below the payment value
    InsufficientBalance,
}

impl FailureReason {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoProviderAvailable => "no_provider_available",
            Self::InvalidKeyMaterial => "invalid_key_material",
            Self::CapabilityExpired => "capability_expired",
            Self::AttemptInProgress => "attempt_in_progress",
            Self::SigningRejected => "signing_rejected",
            Self::SubmissionRejected => "submission_rejected",
            Self::ConfirmationTimeout => "confirmation_timeout",
            Self::ConfirmationDenied => "confirmation_denied",
            Self::SettlementRejectedAfterConfirmation => {
                "settlement_rejected_after_confirmation"
            }
            Self::BackendUnreachable => "backend_unreachable",
            Self::InsufficientBalance => "insufficient_balance",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// What is known about the user's funds when an attempt ends badly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundsStatus {
    /// Nothing left the account
    Untouched,
    /// A transaction was submitted; its fate is unknown
    InFlight,
    /// The transfer is final on chain
    Moved,
}

/// Terminal failure of an attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Failure code
    pub reason: FailureReason,
    /// Funds status at failure time
    pub funds: FundsStatus,
    /// Technical detail
    pub message: String,
}

impl Failure {
    /// Build a failure
    pub fn new(reason: FailureReason, funds: FundsStatus, message: impl Into<String>) -> Self {
        Self {
            reason,
            funds,
            message: message.into(),
        }
    }

    /// Failure before anything reached the chain
    pub fn untouched(reason: FailureReason, message: impl Into<String>) -> Self {
        Self::new(reason, FundsStatus::Untouched, message)
    }

    /// Failure after the transfer became final
    pub fn funds_moved(reason: FailureReason, message: impl Into<String>) -> Self {
        Self::new(reason, FundsStatus::Moved, message)
    }

    /// True when the user may have paid without receiving what they paid for
    pub fn needs_reconciliation(&self) -> bool {
        self.funds != FundsStatus::Untouched
    }

    /// Message for the end user
    pub fn user_message(&self) -> String {
        let prefix = match self.funds {
            FundsStatus::Untouched => "Nothing was charged.",
            FundsStatus::InFlight => {
                "Your payment was submitted but its outcome is not known yet. Check the explorer before trying again."
            }
            FundsStatus::Moved => {
                "Your payment went through, but registration did not complete. Keep the transaction reference and contact support."
            }
        };
        format!("{prefix} ({}: {})", self.reason, self.message)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.message)
    }
}
