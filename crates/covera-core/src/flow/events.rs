//! Events published to the renderer

use super::state::AttemptState;
use crate::identifiers::{Address, AttemptId};
use crate::types::{Amount, ProductKind, Wei};
use serde::{Deserialize, Serialize};

/// Answer to a payment method choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MethodChoice {
    /// Sign through an external wallet
    Wallet,
    /// Pay by manual transfer
    Manual,
    /// Dismiss the choice; cancels the attempt
    Decline,
}

/// Payment method choice offered to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRequest {
    /// Product being paid for
    pub product: ProductKind,
    /// Quoted price
    pub price: Amount,
    /// Offered options (always WALLET and MANUAL)
    pub options: Vec<MethodChoice>,
}

/// Out-of-band transfer the user is asked to make
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPaymentRequest {
    /// Destination
    pub pay_to: Address,
    /// Chain to pay on
    pub chain_id: u64,
    /// Value to transfer
    pub value: Wei,
    /// EIP-681 style payload for a QR code
    pub qr_payload: String,
    /// Human-readable amount
    pub amount_label: String,
}

impl ManualPaymentRequest {
    /// Build a request; the QR payload is derived from the other fields
    pub fn new(pay_to: Address, chain_id: u64, value: Wei, amount_label: impl Into<String>) -> Self {
        let qr_payload = format!("ethereum:{pay_to}@{chain_id}?value={}", value.0);
        Self {
            pay_to,
            chain_id,
            value,
            qr_payload,
            amount_label: amount_label.into(),
        }
    }
}

/// Event published by running flows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    /// Attempt entered a new state
    StateChanged {
        /// Attempt
        attempt_id: AttemptId,
        /// New state
        state: AttemptState,
        /// Optional detail (failure message, tx reference, ...)
        detail: Option<String>,
    },
    /// The user must choose a payment method
    ChoiceRequested {
        /// Attempt
        attempt_id: AttemptId,
        /// Choice
        request: ChoiceRequest,
    },
    /// The user should transfer funds manually
    ManualPaymentRequested {
        /// Attempt
        attempt_id: AttemptId,
        /// Transfer details
        request: ManualPaymentRequest,
    },
    /// A manual payment poll came back negative; the attempt keeps waiting
    ManualPollNegative {
        /// Attempt
        attempt_id: AttemptId,
        /// Polls so far
        polls: u32,
    },
    /// Cosmetic progress line
    Narration {
        /// Attempt the line belongs to, if any
        attempt_id: Option<AttemptId>,
        /// Text
        line: String,
    },
}

impl FlowEvent {
    /// Attempt the event belongs to
    pub fn attempt_id(&self) -> Option<AttemptId> {
        match self {
            Self::StateChanged { attempt_id, .. }
            | Self::ChoiceRequested { attempt_id, .. }
            | Self::ManualPaymentRequested { attempt_id, .. }
            | Self::ManualPollNegative { attempt_id, .. } => Some(*attempt_id),
            Self::Narration { attempt_id, .. } => *attempt_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_payload_format() {
        let request = ManualPaymentRequest::new(
            Address::new("0xcE33FBE1a657cFaDea3Bb594b15857C08d9E6Ad6"),
            5_042_002,
            Wei(10_000_000_000_000_000),
            "0.01 ARC ($1.20 USDC)",
        );
        assert_eq!(
            request.qr_payload,
            "ethereum:0xce33fbe1a657cfadea3bb594b15857c08d9e6ad6@5042002?value=10000000000000000"
        );
    }
}
