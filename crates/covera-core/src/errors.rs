//! Unified error system for Covera core
//!
//! `CoveraError` is the single error type crossing crate boundaries. The
//! typed enums below it describe failures of one layer each and convert into
//! it with `?`.

use crate::flow::AttemptState;
use crate::identifiers::{Address, AttemptId};
use crate::types::ProductKind;
use serde::{Deserialize, Serialize};

/// Unified error type for all Covera operations
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum CoveraError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Permission denied
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// Error message describing the permission issue
        message: String,
    },

    /// Network or transport error
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Storage operation failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl CoveraError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Standard Result type for Covera operations
pub type Result<T> = std::result::Result<T, CoveraError>;

impl From<std::io::Error> for CoveraError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(err.to_string()),
            _ => Self::storage(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for CoveraError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

// ============================================================================
// Identity errors
// ============================================================================

/// Failures while resolving or using a signing identity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// An external wallet was requested but none is reachable or it exposed no account
    #[error("No wallet provider available: {reason}")]
    NoProviderAvailable {
        /// Why the provider could not be used
        reason: String,
    },

    /// A local key bundle could not be parsed into a usable key
    #[error("Invalid key material: {reason}")]
    InvalidKeyMaterial {
        /// What was wrong with the bundle
        reason: String,
    },

    /// The provider session ended between resolution and use
    #[error("Signing capability for {address} has expired")]
    CapabilityExpired {
        /// Address whose capability is gone
        address: Address,
    },

    /// The generated key could not be exported, so the identity was not created
    #[error("Key export failed: {reason}")]
    ExportFailed {
        /// Export failure detail
        reason: String,
    },
}

impl From<IdentityError> for CoveraError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NoProviderAvailable { .. } => Self::not_found(err.to_string()),
            IdentityError::InvalidKeyMaterial { .. } => Self::invalid(err.to_string()),
            IdentityError::CapabilityExpired { .. } => Self::permission_denied(err.to_string()),
            IdentityError::ExportFailed { .. } => Self::storage(err.to_string()),
        }
    }
}

// ============================================================================
// Flow errors
// ============================================================================

/// Errors returned synchronously by flow operations (start, cancel, choice)
///
/// Terminal outcomes of a running attempt are reported as [`crate::Failure`]
/// inside the attempt, never through this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// Another attempt of the same identity is still running
    #[error("Attempt {active} is still in progress for {owner}")]
    AttemptInProgress {
        /// Identity address holding the lock
        owner: Address,
        /// The non-terminal attempt
        active: AttemptId,
    },

    /// The flow needs an identity and the session has none
    #[error("No identity is active in this session")]
    NoIdentity,

    /// The product has no quoted price
    #[error("No quoted price for {product}")]
    PriceUnavailable {
        /// Product without a quote
        product: ProductKind,
    },

    /// The requested intent or subject is not acceptable
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// What was wrong
        reason: String,
    },

    /// Cancellation requested outside AwaitingMethodChoice/AwaitingSigning
    #[error("Attempt cannot be cancelled in state {state}")]
    NotCancellable {
        /// Current state of the attempt
        state: AttemptState,
    },

    /// `resolve_choice` called while no choice is pending
    #[error("No payment method choice is pending")]
    NoPendingChoice,

    /// Manual payment confirmation sent while no manual payment is pending
    #[error("No manual payment is awaiting confirmation")]
    NoManualPaymentPending,

    /// A transition outside the state table was attempted
    #[error("Invalid transition {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: AttemptState,
        /// Requested state
        to: AttemptState,
    },

    /// A second external reference was assigned to one attempt
    #[error("Attempt already has an external transaction reference")]
    DuplicateSubmission,

    /// The payment method can no longer be changed
    #[error("Payment method is already resolved")]
    MethodAlreadyResolved,

    /// Identity resolution failed while starting a flow
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl From<FlowError> for CoveraError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Identity(inner) => inner.into(),
            FlowError::NoIdentity => Self::permission_denied(err.to_string()),
            FlowError::InvalidTransition { .. } | FlowError::DuplicateSubmission => {
                Self::internal(err.to_string())
            }
            _ => Self::invalid(err.to_string()),
        }
    }
}

// ============================================================================
// Effect errors
// ============================================================================

/// Errors reported by a wallet / chain provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// The user declined the request in the wallet
    #[error("Request rejected by user")]
    UserRejected,

    /// The provider or chain refused the request
    #[error("Request rejected: {reason}")]
    Rejected {
        /// Provider-supplied reason
        reason: String,
    },

    /// No wallet is installed or reachable
    #[error("Wallet unavailable")]
    Unavailable,

    /// The account is no longer authorized for this origin
    #[error("Account not authorized")]
    Unauthorized,

    /// JSON-RPC level error
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// Transport failure talking to the provider
    #[error("Wallet transport error: {message}")]
    Transport {
        /// Transport failure detail
        message: String,
    },
}

impl From<WalletError> for CoveraError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UserRejected | WalletError::Unauthorized => {
                Self::permission_denied(err.to_string())
            }
            WalletError::Unavailable => Self::not_found(err.to_string()),
            _ => Self::network(err.to_string()),
        }
    }
}

/// Errors reported by the backend API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached
    #[error("Backend unreachable: {message}")]
    Unreachable {
        /// Transport failure detail
        message: String,
    },

    /// The backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// The response body did not match the expected shape
    #[error("Failed to decode backend response: {message}")]
    Decode {
        /// Decode failure detail
        message: String,
    },
}

impl From<BackendError> for CoveraError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode { .. } => Self::serialization(err.to_string()),
            BackendError::Status { status: 404, .. } => Self::not_found(err.to_string()),
            _ => Self::network(err.to_string()),
        }
    }
}

/// Errors exporting generated key material
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyExportError {
    /// Writing the export failed
    #[error("Key export I/O error: {message}")]
    Io {
        /// I/O failure detail
        message: String,
    },

    /// Encoding the export failed
    #[error("Key export encoding error: {message}")]
    Encoding {
        /// Encoding failure detail
        message: String,
    },
}

impl From<KeyExportError> for CoveraError {
    fn from(err: KeyExportError) -> Self {
        Self::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_errors_map_to_categories() {
        let err: CoveraError = IdentityError::InvalidKeyMaterial {
            reason: "bad hex".into(),
        }
        .into();
        assert!(matches!(err, CoveraError::Invalid { .. }));

        let err: CoveraError = IdentityError::CapabilityExpired {
            address: Address::new("0xabc"),
        }
        .into();
        assert!(matches!(err, CoveraError::PermissionDenied { .. }));
    }

    #[test]
    fn flow_error_wraps_identity_error() {
        let err = FlowError::from(IdentityError::NoProviderAvailable {
            reason: "no wallet".into(),
        });
        assert_eq!(err.to_string(), "No wallet provider available: no wallet");
        assert!(matches!(CoveraError::from(err), CoveraError::NotFound { .. }));
    }

    #[test]
    fn backend_not_found_status() {
        let err: CoveraError = BackendError::Status {
            status: 404,
            body: "missing".into(),
        }
        .into();
        assert!(matches!(err, CoveraError::NotFound { .. }));
    }
}
