//! Local key material
//!
//! Local identities are ed25519 keys held in memory. The address is the
//! first 20 bytes of the BLAKE3 hash of the verifying key.

use covera_core::errors::{IdentityError, WalletError};
use covera_core::effects::{KeyExport, WalletEffects};
use covera_core::identifiers::Address;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroize;

/// Derive the account address of a verifying key
pub fn derive_address(key: &VerifyingKey) -> Address {
    let digest = blake3::hash(key.as_bytes());
    Address::new(format!("0x{}", hex::encode(&digest.as_bytes()[..20])))
}

/// Generate a fresh key
pub fn generate() -> SigningKey {
    SigningKey::generate(&mut rand::rngs::OsRng)
}

/// Export bundle for `key`
pub fn bundle(key: &SigningKey, generated_at: String) -> KeyExport {
    KeyExport {
        address: derive_address(&key.verifying_key()),
        private_key: format!("0x{}", hex::encode(key.to_bytes())),
        note: KeyExport::NOTE.to_string(),
        generated_at,
    }
}

/// Parse an exported bundle back into a key
///
/// The address recorded in the bundle must match the key.
pub fn import(bundle_json: &str) -> Result<SigningKey, IdentityError> {
    let bundle: KeyExport =
        serde_json::from_str(bundle_json).map_err(|e| IdentityError::InvalidKeyMaterial {
            reason: format!("unreadable key bundle: {e}"),
        })?;
    let mut bytes = hex::decode(bundle.private_key.trim().trim_start_matches("0x")).map_err(
        |e| IdentityError::InvalidKeyMaterial {
            reason: format!("private key is not hex: {e}"),
        },
    )?;
    let secret: Result<[u8; 32], _> = bytes.as_slice().try_into();
    bytes.zeroize();
    let mut secret = secret.map_err(|_| IdentityError::InvalidKeyMaterial {
        reason: "private key must be 32 bytes".to_string(),
    })?;
    let key = SigningKey::from_bytes(&secret);
    secret.zeroize();

    let derived = derive_address(&key.verifying_key());
    if derived != bundle.address {
        return Err(IdentityError::InvalidKeyMaterial {
            reason: format!(
                "bundle address {} does not match key address {derived}",
                bundle.address
            ),
        });
    }
    Ok(key)
}

/// Capability to sign for the session identity
#[derive(Clone)]
pub enum SigningHandle {
    /// Signing is delegated to the wallet provider
    Wallet {
        /// Provider
        wallet: Arc<dyn WalletEffects>,
        /// Account to sign with
        address: Address,
    },
    /// Signing with an in-memory key
    Local {
        /// Account address
        address: Address,
        /// Key
        key: SigningKey,
    },
}

impl SigningHandle {
    pub fn address(&self) -> &Address {
        match self {
            Self::Wallet { address, .. } | Self::Local { address, .. } => address,
        }
    }

    /// Sign `payload`, returning a `0x` hex signature
    pub async fn sign(&self, payload: &[u8]) -> Result<String, WalletError> {
        match self {
            Self::Wallet { wallet, address } => wallet.sign_message(address, payload).await,
            Self::Local { key, .. } => {
                Ok(format!("0x{}", hex::encode(key.sign(payload).to_bytes())))
            }
        }
    }
}

impl fmt::Debug for SigningHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wallet { address, .. } => f.debug_struct("Wallet").field("address", address).finish(),
            Self::Local { address, .. } => f.debug_struct("Local").field("address", address).finish(),
        }
    }
}
