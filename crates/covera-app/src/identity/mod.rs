//! Identity Resolution
//!
//! Resolves the session identity from an external wallet or a local key and
//! hands out signing capability for it. A generated key becomes an identity
//! only after its bundle has been exported.
//!
//! # Blocking Lock Usage
//!
//! Local keys live behind a `parking_lot::Mutex`; lookups clone the key out
//! and the lock is never held across `.await` points.

#![allow(clippy::disallowed_types)]

mod export;
mod local;

pub use export::FileKeyExporter;
pub use local::{derive_address, SigningHandle};

use covera_core::effects::{ChainSpec, KeyExportEffects, WalletEffects};
use covera_core::errors::IdentityError;
use covera_core::identifiers::Address;
use covera_core::types::{Identity, SigningCapability};
use ed25519_dalek::SigningKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// How the user wants to sign in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRequest {
    /// Connect the configured wallet provider
    ExternalWallet,
    /// Generate a fresh local key and export it
    GenerateLocalKey,
    /// Import a previously exported bundle (JSON)
    ImportLocalKey(String),
}

/// Resolves identities and their signing capability
pub struct IdentityProvider {
    wallet: Option<Arc<dyn WalletEffects>>,
    exporter: Arc<dyn KeyExportEffects>,
    chain: ChainSpec,
    local_keys: Mutex<HashMap<Address, SigningKey>>,
}

impl IdentityProvider {
    pub fn new(
        wallet: Option<Arc<dyn WalletEffects>>,
        exporter: Arc<dyn KeyExportEffects>,
        chain: ChainSpec,
    ) -> Self {
        Self {
            wallet,
            exporter,
            chain,
            local_keys: Mutex::new(HashMap::new()),
        }
    }

    /// Wallet provider, if one is configured
    pub fn wallet(&self) -> Option<Arc<dyn WalletEffects>> {
        self.wallet.clone()
    }

    /// Resolve an identity for `request`
    pub async fn resolve_identity(
        &self,
        request: IdentityRequest,
    ) -> Result<Identity, IdentityError> {
        match request {
            IdentityRequest::ExternalWallet => {
                let address = self.connect_wallet().await?;
                Ok(Identity::external(address))
            }
            IdentityRequest::GenerateLocalKey => {
                let key = local::generate();
                let bundle = local::bundle(&key, chrono::Utc::now().to_rfc3339());
                let address = bundle.address.clone();
                let receipt = self.exporter.export(&bundle).await.map_err(|e| {
                    IdentityError::ExportFailed {
                        reason: e.to_string(),
                    }
                })?;
                tracing::info!(address = %address, location = %receipt.location, "Local key generated");
                self.local_keys.lock().insert(address.clone(), key);
                Ok(Identity::local(address))
            }
            IdentityRequest::ImportLocalKey(bundle_json) => {
                let key = local::import(&bundle_json)?;
                let address = derive_address(&key.verifying_key());
                tracing::info!(address = %address, "Local key imported");
                self.local_keys.lock().insert(address.clone(), key);
                Ok(Identity::local(address))
            }
        }
    }

    /// Connect the wallet and return the account that pays for local-key
    /// identities
    pub async fn resolve_payer(&self) -> Result<Address, IdentityError> {
        self.connect_wallet().await
    }

    async fn connect_wallet(&self) -> Result<Address, IdentityError> {
        let wallet = self
            .wallet
            .as_ref()
            .ok_or_else(|| IdentityError::NoProviderAvailable {
                reason: "no wallet provider configured".to_string(),
            })?;
        let accounts = wallet
            .request_accounts()
            .await
            .map_err(|e| IdentityError::NoProviderAvailable {
                reason: e.to_string(),
            })?;
        let address = accounts
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::NoProviderAvailable {
                reason: "wallet exposed no accounts".to_string(),
            })?;
        self.ensure_network(wallet.as_ref()).await;
        Ok(address)
    }

    /// Switch the wallet to the configured chain; failures are logged only
    pub async fn ensure_network(&self, wallet: &dyn WalletEffects) {
        if let Err(e) = wallet.ensure_network(&self.chain).await {
            tracing::warn!(chain_id = self.chain.chain_id, error = %e, "Network switch failed");
        }
    }

    /// Signing capability for `identity`
    ///
    /// Fails with `CapabilityExpired` when the wallet no longer authorizes
    /// the account or the local key was forgotten.
    pub async fn get_signing_handle(
        &self,
        identity: &Identity,
    ) -> Result<SigningHandle, IdentityError> {
        let expired = || IdentityError::CapabilityExpired {
            address: identity.address.clone(),
        };
        match identity.capability {
            SigningCapability::ExternalWallet => {
                let wallet = self.wallet.clone().ok_or_else(expired)?;
                let accounts = wallet.accounts().await.map_err(|_| expired())?;
                if !accounts.contains(&identity.address) {
                    return Err(expired());
                }
                Ok(SigningHandle::Wallet {
                    wallet,
                    address: identity.address.clone(),
                })
            }
            SigningCapability::LocalKey => {
                let key = self
                    .local_keys
                    .lock()
                    .get(&identity.address)
                    .cloned()
                    .ok_or_else(expired)?;
                Ok(SigningHandle::Local {
                    address: identity.address.clone(),
                    key,
                })
            }
        }
    }

    /// Drop a local key from memory
    pub fn forget(&self, address: &Address) {
        if self.local_keys.lock().remove(address).is_some() {
            tracing::debug!(address = %address, "Local key forgotten");
        }
    }
}

impl std::fmt::Debug for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProvider")
            .field("wallet", &self.wallet.is_some())
            .field("chain_id", &self.chain.chain_id)
            .field("local_keys", &self.local_keys.lock().len())
            .finish()
    }
}
