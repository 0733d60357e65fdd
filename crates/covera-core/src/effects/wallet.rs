//! Wallet / chain provider effects
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `covera-http::JsonRpcWallet`, `covera-testkit::MockWallet`
//! - **Usage**: identity resolution, payment submission, confirmation waits
//!
//! The trait mirrors an EIP-1193 provider: the provider holds the keys and
//! the core only ever sees addresses, references and receipts.

use crate::errors::WalletError;
use crate::identifiers::{Address, TxRef};
use crate::types::Wei;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Chain the wallet must be connected to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSpec {
    /// Numeric chain id
    pub chain_id: u64,
    /// Display name
    pub chain_name: String,
    /// Public RPC endpoint
    pub rpc_url: String,
    /// Block explorer base URL
    pub explorer_url: String,
    /// Native currency symbol
    pub native_symbol: String,
    /// Native currency decimals
    pub native_decimals: u8,
}

impl ChainSpec {
    /// Chain id as a `0x` hex quantity
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// Explorer link for a transaction
    pub fn tx_url(&self, tx: &TxRef) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx)
    }
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self {
            chain_id: 5_042_002,
            chain_name: "Arc Testnet".to_string(),
            rpc_url: "https://rpc.testnet.arc.network".to_string(),
            explorer_url: "https://explorer.testnet.arc.network".to_string(),
            native_symbol: "ARC".to_string(),
            native_decimals: 18,
        }
    }
}

/// Transaction handed to the provider for signing and broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Sender
    pub from: Address,
    /// Recipient
    pub to: Address,
    /// Native value
    pub value: Wei,
    /// Explicit gas limit
    pub gas_limit: u64,
    /// Call data (`0x`-prefixed hex), if any
    pub data: Option<String>,
}

/// Finality outcome of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    /// Included with success status
    Confirmed {
        /// Block the transaction landed in
        block_number: u64,
    },
    /// Included but reverted, or dropped
    Reverted,
}

/// Wallet and chain operations
#[async_trait]
pub trait WalletEffects: Send + Sync {
    /// Prompt the user to connect and return the exposed accounts
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Accounts currently authorized, without prompting
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Switch to `chain`, adding it first when the wallet does not know it
    async fn ensure_network(&self, chain: &ChainSpec) -> Result<(), WalletError>;

    /// Native balance of `address`
    async fn get_balance(&self, address: &Address) -> Result<Wei, WalletError>;

    /// Sign and broadcast; returns the transaction hash
    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxRef, WalletError>;

    /// Wait until the transaction is final
    ///
    /// May wait indefinitely; callers bound it with a timeout.
    async fn wait_for_confirmation(&self, tx: &TxRef) -> Result<Confirmation, WalletError>;

    /// Sign an arbitrary message with `address`
    async fn sign_message(&self, address: &Address, message: &[u8]) -> Result<String, WalletError>;
}

/// Blanket implementation for Arc<T> where T: WalletEffects
#[async_trait]
impl<T: WalletEffects + ?Sized> WalletEffects for Arc<T> {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        (**self).request_accounts().await
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        (**self).accounts().await
    }

    async fn ensure_network(&self, chain: &ChainSpec) -> Result<(), WalletError> {
        (**self).ensure_network(chain).await
    }

    async fn get_balance(&self, address: &Address) -> Result<Wei, WalletError> {
        (**self).get_balance(address).await
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxRef, WalletError> {
        (**self).send_transaction(request).await
    }

    async fn wait_for_confirmation(&self, tx: &TxRef) -> Result<Confirmation, WalletError> {
        (**self).wait_for_confirmation(tx).await
    }

    async fn sign_message(&self, address: &Address, message: &[u8]) -> Result<String, WalletError> {
        (**self).sign_message(address, message).await
    }
}
