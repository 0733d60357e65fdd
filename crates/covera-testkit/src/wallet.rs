//! Scriptable wallet provider
//!
//! # Blocking Lock Usage
//!
//! Uses `std::sync::Mutex`; the lock is never held across an await.

#![allow(clippy::disallowed_types)]

use async_trait::async_trait;
use covera_core::effects::{ChainSpec, Confirmation, TransactionRequest, WalletEffects};
use covera_core::errors::WalletError;
use covera_core::identifiers::{Address, TxRef};
use covera_core::types::Wei;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Behaviour<T> {
    Succeed,
    Fail(T),
    Hang,
}

#[derive(Debug)]
struct WalletState {
    accounts: Vec<Address>,
    authorized: bool,
    available: bool,
    balances: HashMap<Address, Wei>,
    default_balance: Wei,
    send: Behaviour<WalletError>,
    confirm: Behaviour<WalletError>,
    revert: bool,
    network: Option<WalletError>,
    sent: Vec<TransactionRequest>,
    signed: Vec<(Address, Vec<u8>)>,
    network_switches: Vec<u64>,
    next_block: u64,
}

/// In-memory wallet with scriptable outcomes
#[derive(Debug, Clone)]
pub struct MockWallet {
    state: Arc<Mutex<WalletState>>,
}

impl MockWallet {
    /// Wallet exposing one account with a generous balance
    pub fn new(account: Address) -> Self {
        Self::with_accounts(vec![account])
    }

    /// Wallet exposing `accounts` (possibly none)
    pub fn with_accounts(accounts: Vec<Address>) -> Self {
        Self {
            state: Arc::new(Mutex::new(WalletState {
                accounts,
                authorized: true,
                available: true,
                balances: HashMap::new(),
                default_balance: Wei(1_000_000_000_000_000_000_000),
                send: Behaviour::Succeed,
                confirm: Behaviour::Succeed,
                revert: false,
                network: None,
                sent: Vec::new(),
                signed: Vec::new(),
                network_switches: Vec::new(),
                next_block: 100,
            })),
        }
    }

    /// Wallet that behaves as if no provider is installed
    pub fn unavailable() -> Self {
        let wallet = Self::with_accounts(Vec::new());
        wallet.state.lock().unwrap().available = false;
        wallet
    }

    /// Set the balance of one account
    pub fn set_balance(&self, account: &Address, balance: Wei) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(account.clone(), balance);
    }

    /// Stop authorizing every account
    pub fn revoke_authorization(&self) {
        self.state.lock().unwrap().authorized = false;
    }

    /// Make `send_transaction` fail with `error`
    pub fn fail_sends(&self, error: WalletError) {
        self.state.lock().unwrap().send = Behaviour::Fail(error);
    }

    /// Make `send_transaction` never return
    pub fn hold_sends(&self) {
        self.state.lock().unwrap().send = Behaviour::Hang;
    }

    /// Make `wait_for_confirmation` never return
    pub fn hold_confirmations(&self) {
        self.state.lock().unwrap().confirm = Behaviour::Hang;
    }

    /// Make `wait_for_confirmation` fail with `error`
    pub fn fail_confirmations(&self, error: WalletError) {
        self.state.lock().unwrap().confirm = Behaviour::Fail(error);
    }

    /// Report every transaction as reverted
    pub fn revert_transactions(&self) {
        self.state.lock().unwrap().revert = true;
    }

    /// Make `ensure_network` fail
    pub fn fail_network_switch(&self, error: WalletError) {
        self.state.lock().unwrap().network = Some(error);
    }

    /// Transactions that reached `send_transaction`
    pub fn sent_transactions(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Messages signed so far
    pub fn signed_messages(&self) -> Vec<(Address, Vec<u8>)> {
        self.state.lock().unwrap().signed.clone()
    }

    /// Chain ids the wallet was asked to switch to
    pub fn network_switches(&self) -> Vec<u64> {
        self.state.lock().unwrap().network_switches.clone()
    }

    fn check_available(&self) -> Result<(), WalletError> {
        if self.state.lock().unwrap().available {
            Ok(())
        } else {
            Err(WalletError::Unavailable)
        }
    }
}

#[async_trait]
impl WalletEffects for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        state.authorized = true;
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        if state.authorized {
            Ok(state.accounts.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn ensure_network(&self, chain: &ChainSpec) -> Result<(), WalletError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        state.network_switches.push(chain.chain_id);
        match &state.network {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn get_balance(&self, address: &Address) -> Result<Wei, WalletError> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .balances
            .get(address)
            .copied()
            .unwrap_or(state.default_balance))
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<TxRef, WalletError> {
        self.check_available()?;
        let behaviour = {
            let mut state = self.state.lock().unwrap();
            if !state.authorized || !state.accounts.contains(&request.from) {
                return Err(WalletError::Unauthorized);
            }
            state.send.clone()
        };
        match behaviour {
            Behaviour::Succeed => {
                let mut state = self.state.lock().unwrap();
                state.sent.push(request.clone());
                Ok(TxRef::new(format!("0x{:064x}", state.sent.len())))
            }
            Behaviour::Fail(error) => Err(error),
            Behaviour::Hang => std::future::pending().await,
        }
    }

    async fn wait_for_confirmation(&self, _tx: &TxRef) -> Result<Confirmation, WalletError> {
        let behaviour = self.state.lock().unwrap().confirm.clone();
        match behaviour {
            Behaviour::Succeed => {
                let mut state = self.state.lock().unwrap();
                if state.revert {
                    return Ok(Confirmation::Reverted);
                }
                state.next_block += 1;
                Ok(Confirmation::Confirmed {
                    block_number: state.next_block,
                })
            }
            Behaviour::Fail(error) => Err(error),
            Behaviour::Hang => std::future::pending().await,
        }
    }

    async fn sign_message(&self, address: &Address, message: &[u8]) -> Result<String, WalletError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        if !state.authorized || !state.accounts.contains(address) {
            return Err(WalletError::Unauthorized);
        }
        state.signed.push((address.clone(), message.to_vec()));
        Ok(format!("0xsig{:04}", state.signed.len()))
    }
}
