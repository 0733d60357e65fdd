//! Covera Core - Domain Model Foundation
//!
//! This crate provides the pure domain types and effect interfaces shared by
//! every Covera frontend. It contains no runtime, no I/O and no application
//! logic.
//!
//! # Layers
//!
//! ## Domain Types
//! - `Identity`: the signing entity of a session (external wallet or local key)
//! - `PurchaseIntent`: what the user wants to buy or stake, prior to signing
//! - `Amount` / `Wei`: reference-currency and on-chain values
//!
//! ## Attempt State Machine
//! - `AttemptState`: the forward-only transition table
//! - `TransactionAttempt`: one run of a subject through the table
//! - `Failure`: terminal failure reason plus what happened to the funds
//!
//! ## Effect Interfaces (Pure Signatures)
//! - `WalletEffects`: accounts, balances, transactions, confirmations
//! - `BackendEffects`: settlement, manual payment polling, claims, read models
//! - `KeyExportEffects`: durable export of generated key material
//! - `Renderer`: presentation sink for flow events

#![forbid(unsafe_code)]

/// Unified and per-layer error types
pub mod errors;

/// Attempt, address and reference identifiers
pub mod identifiers;

/// Domain value types and backend wire models
pub mod types;

/// Attempt state table, attempts, failures and flow events
pub mod flow;

/// Pure effect interfaces (no implementations)
pub mod effects;

pub use errors::{
    BackendError, CoveraError, FlowError, IdentityError, KeyExportError, Result, WalletError,
};
pub use flow::{
    AttemptReport, AttemptState, ChoiceRequest, Failure, FailureReason, FlowEvent, FlowKind,
    FlowSubject, FundsStatus, ManualPaymentRequest, MethodChoice, TransactionAttempt,
};
pub use identifiers::{Address, AttemptId, SettlementRef, TxRef};
pub use types::{
    Amount, AmountParseError, Identity, PaymentMethod, PolicyOptions, ProductKind,
    PurchaseIntent, SettlementRecord, SigningCapability, Wei,
};
