//! Settlement records

use crate::identifiers::SettlementRef;
use serde::{Deserialize, Serialize};

/// Backend acknowledgement that a confirmed transaction is registered
///
/// Created once by the flow engine after a successful settlement; there are
/// no mutators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    reference: SettlementRef,
    on_chain_ref: String,
    note: Option<String>,
}

impl SettlementRecord {
    /// Build a record
    pub fn new(reference: SettlementRef, on_chain_ref: impl Into<String>) -> Self {
        Self {
            reference,
            on_chain_ref: on_chain_ref.into(),
            note: None,
        }
    }

    /// Attach a human-readable note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Backend-issued reference
    pub fn reference(&self) -> &SettlementRef {
        &self.reference
    }

    /// On-chain registry transaction or payment reference
    pub fn on_chain_ref(&self) -> &str {
        &self.on_chain_ref
    }

    /// Optional note
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}
