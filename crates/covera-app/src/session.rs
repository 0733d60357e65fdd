//! Session Identity and In-Flight Attempts
//!
//! The session holds the active identity, an optional payer wallet for
//! local-key identities, and one entry per running attempt. Replacing or
//! clearing the identity revokes every running attempt exactly once.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` because every operation is a short map update
//! and the lock is never held across `.await` points.

#![allow(clippy::disallowed_types)]

use covera_core::errors::FlowError;
use covera_core::flow::AttemptReport;
use covera_core::identifiers::{Address, AttemptId};
use covera_core::types::Identity;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug)]
struct InFlight {
    owner: Address,
    exclusive: bool,
    revoked: bool,
    revoke: watch::Sender<bool>,
}

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    payer_wallet: Option<Address>,
    in_flight: HashMap<AttemptId, InFlight>,
    unsettled: Vec<AttemptReport>,
}

/// Process-wide session
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Active identity
    pub fn identity(&self) -> Option<Identity> {
        self.state.lock().identity.clone()
    }

    /// Wallet account paying for a local-key identity, if attached
    pub fn payer_wallet(&self) -> Option<Address> {
        self.state.lock().payer_wallet.clone()
    }

    pub fn set_payer_wallet(&self, payer: Option<Address>) {
        self.state.lock().payer_wallet = payer;
    }

    /// Install `identity`, revoking running attempts if it differs
    ///
    /// Returns the attempts that were revoked by this call.
    pub fn replace(&self, identity: Identity) -> Vec<AttemptId> {
        let mut state = self.state.lock();
        if state.identity.as_ref() == Some(&identity) {
            return Vec::new();
        }
        tracing::info!(identity = %identity, "Session identity replaced");
        state.identity = Some(identity);
        state.payer_wallet = None;
        Self::revoke_all(&mut state)
    }

    /// Drop the identity, revoking running attempts
    pub fn clear(&self) -> Vec<AttemptId> {
        let mut state = self.state.lock();
        if state.identity.take().is_some() {
            tracing::info!("Session identity cleared");
        }
        state.payer_wallet = None;
        Self::revoke_all(&mut state)
    }

    fn revoke_all(state: &mut SessionState) -> Vec<AttemptId> {
        let mut revoked = Vec::new();
        for (id, entry) in state.in_flight.iter_mut() {
            if !entry.revoked {
                entry.revoked = true;
                let _ = entry.revoke.send(true);
                revoked.push(*id);
            }
        }
        revoked
    }

    /// Register a running attempt for `owner`
    ///
    /// Exclusive attempts refuse to start while another exclusive attempt of
    /// the same owner is still registered and not revoked.
    pub fn begin_attempt(
        self: &Arc<Self>,
        owner: &Address,
        id: AttemptId,
        exclusive: bool,
    ) -> Result<AttemptLease, FlowError> {
        let mut state = self.state.lock();
        if exclusive {
            let active = state
                .in_flight
                .iter()
                .find(|(_, e)| e.exclusive && !e.revoked && &e.owner == owner)
                .map(|(id, _)| *id);
            if let Some(active) = active {
                return Err(FlowError::AttemptInProgress {
                    owner: owner.clone(),
                    active,
                });
            }
        }
        let (revoke, revoked_rx) = watch::channel(false);
        state.in_flight.insert(
            id,
            InFlight {
                owner: owner.clone(),
                exclusive,
                revoked: false,
                revoke,
            },
        );
        Ok(AttemptLease {
            session: Arc::clone(self),
            id,
            revoked_rx,
            released: false,
        })
    }

    /// Attempts currently registered
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Keep a report of an attempt whose funds may need reconciliation
    pub fn record_unsettled(&self, report: AttemptReport) {
        tracing::warn!(
            attempt_id = %report.id,
            owner = %report.owner,
            tx = ?report.external_tx_ref,
            "Attempt ended with funds unaccounted for"
        );
        self.state.lock().unsettled.push(report);
    }

    /// Unsettled ledger
    pub fn unsettled(&self) -> Vec<AttemptReport> {
        self.state.lock().unsettled.clone()
    }

    fn release(&self, id: AttemptId) {
        self.state.lock().in_flight.remove(&id);
    }
}

/// Registration of one running attempt; releases it on drop
#[derive(Debug)]
pub struct AttemptLease {
    session: Arc<Session>,
    id: AttemptId,
    revoked_rx: watch::Receiver<bool>,
    released: bool,
}

impl AttemptLease {
    pub fn id(&self) -> AttemptId {
        self.id
    }

    pub fn is_revoked(&self) -> bool {
        *self.revoked_rx.borrow()
    }

    /// Receiver flipping to `true` when the session revokes the attempt
    pub fn revocation(&mut self) -> &mut watch::Receiver<bool> {
        &mut self.revoked_rx
    }

    /// Remove the attempt from the session
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.session.release(self.id);
        }
    }
}

impl Drop for AttemptLease {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn alice() -> Identity {
        Identity::external(Address::new("0xa11ce"))
    }

    #[test]
    fn one_exclusive_attempt_per_owner() {
        let session = Session::new();
        let owner = alice().address;
        let first = AttemptId::new();
        let lease = session.begin_attempt(&owner, first, true).unwrap();

        assert_matches!(
            session.begin_attempt(&owner, AttemptId::new(), true),
            Err(FlowError::AttemptInProgress { active, .. }) if active == first
        );
        // Non-exclusive attempts do not take the lock
        let _free = session.begin_attempt(&owner, AttemptId::new(), false).unwrap();
        // Other owners are unaffected
        let _other = session
            .begin_attempt(&Address::new("0xb0b"), AttemptId::new(), true)
            .unwrap();

        drop(lease);
        assert!(session.begin_attempt(&owner, AttemptId::new(), true).is_ok());
    }

    #[test]
    fn replace_revokes_once() {
        let session = Session::new();
        session.replace(alice());
        let mut lease = session
            .begin_attempt(&alice().address, AttemptId::new(), true)
            .unwrap();

        // Same identity is a no-op
        assert!(session.replace(alice()).is_empty());
        assert!(!lease.is_revoked());

        let revoked = session.replace(Identity::local(Address::new("0xb0b")));
        assert_eq!(revoked, vec![lease.id()]);
        assert!(lease.is_revoked());
        assert!(*lease.revocation().borrow());

        assert!(session.clear().is_empty());
        assert_eq!(session.identity(), None);
    }

    #[test]
    fn replace_drops_payer_wallet() {
        let session = Session::new();
        session.replace(Identity::local(Address::new("0x10ca1")));
        session.set_payer_wallet(Some(Address::new("0xa11ce")));
        assert!(session.payer_wallet().is_some());
        session.replace(alice());
        assert_eq!(session.payer_wallet(), None);
    }

    #[test]
    fn revoked_attempt_no_longer_blocks_owner() {
        let session = Session::new();
        let owner = alice().address;
        let _lease = session.begin_attempt(&owner, AttemptId::new(), true).unwrap();
        session.clear();
        assert!(session.begin_attempt(&owner, AttemptId::new(), true).is_ok());
        assert_eq!(session.in_flight(), 2);
    }
}
