//! Parametric oracle simulation
//!
//! Without a session identity the event is attributed to the demo address
//! and does not take the per-identity lock.

#![allow(clippy::disallowed_types)]

use crate::flow::{
    oracle_script, AttemptHandle, FlowEngine, FlowStages, MethodRequirement, NarrationFeed,
    StageContext, StageError,
};
use crate::session::Session;
use async_trait::async_trait;
use covera_core::effects::BackendEffects;
use covera_core::errors::FlowError;
use covera_core::flow::{Failure, FailureReason};
use covera_core::identifiers::{Address, SettlementRef, TxRef};
use covera_core::types::{ParametricEvent, SensorData, SensorEventType, SettlementRecord};
use parking_lot::Mutex;
use std::sync::Arc;

struct ParametricStages {
    backend: Arc<dyn BackendEffects>,
    narration: NarrationFeed,
    payout: Mutex<Option<bool>>,
}

fn event_label(event: &ParametricEvent) -> &'static str {
    match event.sensor_data.event_type {
        SensorEventType::Earthquake => "earthquake",
        SensorEventType::FlightDelay => "flight delay",
    }
}

#[async_trait]
impl FlowStages<ParametricEvent> for ParametricStages {
    fn method_requirement(&self, _event: &ParametricEvent) -> MethodRequirement {
        MethodRequirement::Preset
    }

    async fn sign_and_submit(
        &self,
        ctx: &mut StageContext,
        event: &ParametricEvent,
    ) -> Result<TxRef, StageError> {
        self.narration.play(
            Some(ctx.attempt_id()),
            oracle_script(event_label(event), event.sensor_data.magnitude),
        );
        let outcome = self
            .backend
            .simulate_parametric(event)
            .await
            .map_err(|e| Failure::untouched(FailureReason::BackendUnreachable, e.to_string()))?;
        tracing::info!(
            attempt_id = %ctx.attempt_id(),
            payout = outcome.payout_executed,
            tx = ?outcome.settlement_tx,
            "Oracle verdict"
        );
        *self.payout.lock() = Some(outcome.payout_executed);
        let tx = outcome
            .settlement_tx
            .unwrap_or_else(|| format!("event-{}", ctx.attempt_id().uuid()));
        Ok(TxRef::new(tx))
    }

    async fn await_confirmation(
        &self,
        _ctx: &StageContext,
        _event: &ParametricEvent,
        _tx: &TxRef,
    ) -> Result<(), StageError> {
        Ok(())
    }

    async fn settle(
        &self,
        _ctx: &StageContext,
        _event: &ParametricEvent,
        tx: &TxRef,
    ) -> Result<SettlementRecord, StageError> {
        let note = if self.payout.lock().unwrap_or(false) {
            "payout executed"
        } else {
            "event recorded, no payout triggered"
        };
        Ok(SettlementRecord::new(SettlementRef::new(tx.as_str()), tx.as_str()).with_note(note))
    }
}

#[derive(Clone)]
pub struct ParametricFlow {
    engine: FlowEngine,
    session: Arc<Session>,
    backend: Arc<dyn BackendEffects>,
    narration: NarrationFeed,
    demo_address: Address,
}

impl ParametricFlow {
    pub fn new(
        engine: FlowEngine,
        session: Arc<Session>,
        backend: Arc<dyn BackendEffects>,
        narration: NarrationFeed,
        demo_address: Address,
    ) -> Self {
        Self {
            engine,
            session,
            backend,
            narration,
            demo_address,
        }
    }

    /// Feed a simulated sensor event (e.g. `earthquake_8`) to the oracle
    pub fn simulate(&self, event_key: &str) -> Result<AttemptHandle, FlowError> {
        if event_key.trim().is_empty() {
            return Err(FlowError::InvalidRequest {
                reason: "event key is empty".to_string(),
            });
        }
        let (owner, exclusive) = match self.session.identity() {
            Some(identity) => (identity.address, true),
            None => (self.demo_address.clone(), false),
        };
        let event = ParametricEvent {
            sensor_data: SensorData::from_event_key(
                event_key,
                chrono::Utc::now().timestamp() as f64,
            ),
            wallet_address: owner.clone(),
        };
        let stages = ParametricStages {
            backend: self.backend.clone(),
            narration: self.narration.clone(),
            payout: Mutex::new(None),
        };
        self.engine.start(owner, event, Arc::new(stages), exclusive)
    }
}
