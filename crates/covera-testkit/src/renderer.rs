//! Renderer that records every event

#![allow(clippy::disallowed_types)]

use covera_core::effects::Renderer;
use covera_core::flow::{AttemptState, FlowEvent};
use covera_core::identifiers::AttemptId;
use std::sync::{Arc, Mutex};

/// Records events in publication order
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    events: Arc<Mutex<Vec<FlowEvent>>>,
}

impl RecordingRenderer {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything seen so far
    pub fn events(&self) -> Vec<FlowEvent> {
        self.events.lock().unwrap().clone()
    }

    /// States published for one attempt, in order
    pub fn states_for(&self, attempt: AttemptId) -> Vec<AttemptState> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                FlowEvent::StateChanged {
                    attempt_id, state, ..
                } if *attempt_id == attempt => Some(*state),
                _ => None,
            })
            .collect()
    }

    /// Number of events matching `predicate`
    pub fn count(&self, predicate: impl Fn(&FlowEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| predicate(e))
            .count()
    }

    /// Narration lines, in order
    pub fn narration(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                FlowEvent::Narration { line, .. } => Some(line.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn on_event(&self, event: &FlowEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
