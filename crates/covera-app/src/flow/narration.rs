//! Paced progress lines
//!
//! Narration is cosmetic: it never gates a transition and stops when the
//! app shuts down.

use super::sink::EventSink;
use crate::tasks::TaskRegistry;
use covera_core::flow::FlowEvent;
use covera_core::identifiers::AttemptId;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NarrationFeed {
    events: EventSink,
    tasks: Arc<TaskRegistry>,
    step: Duration,
}

impl NarrationFeed {
    pub fn new(events: EventSink, tasks: Arc<TaskRegistry>, step: Duration) -> Self {
        Self {
            events,
            tasks,
            step,
        }
    }

    /// Emit `lines` one per step
    pub fn play(&self, attempt_id: Option<AttemptId>, lines: Vec<String>) {
        if lines.is_empty() {
            return;
        }
        let events = self.events.clone();
        let step = self.step;
        self.tasks.spawn_cancellable(async move {
            for line in lines {
                tokio::time::sleep(step).await;
                events.emit(FlowEvent::Narration { attempt_id, line });
            }
        });
    }
}

/// Oracle lines for a parametric event
pub fn oracle_script(event_label: &str, magnitude: f64) -> Vec<String> {
    vec![
        format!("Oracle received {event_label} report"),
        format!("Cross-checking sensor feeds (magnitude {magnitude:.1})"),
        "Matching against active parametric triggers".to_string(),
        "Evaluating payout conditions".to_string(),
        "Submitting verdict to settlement contract".to_string(),
    ]
}
