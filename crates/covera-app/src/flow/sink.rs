//! Event fan-out to the renderer and subscribers

use covera_core::effects::Renderer;
use covera_core::flow::FlowEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Publishes each event to the renderer, then to broadcast subscribers
#[derive(Clone)]
pub struct EventSink {
    renderer: Arc<dyn Renderer>,
    tx: broadcast::Sender<FlowEvent>,
}

impl EventSink {
    pub fn new(renderer: Arc<dyn Renderer>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { renderer, tx }
    }

    pub fn emit(&self, event: FlowEvent) {
        self.renderer.on_event(&event);
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.tx.subscribe()
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
