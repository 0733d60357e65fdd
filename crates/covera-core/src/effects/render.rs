//! Renderer interface
//!
//! The renderer is the presentation layer. It receives every `FlowEvent` in
//! publication order and answers choices through the attempt handle, never
//! through this trait.

use crate::flow::FlowEvent;
use std::sync::Arc;

/// Presentation sink for flow events
pub trait Renderer: Send + Sync {
    /// Called synchronously for each event; must not block
    fn on_event(&self, event: &FlowEvent);
}

/// Renderer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn on_event(&self, _event: &FlowEvent) {}
}

impl<T: Renderer + ?Sized> Renderer for Arc<T> {
    fn on_event(&self, event: &FlowEvent) {
        (**self).on_event(event);
    }
}
