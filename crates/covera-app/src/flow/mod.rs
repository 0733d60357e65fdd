//! Transaction flow engine
//!
//! Generic over the subject being driven: purchases, stakes, claims and
//! parametric events share one runner and differ only in their stages.

mod handle;
mod narration;
mod runner;
mod sink;
mod stages;

pub use handle::AttemptHandle;
pub use narration::{oracle_script, NarrationFeed};
pub use runner::FlowEngine;
pub use sink::EventSink;
pub use stages::{FlowStages, MethodRequirement, StageContext, StageError};
