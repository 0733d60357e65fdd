//! Attempt state machine types
//!
//! The state table, the attempt record it governs, the failure taxonomy and
//! the events a running attempt publishes. The engine that drives attempts
//! lives in `covera-app`.

pub mod attempt;
pub mod events;
pub mod failure;
pub mod state;

pub use attempt::{AttemptReport, FlowKind, FlowSubject, TransactionAttempt};
pub use events::{ChoiceRequest, FlowEvent, ManualPaymentRequest, MethodChoice};
pub use failure::{Failure, FailureReason, FundsStatus};
pub use state::AttemptState;
