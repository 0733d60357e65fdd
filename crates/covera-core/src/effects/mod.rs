//! Effect interfaces
//!
//! Pure trait definitions. Production handlers live in `covera-http`,
//! deterministic mocks in `covera-testkit`.

pub mod backend;
pub mod keys;
pub mod render;
pub mod wallet;

pub use backend::BackendEffects;
pub use keys::{ExportReceipt, KeyExport, KeyExportEffects};
pub use render::{NullRenderer, Renderer};
pub use wallet::{ChainSpec, Confirmation, TransactionRequest, WalletEffects};
