//! Covera Testing Infrastructure
//!
//! Scriptable in-memory handlers for every effect trait in `covera-core`,
//! a renderer that records what it is shown, and identity fixtures.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! covera-testkit = { path = "../covera-testkit" }
//! ```
//!
//! ```rust,no_run
//! use covera_testkit::*;
//!
//! let wallet = MockWallet::new(alice());
//! wallet.hold_confirmations();
//! let backend = MockBackend::new();
//! backend.script_manual_polls([false, false, true]);
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod backend;
pub mod fixtures;
pub mod keys;
pub mod renderer;
pub mod wallet;

pub use backend::MockBackend;
pub use fixtures::*;
pub use keys::MemoryKeyExporter;
pub use renderer::RecordingRenderer;
pub use wallet::MockWallet;
