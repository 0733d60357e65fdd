//! Covera HTTP Effect Handlers
//!
//! Production implementations of the core's infrastructure effects:
//!
//! - [`HttpBackend`]: JSON client for the Covera backend API
//! - [`JsonRpcWallet`]: wallet and chain provider spoken to over JSON-RPC
//!
//! Both handlers are stateless apart from their HTTP client and can be shared
//! behind an `Arc` by every flow of an application.

#![forbid(unsafe_code)]

pub mod backend;
pub mod rpc;

pub use backend::HttpBackend;
pub use rpc::{JsonRpcWallet, RpcWalletConfig};
