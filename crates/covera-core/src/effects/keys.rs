//! Key export effects
//!
//! A generated local key is only usable once its bundle has been exported
//! somewhere durable. The bundle format is the JSON backup users download.

use crate::errors::KeyExportError;
use crate::identifiers::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroize;

/// Exported key bundle
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyExport {
    /// Address derived from the key
    pub address: Address,
    /// Hex-encoded secret key
    pub private_key: String,
    /// Storage warning shown with the bundle
    pub note: String,
    /// RFC 3339 creation time
    pub generated_at: String,
}

impl KeyExport {
    /// Default storage warning
    pub const NOTE: &'static str =
        "Store this file securely. Anyone holding it controls this identity.";

    /// File name for the bundle (`covera_key_{first 8 hex chars}.json`)
    pub fn file_name(&self) -> String {
        let hex = self.address.as_str().trim_start_matches("0x");
        let prefix: String = hex.chars().take(8).collect();
        format!("covera_key_{prefix}.json")
    }
}

impl fmt::Debug for KeyExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyExport")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .field("generated_at", &self.generated_at)
            .finish()
    }
}

impl Drop for KeyExport {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

/// Where an export ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReceipt {
    /// Path or other locator of the written bundle
    pub location: String,
}

/// Durable export of generated key material
#[async_trait]
pub trait KeyExportEffects: Send + Sync {
    /// Persist the bundle; the identity is created only if this succeeds
    async fn export(&self, bundle: &KeyExport) -> Result<ExportReceipt, KeyExportError>;
}

/// Blanket implementation for Arc<T> where T: KeyExportEffects
#[async_trait]
impl<T: KeyExportEffects + ?Sized> KeyExportEffects for Arc<T> {
    async fn export(&self, bundle: &KeyExport) -> Result<ExportReceipt, KeyExportError> {
        (**self).export(bundle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> KeyExport {
        KeyExport {
            address: Address::new("0x1234567890abcdef1234567890abcdef12345678"),
            private_key: "00ff".repeat(16),
            note: KeyExport::NOTE.to_string(),
            generated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn file_name_uses_address_prefix() {
        assert_eq!(bundle().file_name(), "covera_key_12345678.json");
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", bundle());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("00ff00ff"));
    }

    #[test]
    fn json_uses_camel_case() {
        let json = serde_json::to_value(bundle()).unwrap();
        assert!(json.get("privateKey").is_some());
        assert!(json.get("generatedAt").is_some());
    }
}
