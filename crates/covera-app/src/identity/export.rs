//! Key bundle export to the filesystem

use async_trait::async_trait;
use covera_core::effects::{ExportReceipt, KeyExport, KeyExportEffects};
use covera_core::errors::KeyExportError;
use std::path::PathBuf;

/// Writes bundles as pretty JSON files into a directory
#[derive(Debug, Clone)]
pub struct FileKeyExporter {
    dir: PathBuf,
}

impl FileKeyExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl KeyExportEffects for FileKeyExporter {
    async fn export(&self, bundle: &KeyExport) -> Result<ExportReceipt, KeyExportError> {
        let json = serde_json::to_string_pretty(bundle).map_err(|e| KeyExportError::Encoding {
            message: e.to_string(),
        })?;
        std::fs::create_dir_all(&self.dir).map_err(|e| KeyExportError::Io {
            message: format!("create {}: {e}", self.dir.display()),
        })?;
        let path = self.dir.join(bundle.file_name());
        std::fs::write(&path, json).map_err(|e| KeyExportError::Io {
            message: format!("write {}: {e}", path.display()),
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }
        tracing::info!(path = %path.display(), address = %bundle.address, "Key bundle exported");
        Ok(ExportReceipt {
            location: path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covera_core::identifiers::Address;

    #[tokio::test]
    async fn writes_named_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = FileKeyExporter::new(dir.path().join("keys"));
        let bundle = KeyExport {
            address: Address::new("0xdeadbeef00000000000000000000000000000001"),
            private_key: "0x01".to_string(),
            note: KeyExport::NOTE.to_string(),
            generated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let receipt = exporter.export(&bundle).await.unwrap();
        assert!(receipt.location.ends_with("covera_key_deadbeef.json"));
        let written = std::fs::read_to_string(&receipt.location).unwrap();
        let back: KeyExport = serde_json::from_str(&written).unwrap();
        assert_eq!(back, bundle);
    }

    #[tokio::test]
    async fn unwritable_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let exporter = FileKeyExporter::new(blocker.join("keys"));
        let bundle = KeyExport {
            address: Address::new("0x01"),
            private_key: "0x01".to_string(),
            note: String::new(),
            generated_at: String::new(),
        };
        assert!(matches!(
            exporter.export(&bundle).await,
            Err(KeyExportError::Io { .. })
        ));
    }
}
