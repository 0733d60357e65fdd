//! In-memory key export

#![allow(clippy::disallowed_types)]

use async_trait::async_trait;
use covera_core::effects::{ExportReceipt, KeyExport, KeyExportEffects};
use covera_core::errors::KeyExportError;
use std::sync::{Arc, Mutex};

/// Key exporter that keeps bundles in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyExporter {
    exported: Arc<Mutex<Vec<KeyExport>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryKeyExporter {
    /// Exporter that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Exporter that rejects every bundle
    pub fn failing() -> Self {
        let exporter = Self::default();
        *exporter.failing.lock().unwrap() = true;
        exporter
    }

    /// Bundles exported so far
    pub fn exported(&self) -> Vec<KeyExport> {
        self.exported.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyExportEffects for MemoryKeyExporter {
    async fn export(&self, bundle: &KeyExport) -> Result<ExportReceipt, KeyExportError> {
        if *self.failing.lock().unwrap() {
            return Err(KeyExportError::Io {
                message: "disk full".to_string(),
            });
        }
        self.exported.lock().unwrap().push(bundle.clone());
        Ok(ExportReceipt {
            location: format!("memory://{}", bundle.file_name()),
        })
    }
}
