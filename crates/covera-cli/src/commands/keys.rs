//! Local key generation

use super::Context;
use anyhow::Result;
use covera_app::IdentityRequest;
use std::path::PathBuf;

/// Generate a key; the bundle is exported before the identity is usable
pub async fn keygen(mut ctx: Context, out: Option<PathBuf>) -> Result<()> {
    if let Some(dir) = out {
        ctx.config.identity.key_dir = dir;
    }
    let app = ctx.app()?;
    let identity = app.login(IdentityRequest::GenerateLocalKey).await?;
    println!("Generated local key {}", identity.address);
    println!(
        "Bundle written to {}",
        ctx.config.identity.key_dir.display()
    );
    println!("Keep it safe: it is the only copy of the private key.");
    Ok(())
}
