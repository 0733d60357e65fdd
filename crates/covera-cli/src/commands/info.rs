//! Read-only commands

use super::{Context, IdentityArgs};
use anyhow::{Context as _, Result};
use clap::Args;
use covera_app::{pricing, router, CoveraApp};
use covera_core::types::{Amount, EvidenceFile, PolicyOptions, ProductKind};
use std::path::Path;

#[derive(Args, Debug)]
pub struct PoolArgs {
    /// Project rewards for staking this many USDC
    #[arg(long)]
    pub stake: Option<f64>,

    /// Include your own position
    #[arg(long)]
    pub mine: bool,

    #[command(flatten)]
    pub identity: IdentityArgs,
}

pub fn quote(ctx: &Context) -> Result<()> {
    let app = ctx.app()?;
    let symbol = &ctx.config.chain.network.native_symbol;
    for product in ProductKind::POLICIES {
        let intent = pricing::policy_intent(product, PolicyOptions::default())?;
        println!(
            "{:<12} ${:>6} USDC   pays {} {symbol}",
            product.as_str(),
            intent.price(),
            app.payments().payment_value(&intent).format_ether(),
        );
    }
    println!(
        "{:<12} any amount, paid 1:1 to the insurance contract",
        ProductKind::Stake.as_str()
    );
    Ok(())
}

pub fn routes() {
    for (path, view) in router::routes() {
        println!("{path:<12} {view:?}");
    }
    println!("{:<12} ClaimDetail", "/claim/{id}");
}

/// Upload `path` for assessment and print the verdict
pub async fn analyze(app: &CoveraApp, path: &Path) -> Result<Option<Amount>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading evidence {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "evidence".to_string());
    let (analysis, suggested) = app.analyze_evidence(&EvidenceFile::new(name, bytes)).await?;

    println!("Evidence {}", path.display());
    if let Some(severity) = analysis.severity_score {
        println!("  severity:   {severity:.0}/10");
    }
    if let Some(estimate) = analysis.estimated_amount {
        println!("  estimate:   ${estimate:.2}");
    }
    let risk = if analysis.fraud_indicator { "high" } else { "low" };
    println!("  fraud risk: {risk}");
    println!("  {}", analysis.description());
    Ok(suggested)
}

pub async fn evidence(ctx: &Context, path: &Path) -> Result<()> {
    let app = ctx.app()?;
    if let Some(amount) = analyze(&app, path).await? {
        println!("Suggested claim amount: ${amount}");
    }
    app.shutdown();
    Ok(())
}

pub async fn claim_status(ctx: &Context, id: &str) -> Result<()> {
    let app = ctx.app()?;
    let record = app.claim_detail(id).await?;
    println!("Claim {}: {}", record.claim_id, record.decision().label());
    if let Some(amount) = record.claimed_amount {
        println!("  claimed:     ${amount:.2}");
    }
    if let Some(payout) = record.payout_amount {
        println!("  payout:      ${payout:.2}");
    }
    if let Some(score) = record.fraud_score {
        println!("  fraud score: {score:.1}/100");
    }
    if let Some(tx) = &record.on_chain_tx_hash {
        println!("  decision tx: {tx}");
    }
    for step in &record.thinking_steps {
        println!("  > {step}");
    }
    Ok(())
}

pub async fn pool(ctx: &Context, args: PoolArgs) -> Result<()> {
    let app = ctx.app()?;
    if args.mine || args.identity.key.is_some() {
        args.identity.login(&app).await?;
    }

    let view = app.refresh_portfolio().await;
    match &view.pool {
        Some(pool) => println!(
            "Pool: ${:.2} locked, {:.1}% yield",
            pool.total_locked, pool.yield_rate
        ),
        None => println!("Pool figures unavailable"),
    }

    if view.owner.is_some() {
        if let Some(position) = app.pool_position() {
            println!(
                "Your stake: ${:.2} ({:.4}% of the pool), ${:.2} earned, ~${:.2}/month",
                position.stake,
                position.pool_share_percent,
                position.rewards,
                position.monthly_reward
            );
        }
        if let Some(portfolio) = &view.portfolio {
            for policy in &portfolio.policies {
                let marker = if policy.is_staker_benefit() {
                    " (staker benefit)"
                } else {
                    ""
                };
                println!(
                    "  {} {}{marker}",
                    policy.policy_type,
                    policy.policy_id.as_deref().unwrap_or("-")
                );
            }
        }
    }

    for event in &view.events {
        println!("  * {}", event.text);
    }

    if let Some(amount) = args.stake {
        let projection = app.stake_projection(amount);
        println!(
            "Staking ${amount:.2}: ${:.2}/month, ${:.2}/year, {:.4}% of the pool",
            projection.monthly_reward, projection.yearly_reward, projection.pool_share_percent
        );
    }
    app.shutdown();
    Ok(())
}
