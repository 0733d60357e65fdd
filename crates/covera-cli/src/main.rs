//! Covera command-line frontend
//!
//! Drives the client core against the HTTP backend and a JSON-RPC wallet.
//! Flow progress is printed by the terminal renderer; payment method choices
//! and manual transfers are answered on stdin unless preset with flags.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

use commands::{
    flows::{self, BuyArgs, ClaimArgs, SimulateArgs, StakeArgs},
    info::{self, PoolArgs},
    keys, Context,
};

#[derive(Parser)]
#[command(name = "covera")]
#[command(about = "Covera - insurance purchase, staking and claims from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (TOML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint of the wallet provider (defaults to the chain RPC)
    #[arg(long, global = true)]
    wallet_rpc: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a local signing key and export its bundle
    Keygen {
        /// Directory the key bundle is written to
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show quoted prices and on-chain payment values
    Quote,

    /// List the view routes
    Routes,

    /// Buy a policy
    Buy(BuyArgs),

    /// Stake liquidity into the reinsurance pool
    Stake(StakeArgs),

    /// Submit a claim for assessment
    Claim(ClaimArgs),

    /// Have the backend assess an evidence file
    Evidence {
        /// Photo or document of the damage
        file: PathBuf,
    },

    /// Show one stored claim
    ClaimStatus {
        /// Claim identifier
        id: String,
    },

    /// Feed a sensor event to the parametric oracle
    Simulate(SimulateArgs),

    /// Show pool figures, your position and a stake projection
    Pool(PoolArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ctx = Context::load(cli.config.as_deref(), cli.wallet_rpc)?;

    match cli.command {
        Commands::Keygen { out } => keys::keygen(ctx, out).await?,
        Commands::Quote => info::quote(&ctx)?,
        Commands::Routes => info::routes(),
        Commands::Buy(args) => flows::buy(&ctx, args).await?,
        Commands::Stake(args) => flows::stake(&ctx, args).await?,
        Commands::Claim(args) => flows::claim(&ctx, args).await?,
        Commands::Evidence { file } => info::evidence(&ctx, &file).await?,
        Commands::ClaimStatus { id } => info::claim_status(&ctx, &id).await?,
        Commands::Simulate(args) => flows::simulate(&ctx, args).await?,
        Commands::Pool(args) => info::pool(&ctx, args).await?,
    }

    Ok(())
}
