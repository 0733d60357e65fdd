//! Flow commands: buy, stake, claim, simulate

use super::{drive, finish, info, Context, IdentityArgs, MethodArg};
use anyhow::{bail, Result};
use clap::Args;
use covera_app::pricing;
use covera_core::types::{Amount, PaymentMethod, PolicyOptions, ProductKind};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BuyArgs {
    /// HEALTH, VEHICLE or PARAMETRIC
    pub product: ProductKind,

    /// Request a shielded payout
    #[arg(long)]
    pub private: bool,

    /// Parametric trigger, e.g. "Earthquake > 6.0"
    #[arg(long)]
    pub trigger: Option<String>,

    /// Skip the method prompt
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    #[command(flatten)]
    pub identity: IdentityArgs,
}

#[derive(Args, Debug)]
pub struct StakeArgs {
    /// Amount in USDC, e.g. 250 or 12.5
    pub amount: Amount,

    /// Skip the method prompt
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    #[command(flatten)]
    pub identity: IdentityArgs,
}

#[derive(Args, Debug)]
pub struct ClaimArgs {
    /// What happened
    pub description: String,

    /// Claimed amount in USDC; taken from the evidence estimate when omitted
    #[arg(required_unless_present = "evidence")]
    pub amount: Option<Amount>,

    /// Photo or document analysed before submitting
    #[arg(long, value_name = "FILE")]
    pub evidence: Option<PathBuf>,

    #[command(flatten)]
    pub identity: IdentityArgs,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Event key, e.g. earthquake_8 or flight_delay
    pub event: String,

    /// Attribute the event to the connected wallet instead of the demo address
    #[arg(long, conflicts_with = "key")]
    pub wallet: bool,

    /// Attribute the event to a local key bundle
    #[arg(long, value_name = "FILE")]
    pub key: Option<PathBuf>,
}

pub async fn buy(ctx: &Context, args: BuyArgs) -> Result<()> {
    let app = ctx.app()?;
    args.identity.login(&app).await?;

    let mut options = PolicyOptions {
        is_private: args.private,
        trigger: None,
    };
    if let Some(trigger) = args.trigger {
        options = options.with_trigger(trigger);
    }
    let mut intent = pricing::policy_intent(args.product, options)?;
    if let Some(method) = args.method {
        intent = intent.with_method(PaymentMethod::from(method));
    }
    println!(
        "Buying {} cover for ${} USDC ({} {})",
        intent.product(),
        intent.price(),
        app.payments().payment_value(&intent).format_ether(),
        ctx.config.chain.network.native_symbol
    );

    let report = drive(app.payments().start(intent)?).await?;
    app.shutdown();
    finish(ctx, &report)
}

pub async fn stake(ctx: &Context, args: StakeArgs) -> Result<()> {
    let app = ctx.app()?;
    args.identity.login(&app).await?;

    let mut intent = pricing::stake_intent(args.amount)?;
    if let Some(method) = args.method {
        intent = intent.with_method(PaymentMethod::from(method));
    }
    let projection = app.stake_projection(args.amount.as_f64());
    println!(
        "Staking ${} USDC: about ${:.2} per month, {:.4}% of the pool",
        args.amount, projection.monthly_reward, projection.pool_share_percent
    );

    let report = drive(app.payments().start(intent)?).await?;
    app.shutdown();
    finish(ctx, &report)
}

pub async fn claim(ctx: &Context, args: ClaimArgs) -> Result<()> {
    let app = ctx.app()?;
    args.identity.login(&app).await?;

    let mut amount = args.amount;
    if let Some(path) = &args.evidence {
        let suggested = info::analyze(&app, path).await?;
        if amount.is_none() {
            amount = suggested;
        }
    }
    let Some(amount) = amount else {
        bail!("the evidence gave no damage estimate; pass the amount explicitly")
    };
    println!("Claiming ${amount} USDC");

    let handle = app.submit_claim(&args.description, amount)?;
    let report = drive(handle).await?;
    app.shutdown();
    finish(ctx, &report)
}

pub async fn simulate(ctx: &Context, args: SimulateArgs) -> Result<()> {
    let app = ctx.app()?;
    if args.wallet || args.key.is_some() {
        let identity = IdentityArgs {
            key: args.key,
            payer_wallet: false,
        };
        identity.login(&app).await?;
    }

    let report = drive(app.simulate_event(&args.event)?).await?;
    app.shutdown();
    finish(ctx, &report)
}
