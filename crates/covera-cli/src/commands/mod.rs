//! CLI command handlers and the shared app context

pub mod flows;
pub mod info;
pub mod keys;

use crate::render::TerminalRenderer;
use anyhow::{bail, Context as _, Result};
use clap::Args;
use covera_app::{AppConfig, AttemptHandle, CoveraApp, IdentityRequest};
use covera_core::flow::{AttemptReport, AttemptState, FlowEvent, MethodChoice};
use covera_core::types::{Identity, PaymentMethod};
use covera_http::{HttpBackend, JsonRpcWallet, RpcWalletConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// Loaded configuration plus the wallet endpoint
pub struct Context {
    pub config: AppConfig,
    pub wallet_rpc: String,
}

impl Context {
    pub fn load(config_path: Option<&Path>, wallet_rpc: Option<String>) -> Result<Self> {
        let config = AppConfig::load(config_path).context("loading configuration")?;
        let wallet_rpc = wallet_rpc.unwrap_or_else(|| config.chain.network.rpc_url.clone());
        Ok(Self { config, wallet_rpc })
    }

    /// Wire the app against the HTTP backend and the JSON-RPC wallet
    pub fn app(&self) -> Result<CoveraApp> {
        let timeout = Duration::from_millis(self.config.backend.request_timeout_ms);
        let backend = HttpBackend::new(&self.config.backend.api_url, timeout)?;
        let mut rpc = RpcWalletConfig::new(self.wallet_rpc.clone());
        rpc.request_timeout = timeout;
        let wallet = JsonRpcWallet::new(rpc)?;

        let app = CoveraApp::builder(self.config.clone())
            .backend(Arc::new(backend))
            .wallet(Arc::new(wallet))
            .renderer(Arc::new(TerminalRenderer::new(self.config.chain.network.clone())))
            .build()?;
        Ok(app)
    }
}

/// How the command signs
#[derive(Args, Debug, Clone, Default)]
pub struct IdentityArgs {
    /// Sign with an exported local key bundle instead of the wallet
    #[arg(long, value_name = "FILE")]
    pub key: Option<PathBuf>,

    /// With --key: pay through the connected wallet without asking
    #[arg(long, requires = "key")]
    pub payer_wallet: bool,
}

impl IdentityArgs {
    pub async fn login(&self, app: &CoveraApp) -> Result<Identity> {
        let identity = match &self.key {
            Some(path) => {
                let bundle = std::fs::read_to_string(path)
                    .with_context(|| format!("reading key bundle {}", path.display()))?;
                app.login(IdentityRequest::ImportLocalKey(bundle)).await?
            }
            None => app.login(IdentityRequest::ExternalWallet).await?,
        };
        println!("Signed in as {} ({})", identity.address, identity.capability);
        if self.payer_wallet {
            let payer = app.attach_payer_wallet().await?;
            println!("Paying from wallet {payer}");
        }
        Ok(identity)
    }
}

/// Payment method preset on the command line
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    /// Sign through the wallet
    Wallet,
    /// Transfer manually and have the backend verify it
    Manual,
}

impl From<MethodArg> for PaymentMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Wallet => PaymentMethod::Wallet,
            MethodArg::Manual => PaymentMethod::Manual,
        }
    }
}

/// Read one line from stdin
async fn prompt(question: &str) -> Result<String> {
    println!("{question}");
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await??;
    Ok(line.trim().to_ascii_lowercase())
}

async fn ask_method() -> Result<MethodChoice> {
    loop {
        let answer = prompt("Pay with [w]allet, [m]anual transfer, or [c]ancel?").await?;
        match answer.as_str() {
            "w" | "wallet" => return Ok(MethodChoice::Wallet),
            "m" | "manual" => return Ok(MethodChoice::Manual),
            "c" | "cancel" | "" => return Ok(MethodChoice::Decline),
            _ => println!("Please answer w, m or c."),
        }
    }
}

/// Answer one round of a manual payment; returns after the poll or a state change
async fn manual_round(
    handle: &AttemptHandle,
    events: &mut tokio::sync::broadcast::Receiver<FlowEvent>,
) -> Result<()> {
    let answer = prompt("Press Enter once the transfer is sent, or type q to cancel.").await?;
    if answer == "q" {
        handle.cancel()?;
        return Ok(());
    }
    handle.confirm_manual_payment_sent()?;

    let mut watch = handle.watch();
    watch.borrow_and_update();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(FlowEvent::ManualPollNegative { attempt_id, .. }) if attempt_id == handle.id() => {
                    return Ok(());
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Ok(()),
            },
            changed = watch.changed() => {
                if changed.is_err() || watch.borrow().state != AttemptState::AwaitingSigning {
                    return Ok(());
                }
            }
        }
    }
}

/// Follow an attempt to its end, answering prompts on stdin
pub async fn drive(handle: AttemptHandle) -> Result<AttemptReport> {
    let mut events = handle.subscribe();
    let mut watch = handle.watch();
    let mut answered_choice = false;

    loop {
        let report = watch.borrow_and_update().clone();
        if report.is_terminal() {
            return Ok(report);
        }
        if report.state == AttemptState::AwaitingMethodChoice && !answered_choice {
            answered_choice = true;
            handle.resolve_choice(ask_method().await?)?;
        } else if report.state == AttemptState::AwaitingSigning
            && report.method == Some(PaymentMethod::Manual)
        {
            manual_round(&handle, &mut events).await?;
            continue;
        }
        if watch.changed().await.is_err() {
            return Ok(handle.report());
        }
    }
}

/// Print the outcome; failures and cancellations become errors
pub fn finish(ctx: &Context, report: &AttemptReport) -> Result<()> {
    match report.state {
        AttemptState::Succeeded => {
            println!("Done: {} for {}", report.subject, report.owner.short());
            if let Some(settlement) = &report.settlement {
                println!("  reference: {}", settlement.reference().as_str());
                if !settlement.on_chain_ref().is_empty() {
                    println!("  on chain:  {}", settlement.on_chain_ref());
                }
                if let Some(note) = settlement.note() {
                    println!("  {note}");
                }
            }
            if let Some(tx) = &report.external_tx_ref {
                if tx.as_str().starts_with("0x") {
                    println!("  explorer:  {}", ctx.config.chain.network.tx_url(tx));
                }
            }
            Ok(())
        }
        AttemptState::Failed => {
            let message = report
                .failure
                .as_ref()
                .map(|failure| failure.user_message())
                .unwrap_or_else(|| "attempt failed".to_string());
            if let Some(tx) = &report.external_tx_ref {
                eprintln!("Transaction reference: {tx}");
            }
            bail!(message)
        }
        AttemptState::Cancelled => {
            if let Some(tx) = &report.external_tx_ref {
                bail!("cancelled after submission; check {tx} before retrying")
            }
            bail!("cancelled, nothing was charged")
        }
        state => bail!("attempt stopped in {state}"),
    }
}
