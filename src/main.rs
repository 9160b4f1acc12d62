//! stos-wallet
//!
//! Sends FIL through a Lotus full node's wallet.
//!
//! ```text
//!   FULLNODE_API_INFO="<token>:<multiaddr>"
//!          │
//!          ▼
//!   ┌─────────────┐   ┌──────────────┐   ┌─────────────────────┐
//!   │  endpoint   │──▶│ rpc builder  │──▶│ transfer dispatcher │──▶ CID
//!   │ parse + DNS │   │ ws + retries │   │ params, push, wait  │
//!   └─────────────┘   └──────────────┘   └─────────────────────┘
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use stos_wallet::blockchain::TransferRequest;
use stos_wallet::config::{endpoint_from_env, load_config, ObservabilityConfig, WalletConfig};
use stos_wallet::lifecycle::signals::cancel_on_ctrl_c;
use stos_wallet::lifecycle::{CancelToken, Context};
use stos_wallet::observability::logging::init_logging;
use stos_wallet::{ConnectionBuilder, FullNode, StorageMiner, TransferDispatcher};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "stos-wallet", version)]
#[command(about = "Send funds through a Lotus node wallet", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send funds between accounts
    Send(SendArgs),
    /// Show versions of the configured nodes
    Info,
}

#[derive(Args)]
struct SendArgs {
    /// Target address
    target: String,

    /// Amount in FIL
    amount: String,

    /// Optionally specify the account to send funds from
    #[arg(long, default_value = "")]
    from: String,

    /// Specify method to invoke
    #[arg(long, default_value_t = 0)]
    method: u64,

    /// Specify gas price to use in attoFIL
    #[arg(long, default_value = "0")]
    gas_premium: String,

    /// Specify gas fee cap to use in attoFIL
    #[arg(long = "gas-feecap", default_value = "0")]
    gas_fee_cap: String,

    /// Specify gas limit
    #[arg(long, default_value_t = 0)]
    gas_limit: i64,

    /// Specify the nonce to use
    #[arg(long)]
    nonce: Option<u64>,

    /// Send even when the sender balance does not cover the amount
    #[arg(long)]
    force: bool,
}

impl SendArgs {
    fn into_request(self) -> TransferRequest {
        TransferRequest {
            from: self.from,
            to: self.target,
            amount: self.amount,
            gas_premium: self.gas_premium,
            gas_fee_cap: self.gas_fee_cap,
            gas_limit: self.gas_limit,
            method: self.method,
            nonce: self.nonce,
            force: self.force,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => load_config(path),
        None => Ok(WalletConfig::default()),
    };
    let fallback = ObservabilityConfig::default();
    init_logging(loaded.as_ref().map(|c| &c.observability).unwrap_or(&fallback));

    let result = match loaded {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "exit in error");
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: WalletConfig) -> CliResult {
    let token = CancelToken::new();
    cancel_on_ctrl_c(token.clone());
    let ctx = token.context();

    match command {
        Commands::Send(args) => send(&ctx, &config, args.into_request()).await,
        Commands::Info => info(&ctx, &config).await,
    }
}

async fn send(ctx: &Context, config: &WalletConfig, req: TransferRequest) -> CliResult {
    let endpoint = endpoint_from_env(&config.endpoints.fullnode_env)?;
    let builder = ConnectionBuilder::<FullNode>::new(&endpoint, &config.connection)?;
    let dispatcher = TransferDispatcher::new(builder, &config.chain);

    let receipt = dispatcher.send(ctx, &req).await?;
    println!("{}", receipt.message);
    println!("included at height {} with exit code {}", receipt.height, receipt.exit_code);
    Ok(())
}

async fn info(ctx: &Context, config: &WalletConfig) -> CliResult {
    let endpoint = endpoint_from_env(&config.endpoints.fullnode_env)?;
    let node = ConnectionBuilder::<FullNode>::new(&endpoint, &config.connection)?
        .build(ctx)
        .await?;
    let version = node.api().common().version().await?;
    println!("full node: {} (api {})", version.version, version.api_version);
    match node.api().wallet_default_address().await {
        Ok(wallet) => {
            let balance = node.api().wallet_balance(&wallet).await?;
            println!("default wallet: {} ({})", wallet, balance.to_fil_string());
        }
        Err(e) => tracing::warn!(error = %e, "No default wallet"),
    }
    node.close();

    let Ok(endpoint) = endpoint_from_env(&config.endpoints.miner_env) else {
        tracing::debug!(env = %config.endpoints.miner_env, "No storage miner configured");
        return Ok(());
    };
    let miner = ConnectionBuilder::<StorageMiner>::new(&endpoint, &config.connection)?
        .build(ctx)
        .await?;
    let version = miner.api().common().version().await?;
    let actor = miner.api().actor_address().await?;
    miner.close();

    println!("storage miner: {} (api {})", version.version, version.api_version);
    println!("miner actor: {}", actor);
    Ok(())
}
