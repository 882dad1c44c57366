//! MPC Client CLI
//!
//! Runs the demo flow against the in-process signing party.

use alloy_primitives::U256;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mpc_client_core::{
    ClientConfig, KeygenOutcome, LocalMpcSdk, LocalSdkConfig, MpcClient, PartyRole, SendOutcome,
    config::DEFAULT_RECEIVER,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "mpc-client")]
#[command(about = "MPC Wallet Demo Client", version)]
struct Cli {
    /// Enable debug diagnostics (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, generate a key share, bind a wallet and send half its balance
    Demo {
        /// Wei credited to the new wallet before sending
        #[arg(short, long, default_value = "100", value_parser = parse_wei)]
        fund: U256,

        /// JSON configuration file
        #[arg(short, long, env = "MPC_CLIENT_CONFIG")]
        config: Option<PathBuf>,

        /// Receiver of the transfer
        #[arg(short, long)]
        receiver: Option<String>,

        /// Seconds to wait for the signing connection
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Milliseconds of simulated latency on every signing-party call
        #[arg(long, default_value = "0")]
        latency: u64,

        /// Times to retry a failed connection before giving up
        #[arg(long, default_value = "0")]
        retries: u32,

        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version and effective configuration
    Info {
        /// JSON configuration file
        #[arg(short, long, env = "MPC_CLIENT_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .pretty()
        .init();

    match cli.command {
        Commands::Demo {
            fund,
            config,
            receiver,
            timeout,
            latency,
            retries,
            json,
        } => {
            let config = load_config(config.as_deref(), receiver)?;
            let options = DemoOptions {
                fund,
                timeout: Duration::from_secs(timeout),
                latency: Duration::from_millis(latency),
                retries,
                json,
            };
            run_demo(config, options).await?;
        }
        Commands::Info { config } => {
            let config = load_config(config.as_deref(), None)?;
            show_info(&config);
        }
    }

    Ok(())
}

fn parse_wei(s: &str) -> std::result::Result<U256, String> {
    U256::from_str(s).map_err(|e| format!("invalid wei amount {:?}: {}", s, e))
}

fn load_config(path: Option<&Path>, receiver: Option<String>) -> Result<ClientConfig> {
    let mut config = match path {
        Some(path) => ClientConfig::from_json_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ClientConfig::default(),
    };

    if let Some(receiver) = receiver {
        config = config.with_receiver(receiver);
    }
    config.validate().context("invalid configuration")?;

    Ok(config)
}

struct DemoOptions {
    fund: U256,
    timeout: Duration,
    latency: Duration,
    retries: u32,
    json: bool,
}

async fn run_demo(config: ClientConfig, options: DemoOptions) -> Result<()> {
    let DemoOptions {
        fund,
        timeout,
        latency,
        retries,
        json,
    } = options;

    let sdk = LocalMpcSdk::with_config(LocalSdkConfig::default().with_latency(latency));
    let client = MpcClient::new(Arc::new(sdk.clone()), config)?;

    client.sign_in().await.context("sign-in failed")?;

    if let KeygenOutcome::Failed { error } = client.generate_key_share().await? {
        bail!("key share generation failed: {}", error.message);
    }

    let mut attempts = 0;
    let wallet = loop {
        match client.wait_for_wallet(timeout).await {
            Ok(wallet) => break wallet,
            Err(e) if e.is_retryable() && attempts < retries => {
                attempts += 1;
                warn!(attempt = attempts, "Connection not ready: {}", e);
                client.retry_connection().await;
            }
            Err(e) => return Err(e).context("no signing connection"),
        }
    };
    info!(address = %wallet.address(), "Wallet bound");

    if !fund.is_zero() {
        sdk.fund(wallet.address(), fund);
        info!(%fund, "Funded wallet from local ledger");
    }

    let outcome = client.send_ethereum_transaction().await?;
    if let SendOutcome::Failed { error } = &outcome {
        warn!(kind = error.kind, "Send failed");
    }

    let snapshot = client.snapshot();
    client.shutdown();

    if json {
        let output = serde_json::json!({
            "state": snapshot,
            "outcome": outcome,
            "ledger": {
                "sender": sdk.balance_of(wallet.address()).to_string(),
                "receiver": sdk.balance_of(&client.config().receiver).to_string(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", snapshot.log);
    println!();
    if let Some(public_key) = &snapshot.session.public_key {
        println!("Public Key: {}", public_key);
    }
    println!("Address: {}", wallet.address());
    if let Some(url) = client.config().network.explorer_address_url(wallet.address()) {
        println!("  {}", url);
    }
    if let SendOutcome::Sent { tx, amount } = &outcome {
        println!("Sent: {}", client.config().network.format_amount(*amount));
        if let Some(url) = &tx.explorer_url {
            println!("Explorer: {}", url);
        }
    }

    Ok(())
}

fn show_info(config: &ClientConfig) {
    println!("MPC Client v{}", mpc_client_core::VERSION);
    println!();
    println!("Scheme:");
    println!(
        "  Parties: {} ({}, {})",
        mpc_client_core::N_PARTIES,
        PartyRole::Client,
        PartyRole::Server
    );
    println!(
        "  Threshold: {}-of-{}",
        mpc_client_core::THRESHOLD,
        mpc_client_core::N_PARTIES
    );
    println!();
    println!("Configuration:");
    println!("  Account: {}", config.credentials.email);
    println!("  Receiver: {}", config.receiver);
    if config.receiver != DEFAULT_RECEIVER {
        println!("    (default {})", DEFAULT_RECEIVER);
    }
    println!(
        "  Network: {} (chain {})",
        config.network.chain_id.name(),
        config.network.chain_id
    );
    println!("  RPC: {}", config.network.rpc_url);
    if let Some(explorer) = &config.network.explorer_url {
        println!("  Explorer: {}", explorer);
    }
    println!("  Event capacity: {}", config.event_capacity);
}
