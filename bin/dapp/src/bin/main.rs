//! Command line client for an ERC20 token.
//!
//! - `info`: connect the wallet and show the token and the account balance
//! - `transfer`: send tokens from the connected account
//! - `history`: list recent `Transfer` events of the token
//! - `watch`: follow the wallet and the balance until interrupted

use alloy_primitives::{Address, U256};
use clap::{Parser, Subcommand};
use client::{ChainReader, ChainWallet, RemoteSigner, TokenProvider, Wallet, WalletSigner};
use dapp::{config::Config, metrics::install_prometheus_exporter, Dapp};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "dapp")]
#[command(about = "Connect a wallet, read an ERC20 token and transfer it")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Private key for signing transactions (hex string, with or without 0x prefix)
    #[arg(short = 'k', long, env = "PRIVATE_KEY")]
    private_key: Option<String>,

    /// Url of a signer-proxy that approves and signs transactions
    #[arg(long, env = "SIGNER_URL", conflicts_with = "private_key")]
    signer_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the token and the balance of the connected account
    Info,

    /// Transfer tokens to another address
    Transfer {
        /// Recipient address
        #[arg(long)]
        to: Address,

        /// Amount in base units of the token
        #[arg(long)]
        amount: U256,
    },

    /// List recent transfers of the token
    History {
        /// Number of blocks to scan, defaults to the configured lookback
        #[arg(long)]
        lookback: Option<u64>,
    },

    /// Follow wallet and balance changes until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    let network = config.network_config();
    let token = config.token_address()?;

    info!("Loaded config:");
    info!("  Network: {} (chain id {})", network.name, network.chain_id);
    info!("  RPC URL: {}", network.rpc_url);
    info!("  Token: {}", token);

    if let Some(port) = config.metrics_port {
        install_prometheus_exporter(port)?;
        info!("  Metrics: 0.0.0.0:{}", port);
    }

    let provider = client::create_provider(&network.rpc_url)?;

    let signer = match (cli.private_key, cli.signer_url) {
        (Some(private_key), _) => Some(client::local_signer(&private_key)?),
        (None, Some(url)) => Some(WalletSigner::Remote(RemoteSigner::new(url))),
        (None, None) => None,
    };
    let wallet = signer.map(|signer| Arc::new(ChainWallet::new(provider.clone(), signer)));

    let dapp = Arc::new(Dapp::new(
        wallet.clone(),
        Arc::new(ChainReader::new(provider)),
        token,
        network,
        config.poll_interval(),
    ));

    match cli.command {
        Command::Info => {
            if dapp.session().has_wallet() {
                let address = dapp.connect().await?;
                let balance = dapp.reader().refresh_balance(address).await?;
                dapp.metrics().set_balance(balance);
            }
            println!("{}", dapp.view());
        }
        Command::Transfer { to, amount } => {
            dapp.connect().await?;

            info!(%to, %amount, "Running: transfer");
            let receipt = dapp.transfer(to, amount).await?;

            info!(
                tx_hash = %receipt.tx_hash,
                block_number = ?receipt.block_number,
                gas_used = receipt.gas_used,
                "Step completed: transfer"
            );
            println!("{}", dapp.view());
        }
        Command::History { lookback } => {
            let metadata = dapp.reader().ensure_metadata().await?;
            let lookback = lookback.unwrap_or(config.history_lookback_blocks);

            let transfers = dapp.reader().recent_transfers(lookback).await?;
            info!(count = transfers.len(), lookback, "Loaded transfer history");

            for log in transfers {
                println!(
                    "#{} {} -> {}: {} {}",
                    log.block_number.unwrap_or_default(),
                    log.from,
                    log.to,
                    log.value,
                    metadata.symbol
                );
            }
        }
        Command::Watch => {
            let Some(wallet) = wallet else {
                println!("{}", dapp.view());
                return Ok(());
            };

            let watch_interval = config.watch_interval();
            let watcher = tokio::spawn(async move {
                if let Err(e) = wallet.watch(watch_interval).await {
                    warn!(error = %e, "Wallet watcher stopped");
                }
            });

            dapp.connect().await?;
            follow(&dapp).await?;

            watcher.abort();
            dapp.disconnect();
        }
    }

    Ok(())
}

/// Print the view whenever the session or the token state changes.
async fn follow<W, P>(dapp: &Dapp<W, P>) -> eyre::Result<()>
where
    W: Wallet + 'static,
    P: TokenProvider + 'static,
{
    let mut sessions = dapp.session().subscribe();
    let mut tokens = dapp.reader().subscribe();

    let mut last = dapp.view();
    println!("{last}");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
            changed = sessions.changed() => changed?,
            changed = tokens.changed() => changed?,
        }

        if let Some(balance) = dapp.reader().balance() {
            dapp.metrics().set_balance(balance.amount);
        }

        let view = dapp.view();
        if view != last {
            println!("{view}");
            last = view;
        }
    }
}
