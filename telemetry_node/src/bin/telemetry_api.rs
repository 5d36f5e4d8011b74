use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use telemetry_node::{
    api::{ApiServer, AppState},
    crypto::ReadingCipher,
    ledger::EvmLedgerReader,
    pipeline::{DecryptedPayload, ReadingPipeline},
    Config,
};

/// Telemetry API Arguments
#[derive(Parser)]
#[clap(name = "telemetry-api")]
#[clap(about = "Read-only decrypting API for on-chain sensor telemetry")]
struct Args {
    /// Path to a configuration file (yaml, toml or json)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured API port
    #[clap(long, global = true)]
    port: Option<u16>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Encrypt a reading with the configured key and print ciphertext and nonce
    Seal {
        #[clap(long, allow_hyphen_values = true)]
        temperature: f64,
        #[clap(long)]
        humidity: f64,
        /// Unix seconds; defaults to now
        #[clap(long)]
        timestamp: Option<i64>,
    },
    /// Print a fresh random 32-byte key as hex
    Keygen,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command.unwrap_or(Command::Serve) {
        Command::Keygen => {
            println!("{}", ReadingCipher::generate_key_hex());
            Ok(())
        }
        Command::Seal {
            temperature,
            humidity,
            timestamp,
        } => {
            let config = Config::load(args.config.as_deref())?;
            let cipher = config.cipher()?;
            let payload = DecryptedPayload {
                temperature,
                humidity,
                timestamp: timestamp.unwrap_or_else(|| Utc::now().timestamp()),
            };
            let sealed = cipher.seal(&payload)?;
            println!("ciphertext: 0x{}", hex::encode(&sealed.ciphertext));
            println!("nonce:      0x{}", hex::encode(&sealed.nonce));
            Ok(())
        }
        Command::Serve => serve(args.config, args.port).await,
    }
}

async fn serve(config_path: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    info!("Starting telemetry API...");
    if let Some(path) = &config_path {
        info!("Config path: {:?}", path);
    }

    let mut config = Config::load(config_path.as_deref()).context("failed to load configuration")?;
    if let Some(port) = port {
        config.port = port;
    }
    config.validate().context("invalid configuration")?;
    info!("{:?}", config);

    let cipher = config.cipher()?;
    let ledger = EvmLedgerReader::new(&config.rpc_url, &config.contract_address, config.rpc_timeout())
        .context("failed to initialize ledger reader")?;
    info!("RPC URL: {}", config.rpc_url);

    let pipeline = ReadingPipeline::new(Arc::new(ledger), cipher, config.pipeline_options());
    let state = AppState::new(pipeline, config.contract_address.clone(), config.allowed_origins.clone());

    ApiServer::new(config.port, state).run().await
}
