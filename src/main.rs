//! tx-augment - v0 transaction augmentation CLI
//!
//! ## Commands
//!
//! - **augment**: prepend an instruction read from a JSON file
//! - **referral**: prepend the referral token account creation when needed
//! - **inspect**: decode a transaction and print its resolved instructions
//!
//! Transactions are read from the argument, or from stdin when it is `-`.
//! Results go to stdout; logs go to stderr.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use base64::Engine as _;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tx_augment::augment::{
    decode_transaction, referenced_tables, resolve_lookup_tables, resolve_message,
    TransportEncoding,
};
use tx_augment::config::Config;
use tx_augment::referral::augment_with_referral;
use tx_augment::rpc::rpc_client;
use tx_augment::Augmenter;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "tx-augment.toml", global = true)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// RPC endpoint, overrides the configuration file
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prepend an instruction to a transaction
    Augment {
        /// Serialized transaction, or `-` for stdin
        #[arg(short, long)]
        transaction: String,

        /// Fee payer of the augmented transaction
        #[arg(short, long)]
        payer: Pubkey,

        /// JSON file holding the instruction to prepend
        #[arg(short, long)]
        instruction: PathBuf,

        #[arg(long, value_enum, default_value_t = TransportEncoding::Base58)]
        input_encoding: TransportEncoding,

        #[arg(long, value_enum, default_value_t = TransportEncoding::Base58)]
        output_encoding: TransportEncoding,
    },

    /// Prepend the referral token account creation if the account is missing
    Referral {
        /// Base-58 transaction, or `-` for stdin
        #[arg(short, long)]
        transaction: String,

        #[arg(short, long)]
        payer: Pubkey,

        #[arg(short, long)]
        mint: Pubkey,

        #[arg(short, long)]
        referral_owner: Pubkey,
    },

    /// Print the resolved accounts and instructions of a transaction
    Inspect {
        /// Serialized transaction, or `-` for stdin
        #[arg(short, long)]
        transaction: String,

        #[arg(long, value_enum, default_value_t = TransportEncoding::Base58)]
        input_encoding: TransportEncoding,
    },
}

/// JSON form of an instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct InstructionFile {
    program_id: String,
    #[serde(default)]
    accounts: Vec<AccountFile>,
    /// Base-64 instruction data
    #[serde(default)]
    data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AccountFile {
    pubkey: String,
    #[serde(default)]
    is_signer: bool,
    #[serde(default)]
    is_writable: bool,
}

impl TryFrom<InstructionFile> for Instruction {
    type Error = anyhow::Error;

    fn try_from(file: InstructionFile) -> Result<Self> {
        let program_id = file
            .program_id
            .parse::<Pubkey>()
            .with_context(|| format!("Invalid program_id {}", file.program_id))?;
        let accounts = file
            .accounts
            .into_iter()
            .map(|account| {
                Ok(AccountMeta {
                    pubkey: account
                        .pubkey
                        .parse()
                        .with_context(|| format!("Invalid account pubkey {}", account.pubkey))?,
                    is_signer: account.is_signer,
                    is_writable: account.is_writable,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(file.data.trim())
            .context("Instruction data is not valid base64")?;

        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }
}

impl From<&Instruction> for InstructionFile {
    fn from(ix: &Instruction) -> Self {
        Self {
            program_id: ix.program_id.to_string(),
            accounts: ix
                .accounts
                .iter()
                .map(|meta| AccountFile {
                    pubkey: meta.pubkey.to_string(),
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
                .collect(),
            data: base64::engine::general_purpose::STANDARD.encode(&ix.data),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_exists = Path::new(&args.config).exists();
    let mut config = load_config(&args.config)?;

    init_logging(args.verbose, config.logging.json)?;
    if !config_exists {
        warn!("Config file '{}' not found, using defaults", args.config);
    }
    debug!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Some(url) = args.rpc_url {
        config.rpc.url = url;
    }
    config.validate().context("Invalid configuration")?;
    info!(rpc = %config.rpc.url, commitment = %config.rpc.commitment, "RPC configured");

    let client = Arc::new(rpc_client(&config.rpc)?);
    let augmenter = Augmenter::from_rpc(client.clone());

    match args.command {
        Command::Augment {
            transaction,
            payer,
            instruction,
            input_encoding,
            output_encoding,
        } => {
            let text = read_transaction(&transaction).await?;
            let bytes = input_encoding.decode(&text)?;
            let injected = load_instruction(&instruction).await?;

            let output = augmenter.augment_bytes(&bytes, &payer, injected).await?;
            for signer in output.required_signers() {
                debug!(%signer, "Signature required");
            }
            println!("{}", output.encode(output_encoding));
        }
        Command::Referral {
            transaction,
            payer,
            mint,
            referral_owner,
        } => {
            let text = read_transaction(&transaction).await?;
            let outcome = augment_with_referral(
                &augmenter,
                client.as_ref(),
                text.trim(),
                &payer,
                &referral_owner,
                &mint,
            )
            .await?;

            let report = serde_json::json!({
                "transaction": outcome.transaction,
                "referral_account": outcome.referral_account.map(|key| key.to_string()),
                "created": outcome.created,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Inspect {
            transaction,
            input_encoding,
        } => {
            let text = read_transaction(&transaction).await?;
            let decoded = decode_transaction(&input_encoding.decode(&text)?)?;
            let tables =
                resolve_lookup_tables(client.as_ref(), &referenced_tables(&decoded.message))
                    .await?;
            let (keys, instructions) = resolve_message(&decoded.message, &tables)?;

            let report = serde_json::json!({
                "signatures": decoded.signatures.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                "recent_blockhash": decoded.message.recent_blockhash.to_string(),
                "header": {
                    "num_required_signatures": decoded.message.header.num_required_signatures,
                    "num_readonly_signed_accounts": decoded.message.header.num_readonly_signed_accounts,
                    "num_readonly_unsigned_accounts": decoded.message.header.num_readonly_unsigned_accounts,
                },
                "account_keys": keys.as_slice().iter().map(|k| k.to_string()).collect::<Vec<_>>(),
                "lookup_tables": tables.iter().map(|t| t.key.to_string()).collect::<Vec<_>>(),
                "instructions": instructions.iter().map(InstructionFile::from).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Initialize logging and tracing, writing to stderr
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "tx_augment=debug,info"
    } else {
        "tx_augment=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
        }))
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        dotenvy::dotenv().ok();
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

async fn read_transaction(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("Failed to read transaction from stdin")?;
    Ok(text)
}

async fn load_instruction(path: &Path) -> Result<Instruction> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read instruction file {}", path.display()))?;
    let file: InstructionFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse instruction file {}", path.display()))?;
    Instruction::try_from(file)
}
