mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::constants::{DEFAULT_DIFFICULTY, MAX_PRACTICAL_DIFFICULTY};
use ledger_core::{Chain, MiningBudget};
use logging::LogFormat;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Mine, inspect and validate a proof-of-work ledger stored as JSON")]
struct Cli {
    /// Log output format
    #[arg(long, global = true, env = "LEDGER_LOG_FORMAT", value_enum, default_value_t)]
    log_format: LogFormat,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a new chain and mine one block per payload
    Mine {
        /// Leading zero hex characters required in every block hash
        #[arg(
            long,
            env = "LEDGER_DIFFICULTY",
            default_value_t = DEFAULT_DIFFICULTY,
            value_parser = clap::value_parser!(u32).range(0..=MAX_PRACTICAL_DIFFICULTY as i64)
        )]
        difficulty: u32,
        /// Block payload; repeat for several blocks
        #[arg(long = "data")]
        data: Vec<String>,
        /// Give up if the whole run takes longer than this
        #[arg(long, env = "LEDGER_TIMEOUT_SECS")]
        timeout_secs: Option<u64>,
        /// Write the chain here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check hashes, links and proof-of-work of a stored chain
    Validate {
        #[arg(long)]
        file: PathBuf,
    },
    /// Change the difficulty later blocks are mined at
    Difficulty {
        #[arg(long)]
        file: PathBuf,
        /// New number of leading zero hex characters
        #[arg(
            long,
            value_parser = clap::value_parser!(u32).range(0..=MAX_PRACTICAL_DIFFICULTY as i64)
        )]
        set: u32,
        /// Mine these payloads at the new difficulty before writing back
        #[arg(long = "data")]
        data: Vec<String>,
    },
    /// Overwrite a block's payload without recomputing its hash
    Tamper {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        index: u64,
        #[arg(long, default_value = "TAMPERED")]
        data: String,
    },
    /// Print the canonical digest of a set of block fields
    Hash {
        #[arg(long)]
        index: u64,
        #[arg(long)]
        timestamp: u64,
        #[arg(long)]
        data: String,
        #[arg(long)]
        previous_hash: String,
        #[arg(long, default_value_t = 0)]
        nonce: u64,
    },
}

fn load_chain(path: &Path) -> Result<Chain> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Chain::from_json(&json).with_context(|| format!("parsing {}", path.display()))
}

fn store_chain(chain: &Chain, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(chain)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init_logging("info", cli.log_format);

    match cli.cmd {
        Command::Mine {
            difficulty,
            data,
            timeout_secs,
            out,
        } => {
            let budget = match timeout_secs {
                Some(secs) => MiningBudget::unbounded().with_timeout(Duration::from_secs(secs)),
                None => MiningBudget::unbounded(),
            };
            let mut chain =
                Chain::with_budget(difficulty, &budget).context("mining genesis block")?;
            for payload in data {
                let block = chain
                    .append_with(payload, &budget)
                    .context("mining block")?;
                info!(index = block.index(), hash = block.hash(), "mined");
            }
            match out {
                Some(path) => {
                    store_chain(&chain, &path)?;
                    info!(blocks = chain.blocks().len(), path = %path.display(), "chain written");
                }
                None => println!("{}", serde_json::to_string_pretty(&chain)?),
            }
        }
        Command::Validate { file } => {
            let chain = load_chain(&file)?;
            if let Err(err) = chain.verify() {
                println!("invalid: {err}");
                return Ok(ExitCode::from(1));
            }
            println!("valid");
        }
        Command::Difficulty { file, set, data } => {
            let mut chain = load_chain(&file)?;
            chain.set_difficulty(set);
            for payload in data {
                chain.append(payload);
            }
            store_chain(&chain, &file)?;
            println!("difficulty set to {set}");
        }
        Command::Tamper { file, index, data } => {
            let mut chain = load_chain(&file)?;
            chain.force_set_data_without_rehash(index, data)?;
            store_chain(&chain, &file)?;
            println!("block {index} tampered");
        }
        Command::Hash {
            index,
            timestamp,
            data,
            previous_hash,
            nonce,
        } => {
            println!(
                "{}",
                ledger_core::digest(index, timestamp, &data, &previous_hash, nonce)
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
