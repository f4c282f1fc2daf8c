mod render;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ledger_core::{Chain, ChainConfig, LedgerError};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Mine and inspect an in-memory proof-of-work ledger")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine two sample batches, then tamper with block 1 and show it is detected
    Demo {
        #[command(flatten)]
        chain: ChainArgs,
    },
    /// Mine each batch into its own block and print the chain
    Mine {
        /// Transactions of one block, separated by ';' (repeat for more blocks)
        #[arg(long = "batch", required = true)]
        batches: Vec<String>,
        #[command(flatten)]
        chain: ChainArgs,
    },
}

#[derive(Args, Debug)]
struct ChainArgs {
    /// Leading zero hex characters required of each mined block
    #[arg(long)]
    difficulty: Option<u32>,
    /// Search nonces on every core
    #[arg(long)]
    parallel: bool,
    /// JSON file with chain settings; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the chain as JSON
    #[arg(long)]
    json: bool,
}

impl ChainArgs {
    async fn load(&self) -> Result<ChainConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => ChainConfig::default(),
        };
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        config.parallel |= self.parallel;
        Ok(config)
    }
}

fn demo_batches() -> Vec<Vec<String>> {
    [
        ["Alice pays Bob 10 BTC", "Bob pays Charlie 5 BTC"],
        ["Charlie pays Dave 2 BTC", "Dave pays Alice 1 BTC"],
    ]
    .iter()
    .map(|batch| batch.iter().map(|tx| tx.to_string()).collect())
    .collect()
}

fn parse_batch(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|tx| !tx.is_empty())
        .map(String::from)
        .collect()
}

/// Mines `batches` on a blocking task; Ctrl-C stops at the block in progress.
async fn mine_batches(mut chain: Chain, batches: Vec<Vec<String>>) -> Result<Chain> {
    let cancel = Arc::new(AtomicBool::new(false));
    let watcher = {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling mining");
                cancel.store(true, Ordering::Relaxed);
            }
        })
    };

    let mined = tokio::task::spawn_blocking(move || -> Result<Chain> {
        for batch in &batches {
            match chain.append_until(batch, &cancel) {
                Ok(block) => info!(index = block.index, nonce = block.nonce, "block sealed"),
                Err(LedgerError::MiningCancelled { index, attempts }) => {
                    eprintln!("mining interrupted at block {index} after {attempts} attempts");
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(chain)
    })
    .await
    .context("mining task failed")?;

    watcher.abort();
    mined
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Demo { chain: args } => {
            let config = args.load().await?;
            let mut chain = mine_batches(Chain::with_config(config), demo_batches()).await?;
            render::print_chain(&chain, args.json)?;

            println!("Blockchain validity before tampering: {}", chain.is_valid());
            if let Some(block) = chain.blocks_mut().get_mut(1) {
                block.transactions = json!(["Alice pays Bob 100 BTC"]);
            }
            println!("Blockchain validity after tampering: {}", chain.is_valid());
            if let Err(err) = chain.verify() {
                println!("First failure: {err}");
            }
        }
        Command::Mine {
            batches,
            chain: args,
        } => {
            let config = args.load().await?;
            let batches = batches.iter().map(|raw| parse_batch(raw)).collect();
            let chain = mine_batches(Chain::with_config(config), batches).await?;
            render::print_chain(&chain, args.json)?;
            println!("Blockchain validity: {}", chain.is_valid());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_batch_example() {
        assert_eq!(parse_batch("a; b ;;c"), vec!["a", "b", "c"]);
        assert!(parse_batch(" ; ").is_empty());
    }

    #[test]
    fn cli_parses_mine_flags() {
        let cli = Cli::try_parse_from([
            "ledger-cli",
            "mine",
            "--batch",
            "a;b",
            "--batch",
            "c",
            "--difficulty",
            "3",
            "--parallel",
        ])
        .unwrap();
        match cli.cmd {
            Command::Mine { batches, chain } => {
                assert_eq!(batches, vec!["a;b", "c"]);
                assert_eq!(chain.difficulty, Some(3));
                assert!(chain.parallel);
                assert!(!chain.json);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mine_requires_a_batch() {
        assert!(Cli::try_parse_from(["ledger-cli", "mine"]).is_err());
    }
}
