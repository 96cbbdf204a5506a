#![forbid(unsafe_code)]
//! HashLedger command line: demo scenarios and block shipping between processes

use clap::{Parser, Subcommand};
use hashledger::blockchain::{BlockId, BlockValidator, Ledger, ValidationRules};
use hashledger::config::{load_config, Config, DEFAULT_CONFIG_PATH};
use hashledger::miner::{CancelToken, Miner};
use hashledger::scenarios::{self, Parties};
use hashledger::transaction::{Amount, Transaction};
use hashledger::transport;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hashledger", version, about = "Hash-linked ledger with proof of work")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the transaction, tampering and mining scenarios locally
    Demo {
        /// Override the configured mining difficulty
        #[arg(long)]
        difficulty: Option<u32>,
        /// Print the scenario summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Receive blocks and validate each one
    Serve {
        /// Stop after the first block
        #[arg(long)]
        once: bool,
    },
    /// Build, mine and send a block to a running `serve`
    Send,
}

fn cancel_token(config: &Config) -> CancelToken {
    match config.miner.timeout_secs {
        Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
        None => CancelToken::new(),
    }
}

fn run_demo(config: &Config, difficulty: Option<u32>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let parties = Parties::generate()?;
    let rules = ValidationRules::from(config);
    let unit = Amount::from_num(1);

    let transactions: Vec<(&str, Transaction)> = vec![
        ("simple", scenarios::simple_transfer(&parties.alice, &parties.bob, unit)?),
        ("split", scenarios::split_transfer(&parties.alice, &parties.bob, &parties.carol)?),
        ("escrow", scenarios::escrow_transfer(&parties.alice, &parties.bob, &parties.carol, true)?),
        ("wrong key", scenarios::wrongly_signed_transfer(&parties.alice, &parties.bob, &parties.bob)?),
        ("missing arbiter", scenarios::escrow_transfer(&parties.alice, &parties.bob, &parties.carol, false)?),
        ("overspend", scenarios::overspending_transfer(&parties.alice, &parties.bob)?),
    ];

    let mut summary = serde_json::Map::new();
    for (name, tx) in &transactions {
        let verdict = match tx.validate() {
            Ok(()) => "valid".to_string(),
            Err(reason) => format!("invalid: {}", reason),
        };
        info!(scenario = *name, tx = %tx.hash_str(), %verdict, "Transaction checked");
        summary.insert(name.to_string(), serde_json::Value::String(verdict));
    }

    let mut negative = Transaction::new();
    if let Err(e) = negative.add_input(parties.alice.identity(), Amount::from_num(-1)) {
        info!(error = %e, "Negative amount refused");
        summary.insert("negative".to_string(), serde_json::Value::String(e.to_string()));
    }

    let mut text = scenarios::text_chain(&["000", "111", "222", "333"]);
    let tip = text.tip().ok_or("empty text chain")?;
    let clean = text.detect_tampering(tip)?;
    text.block_mut(BlockId(1))?.payload = "tampered".to_string();
    let tampered = text.detect_tampering(tip)?;
    summary.insert("text chain".to_string(), serde_json::Value::String(clean.to_string()));
    summary.insert("text chain after edit".to_string(), serde_json::Value::String(tampered.to_string()));

    let (mut ledger, _) = scenarios::transfer_ledger(&parties)?;
    let difficulty = difficulty.unwrap_or(config.miner.difficulty);
    if difficulty != ledger.difficulty() {
        ledger = rebuild_with_difficulty(&ledger, difficulty)?;
    }
    let rewarded = ledger.append(scenarios::rewarded_block(&parties, rules.block_reward)?);

    let miner = Miner::from_config(&config.miner);
    let nonce = ledger.mine(rewarded, &miner, &cancel_token(config))?;
    let validator = BlockValidator::new(ValidationRules {
        require_proof_of_work: true,
        min_difficulty: difficulty,
        ..rules
    });
    let verdict = match validator.validate(&ledger, rewarded) {
        Ok(()) => "valid".to_string(),
        Err(reason) => format!("invalid: {}", reason),
    };
    info!(block = %rewarded, %nonce, %verdict, "Rewarded block checked");
    summary.insert("rewarded block".to_string(), serde_json::Value::String(verdict));

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for (name, verdict) in &summary {
            println!("{:<24} {}", name, verdict.as_str().unwrap_or_default());
        }
    }
    Ok(())
}

/// Re-push every payload onto a chain stamped with `difficulty`.
fn rebuild_with_difficulty(
    ledger: &Ledger,
    difficulty: u32,
) -> Result<Ledger, Box<dyn std::error::Error>> {
    let mut rebuilt = Ledger::with_difficulty(difficulty);
    for (_, block) in ledger.iter() {
        rebuilt.push(block.payload.clone(), block.previous())?;
    }
    Ok(rebuilt)
}

async fn run_serve(config: &Config, once: bool) -> Result<(), Box<dyn std::error::Error>> {
    let listener = transport::bind(config.transport.address()).await?;
    let validator = BlockValidator::new(ValidationRules::from(config));

    loop {
        match transport::receive_block(&listener, config.transport.max_frame_bytes).await {
            Ok(wire) => {
                let Some(tip) = wire.tip() else {
                    warn!("Received an empty ledger");
                    continue;
                };
                match wire.restore() {
                    Ok(ledger) => {
                        let report = ledger.detect_tampering(tip)?;
                        match validator.validate(&ledger, tip) {
                            Ok(()) => info!(block = %tip, %report, "Accepted block"),
                            Err(reason) => warn!(block = %tip, %reason, "Rejected block"),
                        }
                    }
                    Err(e) => warn!(error = %e, "Could not restore received block"),
                }
            }
            Err(e) => error!(error = %e, "Receive failed"),
        }
        if once {
            return Ok(());
        }
    }
}

async fn run_send(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let parties = Parties::generate()?;
    let rules = ValidationRules::from(config);
    let (mut ledger, _) = scenarios::transfer_ledger(&parties)?;
    let tip = ledger.append(scenarios::rewarded_block(&parties, rules.block_reward)?);

    let miner = Miner::from_config(&config.miner);
    ledger.mine(tip, &miner, &cancel_token(config))?;

    let wire = ledger.to_wire_through(tip)?;
    transport::send_block(config.transport.address(), &wire).await?;
    info!(block = %tip, to = %config.transport.address(), "Block shipped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Command::Demo { difficulty, json } => run_demo(&config, difficulty, json)?,
        Command::Serve { once } => run_serve(&config, once).await?,
        Command::Send => run_send(&config).await?,
    }
    Ok(())
}
