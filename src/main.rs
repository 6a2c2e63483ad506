//! Steemit publish agent (CLI runner)
//!
//! Executes a batch of operations against the Steemit blockchain:
//! create/update/get/search posts, account lookup, signed image upload, and
//! reward claims.
//!
//! # Architecture Overview
//!
//! ```text
//!  job file (JSON array of operations)
//!      │
//!      ▼
//!  ┌─────────┐   ┌──────────────┐   ┌──────────────────┐
//!  │  agent  │──▶│  blockchain  │──▶│ condenser API    │
//!  │ engine  │   │ client/wallet│   │ (JSON-RPC, HTTP) │
//!  └────┬────┘   └──────────────┘   └──────────────────┘
//!       │
//!       └────────▶ image host (signed form upload)
//! ```
//!
//! Credentials come from `STEEMIT_ACCOUNT_NAME` / `STEEMIT_POSTING_KEY`;
//! everything else from a TOML config file.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steemit_agent::agent::{ErrorPolicy, OperationRequest, PublishAgent};
use steemit_agent::blockchain::{CondenserClient, Wallet};
use steemit_agent::config::{loader, AgentConfig};

#[derive(Parser)]
#[command(name = "steemit-agent")]
#[command(about = "Publish and manage content on Steemit", long_about = None)]
struct Cli {
    /// Path to the TOML config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a JSON file holding an array of operation requests.
    #[arg(short, long)]
    jobs: PathBuf,

    /// Capture per-item failures as error records instead of aborting.
    #[arg(long)]
    continue_on_fail: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steemit_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => loader::load_config(path)?,
        None => AgentConfig::default(),
    };

    tracing::info!(
        endpoint = %config.api.endpoint,
        image_host = %config.image_host.endpoint,
        permlink_strategy = ?config.publish.permlink_strategy,
        "Configuration loaded"
    );

    let wallet = Wallet::from_env()?;
    let client = CondenserClient::new(&config.api)?;
    let agent = PublishAgent::new(client, wallet, &config);

    let jobs = std::fs::read_to_string(&cli.jobs)?;
    let requests: Vec<OperationRequest> = serde_json::from_str(&jobs)?;

    tracing::info!(items = requests.len(), "Executing batch");

    let policy = if cli.continue_on_fail {
        ErrorPolicy::Continue
    } else {
        ErrorPolicy::Abort
    };

    let results = agent.execute_all(requests, policy).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);

    Ok(())
}
