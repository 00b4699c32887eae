//! # Command Line Interface
//!
//! `config2vault [OPTIONS] [RULES]`: load the desired-state document at
//! `RULES` (a YAML file or a directory of them) and converge the Vault
//! server onto it.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use crate::config::ConnectionConfig;
use crate::model::load_path;
use crate::observability::init_logging;
use crate::reconcile::reconcile;
use crate::vault::HttpVaultClient;
use crate::{Error, APP_NAME, VERSION};

#[derive(Parser, Debug)]
#[command(name = "config2vault")]
#[command(about = "Converge a Vault server onto a declarative YAML configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Rules file or directory of YAML files
    pub rules: Option<PathBuf>,

    /// Connection settings file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Vault server address, overrides the settings file and VAULT_ADDR
    #[arg(long)]
    pub url: Option<String>,

    /// Vault token, overrides the settings file and VAULT_TOKEN
    #[arg(long)]
    pub token: Option<String>,

    /// Log filter directive, e.g. `warn` or `config2vault=debug`
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

pub async fn run_cli() -> anyhow::Result<()> {
    // Load .env file if it exists; a missing file is fine
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref(), cli.verbose, cli.log_json);

    run(cli).await
}

/// Execute one reconciliation run for parsed arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    info!(app_name = APP_NAME, version = VERSION, "Starting");

    let settings = ConnectionConfig::load(cli.config.as_deref())?.with_overrides(cli.url, cli.token);

    let rules = cli
        .rules
        .or_else(|| settings.rules.clone())
        .ok_or_else(|| Error::config("Missing path to the ACLs file"))?;

    let connection = settings.resolve()?;

    let document = load_path(&rules)
        .with_context(|| format!("Failed to load rules from {}", rules.display()))?;
    if document.is_empty() {
        warn!(rules = %rules.display(), "Rules document is empty, unmanaged entities will be removed");
    }

    let client = HttpVaultClient::new(&connection).context("Can't create Vault client")?;
    info!(address = %client.address(), rules = %rules.display(), "Applying rules");

    reconcile(&client, &document).await?;
    Ok(())
}
