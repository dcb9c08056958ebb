//! # Nexo Admin
//!
//! Command-line administration of the plan catalog. Every command prints one pretty JSON
//! document on stdout; logs go to stderr.
//!
//! ## Example
//! ```no_run
//! use clap::Parser;
//! use nexo_admin::{Cli, run};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse_from(["nexo-admin", "--database-url", "memory://", "stats"]);
//!     let stats = run(cli).await?;
//!     assert_eq!(stats["total_plans"], 0);
//!     Ok(())
//! }
//! ```

mod args;
mod commands;

pub use crate::args::{Cli, Command, NameAction, PlanAction, PlanArgs};

use anyhow::{Context, Result};
use nexo_catalog::PlanAdmin;
use nexo_database::{Database, DatabaseBuilder};
use nexo_kernel::config::load_config;
use nexo_kernel::domain::config::AppConfig;
use serde_json::Value;
use tracing::debug;

/// Loads the layered configuration and applies the command-line overrides.
///
/// # Errors
/// Fails when the configuration file is missing or malformed.
pub fn settings(cli: &Cli) -> Result<AppConfig> {
    let mut cfg: AppConfig =
        load_config(cli.config.as_deref()).context("Configuration is malformed")?;
    if let Some(url) = &cli.database_url {
        cfg.database.url.clone_from(url);
    }
    Ok(cfg)
}

/// Opens the store described by `cfg` with the catalog tables registered.
///
/// # Errors
/// Fails when the store cannot be reached or its schema cannot be applied.
pub async fn connect(cfg: &AppConfig) -> Result<PlanAdmin<Database>> {
    let db_cfg = &cfg.database;
    let mut builder =
        DatabaseBuilder::new().url(&db_cfg.url).session(&db_cfg.namespace, &db_cfg.database);
    if let Some(creds) = &db_cfg.credentials {
        builder = builder.auth(&creds.username, &creds.password);
    }

    let catalog = nexo_catalog::open(builder)
        .await
        .with_context(|| format!("Failed to open the catalog at {}", db_cfg.url))?;
    Ok(catalog.admin())
}

/// Opens the catalog described by `cfg` and runs one command against it.
///
/// # Errors
/// Any connection or catalog error, with the failing step as context.
pub async fn execute(cfg: &AppConfig, command: Command) -> Result<Value> {
    let admin = connect(cfg).await?;
    debug!(?command, "Running command");
    commands::execute(&admin, command).await
}

/// [`settings`] followed by [`execute`].
///
/// # Errors
/// Any configuration, connection or catalog error.
pub async fn run(cli: Cli) -> Result<Value> {
    let cfg = settings(&cli)?;
    execute(&cfg, cli.command).await
}
