#![allow(clippy::print_stdout)]

use anyhow::{Context, Result};
use clap::Parser;
use nexo_admin::{Cli, execute, settings};
use nexo_logger::{LevelFilter, LogFormat, Logger};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = settings(&cli)?;

    let level: LevelFilter = cfg
        .logging
        .level
        .parse()
        .with_context(|| format!("Unknown log level '{}'", cfg.logging.level))?;
    let logger = Logger::builder()
        .name(env!("CARGO_PKG_NAME"))
        .level(level)
        .format(if cfg.logging.json { LogFormat::Json } else { LogFormat::Compact });
    let _log = match &cfg.logging.directory {
        Some(directory) => logger.directory(directory).init()?,
        None => logger.init()?,
    };

    let output = execute(&cfg, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
