//! # CLI Argument Definitions
//!
//! Command-line surface of `nexo-admin`, declared with `clap` derive.

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// The main CLI structure parsing command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "nexo-admin")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Administration of the Nexo plan catalog")]
pub struct Cli {
    /// TOML configuration file (defaults and `NEXO__*` variables apply without it)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store URL, overriding the configuration (`memory://`, `mem://`, `ws://host:8000`)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load the bundled sample catalog (safe to repeat)
    Seed,
    /// Manage localities
    Localities {
        #[command(subcommand)]
        action: NameAction,
    },
    /// Manage zone types
    #[command(alias = "zone-types")]
    Zones {
        #[command(subcommand)]
        action: NameAction,
    },
    /// Manage plans
    Plans {
        #[command(subcommand)]
        action: PlanAction,
    },
    /// Plans offered at a locality under a zone type
    Coverage {
        /// Locality name (case-insensitive)
        #[arg(short, long)]
        locality: String,
        /// Zone type name (case-insensitive)
        #[arg(short, long)]
        zone: String,
    },
    /// Catalog totals and the most recent plans
    Stats,
    /// Dump the whole catalog as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Actions on the name tables (localities, zone types).
#[derive(Debug, Subcommand)]
pub enum NameAction {
    List,
    Add { name: String },
}

#[derive(Debug, Subcommand)]
pub enum PlanAction {
    /// List plans by price, optionally of one category
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show a plan with its features and availability
    Show { id: String },
    /// Search plans by name or category
    Search { term: String },
    Create(PlanArgs),
    /// Replace a plan's attributes, features and availability
    Update {
        id: String,
        #[command(flatten)]
        plan: PlanArgs,
    },
    Delete { id: String },
    /// Delete several plans at once; unknown ids are ignored
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// Full desired state of a plan.
#[derive(Debug, Args)]
pub struct PlanArgs {
    #[arg(short, long)]
    pub name: String,

    #[arg(short, long)]
    pub price: Decimal,

    /// `internet`, `tv`, `combo` or any other name
    #[arg(short, long)]
    pub category: String,

    /// Feature as `description` or `icon::description`, in display order.
    ///
    /// Only a double colon separates the icon; `Hora pico: 10 Mbps` is a plain description.
    #[arg(short, long = "feature")]
    pub features: Vec<String>,

    /// Availability as `<locality>-<zone type>` (names); unknown pairs are skipped
    #[arg(short, long = "available")]
    pub available: Vec<String>,
}
