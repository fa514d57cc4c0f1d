//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Generates printable product label PDFs from the store database.
#[derive(Debug, Parser)]
#[command(name = "labelpress", version, about)]
pub struct Cli {
    /// Path to the database connection file.
    #[arg(long, default_value = "db_config.json", global = true)]
    pub db_config: PathBuf,

    /// Path to the settings file (layout, output directory, fonts).
    #[arg(long, default_value = "settings.json", global = true)]
    pub settings: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a label PDF for a set of products.
    Generate(GenerateArgs),
    /// Render a single label as a one-page preview PDF.
    Preview(PreviewArgs),
    /// Verify that the database is reachable with the configured credentials.
    Check,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// SKUs to print, in label order. Repeatable.
    #[arg(long = "sku", value_name = "SKU")]
    pub skus: Vec<String>,

    /// File with one SKU per line (blank lines and # comments ignored).
    #[arg(long, value_name = "FILE")]
    pub sku_file: Option<PathBuf>,

    /// Select products whose name contains this substring instead of
    /// listing SKUs.
    #[arg(long, value_name = "PATTERN", conflicts_with_all = ["skus", "sku_file"])]
    pub name_like: Option<String>,

    /// Print one label per unit in stock instead of one per product.
    #[arg(long)]
    pub by_stock: bool,

    /// Output file. Defaults to a timestamped name in the configured
    /// output directory.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// SKU to preview.
    pub sku: String,

    /// Output file for the preview PDF.
    #[arg(short, long, default_value = "preview.pdf")]
    pub output: PathBuf,
}
