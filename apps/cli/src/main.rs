//! Main entry point for the labelpress CLI.
//!
//! Non-interactive runner for label generation:
//! - `generate`: fetch products and write a label PDF
//! - `preview`: render one label as a one-page PDF
//! - `check`: verify database connectivity

mod cli;
mod commands;
mod settings;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use labelpress_db::DatabaseConfig;

use cli::{Cli, Command};
use settings::Settings;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("labelpress={0},labelpress_cli={0}", default)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli).await;
    match result {
        Ok(()) => {}
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(&cli.settings)?;
    let db_config = DatabaseConfig::from_json_file(&cli.db_config)?;

    match cli.command {
        Command::Generate(args) => commands::generate(args, &settings, &db_config).await,
        Command::Preview(args) => commands::preview(args, &settings, &db_config).await,
        Command::Check => commands::check(&db_config).await,
    }
}
