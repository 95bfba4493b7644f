//! taxsync: operator CLI for the filing service.
//!
//! `sweep` reads DATABASE_URL and the EFILE_* settings from the environment (or
//! `.env`) and runs one status sweep; `liability` needs no configuration.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use taxsync_cli::{init_tracing, quote_liability};
use taxsync_core::liability::DEFAULT_TAX_YEAR;
use taxsync_core::money::parse_amount;
use taxsync_core::Config;
use taxsync_db::FilingRepository;
use taxsync_services::{EfileClient, StatusPoller};

#[derive(Parser)]
#[command(name = "taxsync", about = "Taxsync filing service CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the e-file provider once for every pending or submitted filing
    Sweep {
        /// Cap on the number of filings checked
        #[arg(long)]
        max_filings: Option<usize>,
    },
    /// Compute the liability for an income figure
    Liability {
        /// Gross income, e.g. 75000 or "$75,000.00"
        #[arg(long, value_parser = parse_amount)]
        income: Decimal,
        /// Total deductions (defaults to the standard deduction for --year)
        #[arg(long, value_parser = parse_amount)]
        deductions: Option<Decimal>,
        /// Federal tax withheld, to show the refund or amount owed
        #[arg(long, value_parser = parse_amount)]
        withheld: Option<Decimal>,
        /// Tax year of the bracket schedule
        #[arg(long, default_value_t = DEFAULT_TAX_YEAR)]
        year: i32,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

async fn run_sweep(max_filings: Option<usize>) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if max_filings.is_some() {
        config.poller.max_filings = max_filings;
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.poller.max_concurrency as u32 + 1)
        .acquire_timeout(Duration::from_secs(config.server.db_timeout_seconds))
        .connect(&config.server.database_url)
        .await
        .context("Failed to connect to database")?;

    let efile = EfileClient::new(config.efile.clone()).context("Failed to create e-file client")?;
    let poller = StatusPoller::new(
        Arc::new(FilingRepository::new(pool.clone())),
        Arc::new(efile),
        config.poller.clone(),
    );

    let report = poller.sweep().await;
    pool.close().await;

    if report.errored > 0 || !report.selection_errors.is_empty() {
        tracing::warn!(
            errored = report.errored,
            selection_errors = report.selection_errors.len(),
            "Sweep finished with errors"
        );
    }

    print_json(&report)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sweep { max_filings } => run_sweep(max_filings).await?,
        Commands::Liability {
            income,
            deductions,
            withheld,
            year,
        } => {
            let quote = quote_liability(year, income, deductions, withheld)?;
            print_json(&quote)?;
        }
    }

    Ok(())
}
