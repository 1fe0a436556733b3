use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

mod dashboard;
mod db;
mod detail;
mod models;
mod report;
mod source;

#[derive(Parser)]
#[command(name = "audit-dashboard")]
#[command(about = "Compliance audit records and monthly dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Assemble one audit into its form record
    Detail {
        #[arg(long)]
        audit_id: i64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Aggregate a client's year into the topic × month dashboard
    Dashboard {
        #[arg(long)]
        client_id: i64,
        #[arg(long)]
        year: i32,
        /// Read rows from an exported CSV instead of Postgres
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Client name shown in the markdown report
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the years in which a client has audits
    Years {
        #[arg(long)]
        client_id: i64,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn emit(output: String, out: Option<PathBuf>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(&path, output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Output written to {}.", path.display());
        }
        None => println!("{output}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Detail { audit_id, out } => {
            let pool = connect().await?;
            let rows = db::fetch_audit_rows(&pool, audit_id).await?;

            match detail::assemble_detail(&rows) {
                Some(record) => emit(serde_json::to_string_pretty(&record)?, out)?,
                None => println!("No data found for audit {audit_id}."),
            }
        }
        Commands::Dashboard {
            client_id,
            year,
            csv,
            format,
            label,
            out,
        } => {
            let rows = match csv {
                Some(path) => source::read_dashboard_csv(&path)?,
                None => {
                    let pool = connect().await?;
                    db::fetch_dashboard_rows(&pool, client_id, year).await?
                }
            };
            tracing::info!(client_id, year, rows = rows.len(), "aggregating dashboard");

            let result = dashboard::aggregate(&rows, year);
            let output = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&result)?,
                OutputFormat::Markdown => {
                    let label = label.unwrap_or_else(|| format!("client {client_id}"));
                    report::build_report(&label, year, &result)
                }
            };
            emit(output, out)?;
        }
        Commands::Years { client_id } => {
            let pool = connect().await?;
            let years = db::fetch_audit_years(&pool, client_id).await?;

            if years.is_empty() {
                println!("No audits found for client {client_id}.");
                return Ok(());
            }

            for year in years {
                println!("{year}");
            }
        }
    }

    Ok(())
}
