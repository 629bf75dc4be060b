//! notion-db-clone CLI - clone Notion databases from the command line.

use clap::{Parser, Subcommand};
use notion_db_clone::{CloneOptions, Cloner, Config, Error, NotionClient};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

/// Exit code after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "notion-db-clone")]
#[command(about = "Clone Notion databases, schema and rows")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (environment variables are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a database into a new database under a page
    Clone {
        /// Source database id
        #[arg(long)]
        source: String,

        /// Page the new database is created under
        #[arg(long)]
        parent: String,

        /// Title of the new database [default: "Copy of <source title>"]
        #[arg(long)]
        name: Option<String>,

        /// Rebuild parent/child links after copying rows
        #[arg(long)]
        restore_hierarchy: bool,

        /// Override rows created concurrently per batch
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Show the schema a clone would produce without writing anything
    Inspect {
        /// Source database id
        #[arg(long)]
        source: String,
    },

    /// Verify the API token against the service
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e.format_detailed());
                ExitCode::from(e.exit_code())
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nReceived Ctrl-C, aborting. Rows already created stay in the new database.");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    setup_logging(&cli.verbosity, &cli.log_format).map_err(Error::Config)?;

    let mut config = match cli.config {
        Some(ref path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Clone {
            source,
            parent,
            name,
            restore_hierarchy,
            batch_size,
        } => {
            if let Some(size) = batch_size {
                config.clone.row_batch_size = size;
                config.validate()?;
            }

            let cloner = Cloner::connect(config)?;
            let result = cloner
                .clone_database(
                    &source,
                    &parent,
                    CloneOptions {
                        new_name: name,
                        restore_hierarchy,
                    },
                )
                .await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nClone {}!", result.status.replace('_', " "));
                println!("  Run ID: {}", result.run_id);
                println!("  New database: {} ({})", result.title, result.new_database_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Rows copied: {}", result.copied_row_count);
                if result.failed_row_count > 0 {
                    println!("  Rows failed: {}", result.failed_row_count);
                }
                if let Some(ref h) = result.hierarchy {
                    println!(
                        "  Hierarchy: {} links applied, {} skipped, {} failed",
                        h.applied, h.skipped, h.failed
                    );
                    if let Some(ref err) = h.error {
                        println!("    Error: {}", err);
                    }
                }
            }
        }

        Commands::Inspect { source } => {
            let plan = Cloner::connect(config)?.plan(&source).await?;

            if cli.output_json {
                println!("{}", plan.to_json()?);
            } else {
                println!("Source: {} ({})", plan.source_title, plan.source_database_id);
                println!("\nTarget fields:");
                for field in &plan.target_fields {
                    println!("  {} ({})", field.name, field.kind);
                }
                if !plan.dropped_fields.is_empty() {
                    println!("\nDropped fields: {}", plan.dropped_fields.join(", "));
                }
                if !plan.hierarchy_fields.is_empty() {
                    println!(
                        "Hierarchy fields: {}",
                        plan.hierarchy_fields.join(", ")
                    );
                }
            }
        }

        Commands::HealthCheck => {
            let client = NotionClient::new(&config.api)?;
            let status = client.health_check().await?;
            let latency_ms = status.latency.as_millis() as u64;

            if cli.output_json {
                let report = serde_json::json!({
                    "healthy": true,
                    "user": status.user,
                    "latency_ms": latency_ms,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Notion API: OK ({}ms){}",
                    latency_ms,
                    status
                        .user
                        .map(|u| format!(" as {}", u))
                        .unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity {:?}", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format {:?}", other)),
    }

    Ok(())
}
