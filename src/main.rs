//! scisci CLI - seed the count database and serve its query endpoints

use clap::{Parser, Subcommand};
use scisci::config;
use scisci::endpoints::EndpointName;
use scisci::seed::{self, SeedJob, SeedTarget};
use scisci::storage::SqliteStore;
use scisci::ui::{self, Icons};
use scisci::Endpoints;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "scisci")]
#[command(version)]
#[command(about = "Publication count backend - SQLite query endpoints and JSON seed import")]
#[command(long_about = r#"
scisci keeps paper and field-of-study counts in SQLite and serves them
through a small set of named query endpoints.

Example usage:
  scisci seed --file static/data/nature_papers_by_year.json --label Nature
  scisci query getFilteredPapers --args '{"venue":"Nature","minYear":2000}'
  scisci serve --port 5173
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and optionally a config file
    Init {
        /// Write scisci.toml with the effective settings
        #[arg(long)]
        write_config: bool,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Replace a table's rows with a labelled {year, count} snapshot
    Seed {
        /// JSON snapshot to import
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Label stamped onto every row (venue or field name)
        #[arg(short, long)]
        label: Option<String>,

        /// Target table (papers, fields)
        #[arg(short, long, default_value = "papers")]
        target: String,
    },

    /// Upsert a {year, count} snapshot into the venue table
    Sync {
        /// JSON snapshot to import
        #[arg(short, long)]
        file: PathBuf,

        /// Venue name for every row
        #[arg(long)]
        venue: String,
    },

    /// Replace venue/field memberships from a JSON array of {venue, field}
    Memberships {
        /// JSON file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Invoke a query endpoint by name and print its result
    Query {
        /// Endpoint name, e.g. getVenues
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,

        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show row counts per table
    Stats,

    /// Serve the query endpoints over HTTP
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory served for non-API paths
        #[arg(long, default_value = "static")]
        static_dir: PathBuf,

        /// Compute cached endpoints lazily instead of at startup
        #[arg(long)]
        no_prerender: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let mut settings = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    if let Some(database) = &cli.database {
        settings.database = Some(database.to_string_lossy().to_string());
    }
    let database = settings.database_path();

    match cli.command {
        Commands::Init { write_config, force } => {
            config::ensure_db_dir(&database)?;
            let store = SqliteStore::open(&database)?;
            ui::success(&format!("Schema ready in {}", database.display()));
            print!("{}", store.stats()?);

            if write_config {
                let path = cli.config.unwrap_or_else(config::default_config_path);
                config::write_config(&path, &settings, force)?;
                ui::success(&format!("Wrote {}", path.display()));
            }
        }

        Commands::Seed { file, label, target } => {
            let target: SeedTarget = target.parse()?;
            let file = file.unwrap_or_else(|| settings.data_file_path());
            let label = label.unwrap_or_else(|| settings.label().to_string());

            ui::header(&format!("Seeding {} from {}", target.table(), file.display()));
            ui::info(Icons::DATABASE, "Database", &database.display().to_string());

            config::ensure_db_dir(&database)?;
            let store = SqliteStore::open(&database)?;
            let report = SeedJob::new(file, label).with_target(target).run(&store)?;

            ui::summary_row("Removed", &report.removed.to_string());
            ui::summary_row("Inserted", &report.inserted.to_string());
            ui::success(&format!("Imported {} records", report.inserted));
        }

        Commands::Sync { file, venue } => {
            config::ensure_db_dir(&database)?;
            let store = SqliteStore::open(&database)?;
            let synced = seed::sync_venue_years(&store, &file, &venue)?;
            ui::success(&format!("Synced {} records for {}", synced, venue));
        }

        Commands::Memberships { file } => {
            config::ensure_db_dir(&database)?;
            let store = SqliteStore::open(&database)?;
            let inserted = seed::import_memberships(&store, &file)?;
            ui::success(&format!("Imported {} venue memberships", inserted));
        }

        Commands::Query { name, args, json } => {
            let args: serde_json::Value = match args {
                Some(raw) => serde_json::from_str(&raw)?,
                None => serde_json::Value::Null,
            };
            let store = SqliteStore::open(&database)?;
            let endpoints = Endpoints::new(Arc::new(store));

            match endpoints.invoke(&name, &args) {
                Ok(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
                Ok(result) => {
                    let rendered = ui::records_table(&result);
                    if rendered.is_empty() {
                        ui::warn("No rows.");
                    } else {
                        println!("{}", rendered);
                    }
                }
                Err(scisci::Error::UnknownEndpoint(name)) => {
                    ui::error(&format!("Unknown endpoint: {}", name));
                    ui::section("Available endpoints");
                    for endpoint in EndpointName::all() {
                        ui::summary_row("-", endpoint.as_str());
                    }
                    std::process::exit(2);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Stats => {
            let store = SqliteStore::open(&database)?;
            ui::info(Icons::STATS, "Database", &database.display().to_string());
            println!("{}", ui::stats_table(&store.stats()?));
        }

        Commands::Serve { port, static_dir, no_prerender } => {
            let port = port.unwrap_or_else(|| settings.port());
            config::ensure_db_dir(&database)?;
            let store = SqliteStore::open(&database)?;
            let endpoints = Arc::new(Endpoints::new(Arc::new(store)));

            if !no_prerender {
                endpoints.prerender()?;
            }

            ui::info(Icons::GLOBE, "Server", &format!("http://0.0.0.0:{}", port));
            scisci::server::start_server(port, endpoints, static_dir).await?;
        }
    }

    Ok(())
}
