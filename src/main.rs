//! sqlframe CLI
//!
//! Command-line interface for sqlframe operations:
//! - Expand `$__` macros in raw SQL
//! - Run a query against SQLite and print the resulting frame
//! - Run a JSON batch of queries
//! - Generate a default config file

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use sqlframe::config::{generate_default_config, Config, LoggingConfig};
use sqlframe::frame::{Column, Frame};
use sqlframe::macros::expand;
use sqlframe::query::{QueryDataRequest, QueryModel, QueryRunner, SqliteExecutor};
use sqlframe::time::{parse_instant, TimeWindow};

#[derive(Parser)]
#[command(name = "sqlframe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Expand time-window macros in SQL and turn result rows into typed frames")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the SQL produced by macro expansion
    Expand {
        /// Raw SQL containing $__ macros
        sql: String,
        /// Window start. Supports: "now", "now-6h", RFC 3339, Unix timestamp
        #[arg(long, default_value = "now-6h")]
        from: String,
        /// Window end
        #[arg(long, default_value = "now")]
        to: String,
    },

    /// Expand, execute against SQLite and print the frame
    Run {
        /// Raw SQL containing $__ macros
        sql: String,
        /// SQLite database file (default: [sqlite] path, else in-memory)
        #[arg(long)]
        db: Option<PathBuf>,
        /// SQL script executed before the query (schema, fixtures)
        #[arg(long)]
        init: Option<PathBuf>,
        /// Result format: "table" or "time series"
        #[arg(short, long)]
        format: Option<String>,
        /// Window start
        #[arg(long, default_value = "now-6h")]
        from: String,
        /// Window end
        #[arg(long, default_value = "now")]
        to: String,
        /// How to print the frame
        #[arg(short, long, value_enum, default_value_t = Output::Table)]
        output: Output,
    },

    /// Run a JSON query batch and print the responses as JSON
    Batch {
        /// File holding a request: {"queries": [{"refId", "window", "json"}]}
        path: PathBuf,
        /// SQLite database file (default: [sqlite] path, else in-memory)
        #[arg(long)]
        db: Option<PathBuf>,
        /// SQL script executed before the batch
        #[arg(long)]
        init: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Output {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Expand { sql, from, to } => {
            let window = parse_window(&from, &to)?;
            let expansion = expand(&sql, &window)?;

            println!("{}", expansion.sql);
            if let Some(fill) = expansion.fill_policy {
                eprintln!("fill policy: {}", fill);
            }
        }

        Commands::Run {
            sql,
            db,
            init,
            format,
            from,
            to,
            output,
        } => {
            let window = parse_window(&from, &to)?;
            let runner = QueryRunner::new(
                open_executor(db.as_deref(), &config, init.as_deref()).await?,
                config.query.clone(),
            );

            let model = QueryModel {
                ref_id: "A".to_string(),
                raw_sql: sql,
                format: format.unwrap_or_default(),
            };
            let frame = runner.run_query(&model, &window).await?;

            match output {
                Output::Table => print_frame(&frame),
                Output::Json => println!("{}", serde_json::to_string_pretty(&frame)?),
            }
        }

        Commands::Batch { path, db, init } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            let request: QueryDataRequest = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse request in {:?}", path))?;

            let runner = QueryRunner::new(
                open_executor(db.as_deref(), &config, init.as_deref()).await?,
                config.query.clone(),
            );
            let response = runner.query_data(request).await;

            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlframe={}", config.level)));

    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = if config.format == "json" {
        tracing_subscriber::fmt::layer().json().with_writer(writer).boxed()
    } else {
        tracing_subscriber::fmt::layer().pretty().with_writer(writer).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()?;

    Ok(())
}

fn parse_window(from: &str, to: &str) -> Result<TimeWindow> {
    let now = Utc::now();
    let from = parse_instant(from, now).with_context(|| format!("Invalid --from: {}", from))?;
    let to = parse_instant(to, now).with_context(|| format!("Invalid --to: {}", to))?;

    TimeWindow::try_new(from, to).context("--from must not be after --to")
}

async fn open_executor(
    db: Option<&Path>,
    config: &Config,
    init: Option<&Path>,
) -> Result<SqliteExecutor> {
    let path = db.map(Path::to_path_buf).or_else(|| config.sqlite.path.as_ref().map(PathBuf::from));

    let executor = match path {
        Some(path) => {
            tracing::info!("Opening SQLite database {:?}", path);
            SqliteExecutor::open(&path)?
        }
        None => {
            tracing::info!("Using in-memory SQLite database");
            SqliteExecutor::open_in_memory()?
        }
    };

    if let Some(init) = init {
        let script = std::fs::read_to_string(init)
            .with_context(|| format!("Failed to read init script {:?}", init))?;
        executor.execute_batch(&script).await?;
    }

    Ok(executor)
}

fn column_header(column: &Column) -> String {
    if column.labels.is_empty() {
        return column.name.clone();
    }

    let labels: Vec<String> = column
        .labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    format!("{}{{{}}}", column.name, labels.join(","))
}

fn print_frame(frame: &Frame) {
    if frame.columns.is_empty() {
        println!("{}: no data", frame.name);
        return;
    }

    let headers: Vec<String> = frame.columns.iter().map(column_header).collect();
    let rows: Vec<Vec<String>> = (0..frame.row_count())
        .map(|row| frame.columns.iter().map(|c| c.values.display(row)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| rows.iter().map(|r| r[i].len()).chain([h.len()]).max().unwrap_or(0))
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(headers.as_slice()));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    for row in &rows {
        println!("{}", line(row.as_slice()));
    }
    println!();
    println!("{} rows", rows.len());
}
