use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gcpinv::config::Config;
use gcpinv::gcp::client::GcpClient;
use gcpinv::inventory::{
    export_buckets, export_databases, BucketOptions, CreationDateSource, DatabaseOptions,
    TerminalConsole,
};
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Export GCP resource inventories (buckets, Cloud SQL instances) with their labels
#[derive(Parser, Debug)]
#[command(name = "gcpinv", version = gcpinv::VERSION, about, long_about = None)]
struct Args {
    /// GCP project to inventory
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Log level for debugging (written to the log file)
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Skip resources whose enrichment fails instead of aborting the run
    #[arg(long, global = true)]
    skip_failed: bool,

    /// Save the effective project and regions as defaults
    #[arg(long, global = true)]
    remember: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cloud Storage buckets with creation date, ACL grantees and labels, as CSV
    Buckets {
        /// Output CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source of the CreationDate column
        #[arg(long, value_enum)]
        creation_date: Option<CreationDateSource>,
    },
    /// Cloud SQL instances per region with their labels, as an XLSX workbook
    Databases {
        /// Output workbook path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Regions to inventory (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        regions: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> Option<&'static str> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some("error"),
            LogLevel::Warn => Some("warn"),
            LogLevel::Info => Some("info"),
            LogLevel::Debug => Some("debug"),
            LogLevel::Trace => Some("trace"),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(directive) = level.as_directive() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing::Level::TRACE))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcpinv started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcpinv").join("gcpinv.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gcpinv").join("gcpinv.log");
    }
    PathBuf::from("gcpinv.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let mut config = Config::load();
    let project = config.effective_project(args.project.as_deref()).context(
        "No GCP project configured. Set GOOGLE_CLOUD_PROJECT or use --project flag",
    )?;
    tracing::info!("Using project: {}", project);

    let client = GcpClient::new(&project).await?;
    let mut console = TerminalConsole::new();

    match &args.command {
        Command::Buckets {
            output,
            creation_date,
        } => {
            let path = config.effective_bucket_output(output.as_deref());
            let options = BucketOptions {
                creation_date: config.effective_creation_date(*creation_date),
                skip_failed: args.skip_failed,
            };

            let rows = export_buckets(&client, &options, &path, &mut console).await?;
            println!(
                "Bucket information including creation date, access, and tags for {} buckets saved to {}",
                rows,
                path.display()
            );
        },
        Command::Databases { output, regions } => {
            let path = config.effective_database_output(output.as_deref());
            let options = DatabaseOptions {
                regions: config.effective_regions(regions),
                skip_failed: args.skip_failed,
            };

            let rows = export_databases(&client, &options, &path, &mut console).await?;
            println!(
                "Cloud SQL inventory of {} instances across {} regions saved to {}",
                rows,
                options.regions.len(),
                path.display()
            );

            if args.remember {
                config.regions = Some(options.regions.clone());
            }
        },
    }

    if args.remember {
        config.project_id = Some(project);
        config.save().context("Failed to save configuration")?;
    }

    Ok(())
}
