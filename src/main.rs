use anyhow::{Context, Result};
use brand_radar::config::LoggingConfig;
use brand_radar::models::NotificationStatus;
use brand_radar::registry::{BrandRegistry, RegistryChange};
use brand_radar::{AppConfig, Radar};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "brand-radar", version, about = "Scan brand storefronts for new products")]
struct Cli {
    /// Directory holding default.toml / <RUN_MODE>.toml / local.toml
    #[arg(long, default_value = "config", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan every brand, write the dated report and email the summary
    Run {
        /// Report date (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Skip the summary email
        #[arg(long)]
        no_email: bool,
    },
    /// Edit the brand registry
    Brands {
        /// Registry file (defaults to paths.brands_file)
        #[arg(long)]
        file: Option<PathBuf>,

        #[command(subcommand)]
        action: BrandsAction,
    },
}

#[derive(Subcommand)]
enum BrandsAction {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: Option<String>,
    },
    Remove {
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config);
    let _guard = init_logging(config.as_ref().ok().map(|c| &c.logging))?;
    let config = config.context("Failed to load configuration")?;

    match cli.command {
        Command::Run { date, no_email } => run(&config, date, !no_email).await,
        Command::Brands { file, action } => {
            let path = file.unwrap_or_else(|| config.paths.brands_file.clone());
            brands(BrandRegistry::new(path), action)
        }
    }
}

async fn run(config: &AppConfig, date: Option<NaiveDate>, send_email: bool) -> Result<()> {
    let brands = BrandRegistry::new(&config.paths.brands_file).load()?;
    if brands.is_empty() {
        warn!("No brands configured in {}", config.paths.brands_file.display());
    }

    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    info!("Starting Brand Radar for {} ({} brands)", date, brands.len());

    let radar = Radar::from_config(config, send_email)?;
    let summary = radar.run(&brands, date).await?;

    if let NotificationStatus::Failed(error) = &summary.notification {
        warn!("Report and state saved, but the summary email failed: {}", error);
    }
    Ok(())
}

fn brands(registry: BrandRegistry, action: BrandsAction) -> Result<()> {
    match action {
        BrandsAction::List => {
            for brand in registry.load_for_edit()? {
                println!("{}\t{}", brand.name, brand.url);
            }
        }
        BrandsAction::Add { name, url } => {
            let change = registry.add(&name, url.as_deref())?;
            if change == RegistryChange::Unchanged {
                info!("{} already registered, nothing changed", name.trim());
            }
            println!("{} updated", registry.path().display());
        }
        BrandsAction::Remove { name } => {
            registry.remove(&name)?;
            println!("{} updated", registry.path().display());
        }
    }
    Ok(())
}

fn init_logging(logging: Option<&LoggingConfig>) -> Result<Option<WorkerGuard>> {
    let level = logging.map(|l| l.level.as_str()).unwrap_or("info");
    let filter = log_filter(std::env::var("RUST_LOG").ok().as_deref(), level)?;

    let (file_layer, guard) = match logging.and_then(|l| l.directory.as_ref()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "brand-radar.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// `RUST_LOG` wins when set; otherwise the configured level applies to this crate.
fn log_filter(rust_log: Option<&str>, level: &str) -> Result<EnvFilter> {
    match rust_log.filter(|v| !v.trim().is_empty()) {
        Some(directives) => Ok(EnvFilter::try_new(directives)?),
        None => Ok(EnvFilter::try_new(format!("brand_radar={}", level))?),
    }
}
