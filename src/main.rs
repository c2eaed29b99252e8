use anyhow::Result;
use cache_collector::core::log::init_logging;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Purge every tracked cache key of a collection
    Purge {
        /// Name of the collection to purge
        collection: String,
    },
    /// Prune expired entries from all collections
    Cleanup,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(Commands::Purge { collection }) => {
            cache_collector::run_purge(&collection, cli.config_path.as_deref())
        }
        Some(Commands::Cleanup) => cache_collector::run_cleanup(cli.config_path.as_deref()),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = cache_collector::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
# Seconds until a tracked cache key falls out of bookkeeping (5 days)
default_ttl_secs: 432000

# Subjects modified longer ago than this skip the update-triggered purge
update_threshold_secs: 432000

sweep_page_size: 100
sweep_page_limit: 100

# Override the data directory, optional
# data_path: "/var/lib/cache-collector"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
