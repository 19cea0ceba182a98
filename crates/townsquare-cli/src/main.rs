use std::path::PathBuf;

use clap::{Parser, Subcommand};
use townsquare_core::Config;

mod commands;

#[derive(Parser)]
#[command(name = "townsquare-cli", version, about = "Townsquare ratingallocate feed CLI")]
struct Cli {
    /// Config file (defaults to ~/.config/townsquare/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides database.path from the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the events a user sees on the dashboard
    Events(commands::events::EventsArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Show plugin display strings
    Strings {
        /// Only print this key
        key: Option<String>,
    },
}

fn init_logging(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, townsquare_core::ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    init_logging(&config);

    let result = match cli.command {
        Commands::Events(args) => commands::events::run(args, &config, cli.db.as_deref()),
        Commands::Config { action } => {
            commands::config::run(action, config, cli.config.as_deref())
        }
        Commands::Strings { key } => commands::strings::run(key.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
