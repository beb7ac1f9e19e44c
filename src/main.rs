use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{ArgGroup, Parser, ValueEnum};
use log::{debug, error};
use std::io;

use regprune::config::{AppSettings, Config, Credentials};
use regprune::pruner::Pruner;
use regprune::registry::{
    ContainerRegistry, RegistryKind, create_all_registries, create_registry,
};
use regprune::strategy::StrategySelection;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Blue.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Yellow.on_default())
    .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::Red.on_default());

const AFTER_HELP: &str = "Environment variables:
  GHCR_TOKEN              GitHub personal access token (for GHCR)
  DOCKER_USERNAME         Docker Hub username
  DOCKER_PASSWORD         Docker Hub password or access token
  REGPRUNE_LOG_LEVEL      Log level (TRACE, DEBUG, INFO, WARN, ERROR, OFF)
  REGPRUNE_SETTINGS_FILE  Optional JSON settings file (API URLs, page size, timeout)";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RegistrySelector {
    Ghcr,
    Dockerhub,
    All,
}

/// Prune container images from Docker Hub and/or GitHub Container Registry (GHCR).
#[derive(Parser, Debug)]
#[command(name = "regprune")]
#[command(version, about)]
#[command(styles = STYLES)]
#[command(after_help = AFTER_HELP)]
#[command(group(
    ArgGroup::new("strategy")
        .required(true)
        .multiple(false)
        .args(["prune_untagged_age", "prune_all_untagged", "keep_latest"])
))]
struct Cli {
    /// Name of the container image.
    #[arg(long)]
    container: String,

    /// Which registry to prune.
    #[arg(long, value_enum, default_value_t = RegistrySelector::All)]
    registry: RegistrySelector,

    /// Delete untagged images older than DAYS days.
    #[arg(long, value_name = "DAYS", value_parser = parse_days)]
    prune_untagged_age: Option<f64>,

    /// Delete ALL untagged images.
    #[arg(long)]
    prune_all_untagged: bool,

    /// Keep only the latest COUNT images (delete all others).
    #[arg(long, value_name = "COUNT")]
    keep_latest: Option<usize>,

    /// Do not actually prune images, just list which images would be pruned.
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print extra debug info.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_days(value: &str) -> Result<f64, String> {
    let days: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !days.is_finite() || days < 0.0 {
        return Err(format!("'{}' must be a non-negative number of days", value));
    }
    Ok(days)
}

fn build_registries(
    cli: &Cli,
    config: &Config,
    credentials: &Credentials,
    settings: &AppSettings,
) -> Result<Vec<Box<dyn ContainerRegistry>>, regprune::registry::RegistryError> {
    match cli.registry {
        RegistrySelector::All => {
            create_all_registries(&cli.container, credentials, settings, &config.user_agent)
        }
        RegistrySelector::Ghcr => Ok(vec![create_registry(
            RegistryKind::Ghcr,
            &cli.container,
            credentials,
            settings,
            &config.user_agent,
        )?]),
        RegistrySelector::Dockerhub => Ok(vec![create_registry(
            RegistryKind::DockerHub,
            &cli.container,
            credentials,
            settings,
            &config.user_agent,
        )?]),
    }
}

fn main() {
    // Initialize configuration from environment variables
    let config = Config::from_env();

    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(config.effective_log_level(cli.verbose))
        .init();

    debug!(
        "Configuration loaded: log_level={:?}, user_agent={}, settings_file={:?}",
        config.log_level, config.user_agent, config.settings_file
    );

    let strategy = match (StrategySelection {
        prune_untagged_age: cli.prune_untagged_age,
        prune_all_untagged: cli.prune_all_untagged,
        keep_latest: cli.keep_latest,
    })
    .into_strategy()
    {
        Ok(strategy) => strategy,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let settings = match AppSettings::load_or_default(config.settings_file.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };

    let credentials = Credentials::from_env();
    debug!("Credentials loaded: {:?}", credentials);

    let mut registries = match build_registries(&cli, &config, &credentials, &settings) {
        Ok(registries) => registries,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut pruner = Pruner::new(strategy.as_ref(), cli.dry_run, stdout.lock());
    if let Err(e) = pruner.run(&mut registries) {
        error!("Failed to write report: {}", e);
        std::process::exit(1);
    }
}
