use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use memlink::config::{validate_config, Config, ConfigLoader, CONFIG_FILE};

/// Attach to a process and keep a memory session running against one of its modules
#[derive(Debug, Parser)]
#[command(name = "memlink", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Target process name, overriding the config
    #[arg(long)]
    process: Option<String>,

    /// Target module name, overriding the config
    #[arg(long)]
    module: Option<String>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = ConfigLoader::new(&self.config)
            .load_or_default()
            .with_context(|| format!("loading {}", self.config.display()))?;

        if let Some(process) = &self.process {
            config.target.process_name = process.clone();
        }
        if let Some(module) = &self.module {
            config.target.module_name = module.clone();
        }

        validate_config(&config)?;
        Ok(config)
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_logging(&config);

    info!("Starting memlink v{}", env!("CARGO_PKG_VERSION"));
    info!("Architecture: {}", std::env::consts::ARCH);

    run(config).await
}

#[cfg(any(windows, target_os = "linux"))]
async fn run(config: Config) -> Result<()> {
    use memlink::process::SystemLocator;
    use memlink::supervisor::{ProbeSessionFactory, Supervisor};

    let mut supervisor = Supervisor::start(
        config.supervisor_config(),
        SystemLocator,
        ProbeSessionFactory,
    )
    .context("starting memory worker")?;

    let mut diagnostics = tokio::time::interval(config.diagnostics_interval());
    info!("memlink ready. Press Ctrl+C to shutdown.");

    loop {
        tokio::select! {
            _ = diagnostics.tick() => {
                let snapshot = serde_json::to_string(&supervisor.diagnostics())?;
                info!(diagnostics = %snapshot, "status");
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    info!("Shutting down memlink");
    tokio::task::spawn_blocking(move || supervisor.shutdown()).await?;
    Ok(())
}

#[cfg(not(any(windows, target_os = "linux")))]
async fn run(_config: Config) -> Result<()> {
    anyhow::bail!("memlink supports Windows and Linux targets only");
}
