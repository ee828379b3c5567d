use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;

use pacswitch::{Config, ConfigStore, FileBackupSink, FileEventLog, Layout, PacSwitcher, ProxyState};

#[derive(Parser)]
#[command(name = "pacswitch")]
#[command(about = "Switch the automatic proxy configuration script on or off")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Connection settings record layout, overrides the configuration file
    #[arg(short, long, value_enum)]
    layout: Option<Layout>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current PAC url and whether it is active
    Status,
    /// Back up the connection settings and install a PAC url
    Enable {
        /// http(s) url of the .pac script
        url: String,
    },
    /// Back up the connection settings and remove the PAC url
    Disable,
    /// Only snapshot the binary connection settings records
    Backup,
    /// Print the operation history
    History,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let mut config = load_config(&config_path)?;
    if let Some(layout) = cli.layout {
        config.layout = Some(layout);
    }

    match cli.command {
        Commands::Status => cmd_status(&config),
        Commands::Enable { url } => {
            let mut switcher = open_switcher(&config)?;
            switcher.enable(&url)?;
            println!("{}", switcher.last_status());
            Ok(())
        }
        Commands::Disable => {
            let mut switcher = open_switcher(&config)?;
            switcher.disable()?;
            println!("{}", switcher.last_status());
            Ok(())
        }
        Commands::Backup => {
            let mut switcher = open_switcher(&config)?;
            switcher.backup()?;
            println!("{}", switcher.last_status());
            Ok(())
        }
        Commands::History => cmd_history(&config),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("failed to load {}", path.display()))
}

fn open_switcher(
    config: &Config,
) -> Result<PacSwitcher<impl ConfigStore, FileBackupSink, FileEventLog>> {
    let store = pacswitch::system_store().context("cannot open the proxy settings store")?;
    PacSwitcher::from_config(store, config)
        .context("pass --layout or set `layout` in the configuration file")
}

fn cmd_status(config: &Config) -> Result<()> {
    let state = open_switcher(config)?.state()?;
    match state {
        ProxyState::Disabled => println!("disabled"),
        ProxyState::EnabledWithUrl(url) => println!("enabled: {url}"),
    }
    Ok(())
}

fn cmd_history(config: &Config) -> Result<()> {
    let log = FileEventLog::new(&config.history_log);
    let history = log
        .read_all()
        .with_context(|| format!("failed to read {}", log.path().display()))?;
    print!("{history}");
    Ok(())
}
