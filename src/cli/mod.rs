use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::backup::SystemClock;
use crate::config::{ConfigLoader, ConfigOverrides};
use crate::web;

#[derive(Parser, Debug)]
#[command(
    name = "notes-web",
    version,
    about = "Single-note web editor with autosave and rolling backups"
)]
pub struct Cli {
    /// TOML config file (takes precedence over NOTES_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding notes.txt and notes_backups/ (takes precedence over NOTES_DIR)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Listening port (takes precedence over NOTES_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Listening address (takes precedence over NOTES_BIND)
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            dir: self.dir.clone(),
            port: self.port,
            bind: self.bind,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    // The local offset is only readable while the process is single-threaded.
    let clock = Arc::new(SystemClock::local());

    let config = ConfigLoader::new(cli.overrides()).load()?;
    let paths = config.paths();
    tracing::info!(path = %paths.notes_file.display(), "using notes file");
    tracing::info!(path = %paths.backup_dir.display(), "using backup directory");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(web::serve(config, clock))
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
