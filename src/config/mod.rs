use std::env;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::UserDirs;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 8013;
pub const NOTES_FILE_NAME: &str = "notes.txt";
pub const BACKUP_DIR_NAME: &str = "notes_backups";

const ENV_CONFIG: &str = "NOTES_CONFIG";
const ENV_DIR: &str = "NOTES_DIR";
const ENV_PORT: &str = "NOTES_PORT";
const ENV_BIND: &str = "NOTES_BIND";

/// Values supplied on the command line; they win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub dir: Option<PathBuf>,
    pub port: Option<u16>,
    pub bind: Option<IpAddr>,
}

pub struct ConfigLoader {
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self { overrides }
    }

    pub fn load(&self) -> Result<AppConfig> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Resolves defaults, then the optional TOML file, then `lookup` (the
    /// process environment in production), then the CLI overrides.
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config_file = self
            .overrides
            .config_file
            .clone()
            .or_else(|| lookup(ENV_CONFIG).map(PathBuf::from));
        let mut cfg = match config_file {
            Some(path) => Self::read_file(&path)?,
            None => AppConfig::default(),
        };

        if let Some(dir) = lookup(ENV_DIR) {
            cfg.notes_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_PORT) {
            match raw.trim().parse::<u16>() {
                Ok(port) => cfg.port = port,
                Err(_) => tracing::warn!(
                    value = %raw,
                    fallback = cfg.port,
                    "invalid port number in {ENV_PORT}, using fallback port"
                ),
            }
        }
        if let Some(raw) = lookup(ENV_BIND) {
            match raw.trim().parse::<IpAddr>() {
                Ok(bind) => cfg.bind = bind,
                Err(_) => tracing::warn!(
                    value = %raw,
                    fallback = %cfg.bind,
                    "invalid bind address in {ENV_BIND}, using fallback address"
                ),
            }
        }

        if let Some(dir) = &self.overrides.dir {
            cfg.notes_dir = dir.clone();
        }
        if let Some(port) = self.overrides.port {
            cfg.port = port;
        }
        if let Some(bind) = self.overrides.bind {
            cfg.bind = bind;
        }

        cfg.post_load();
        Ok(cfg)
    }

    fn read_file(path: &Path) -> Result<AppConfig> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config toml {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding `notes.txt` and the backup directory. Empty means the home directory.
    pub notes_dir: PathBuf,
    pub port: u16,
    pub bind: IpAddr,
    /// Client-side inactivity delay before an autosave request is sent.
    pub debounce_ms: u64,
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            notes_dir: PathBuf::new(),
            port: DEFAULT_PORT,
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            debounce_ms: 250,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    fn post_load(&mut self) {
        if self.notes_dir.as_os_str().is_empty() {
            self.notes_dir = default_notes_dir();
        }
    }

    pub fn paths(&self) -> NotesPaths {
        NotesPaths::from_dir(&self.notes_dir)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn default_notes_dir() -> PathBuf {
    match UserDirs::new() {
        Some(dirs) => dirs.home_dir().to_path_buf(),
        None => {
            tracing::warn!("unable to resolve home directory, using current directory");
            PathBuf::from(".")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesPaths {
    pub notes_file: PathBuf,
    pub backup_dir: PathBuf,
}

impl NotesPaths {
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            notes_file: dir.join(NOTES_FILE_NAME),
            backup_dir: dir.join(BACKUP_DIR_NAME),
        }
    }
}
