use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

use super::{backup_file_name, Clock};

/// Backups whose modification time is older than this are pruned on save.
pub const RETENTION_WINDOW: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Created(PathBuf),
    /// Snapshot could not be written; the save goes ahead regardless.
    Skipped,
}

/// Snapshots the previous document before an overwrite and sweeps expired
/// backups. Nothing here can fail a save.
#[derive(Debug, Clone)]
pub struct BackupRetention {
    dir: PathBuf,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl BackupRetention {
    pub fn new(dir: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir,
            window: RETENTION_WINDOW,
            clock,
        }
    }

    pub fn snapshot_and_prune(&self, previous: &[u8]) -> BackupOutcome {
        let outcome = match self.snapshot(previous) {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "created backup");
                BackupOutcome::Created(path)
            }
            Err(err) => {
                tracing::warn!(?err, "skipping backup, saving without one");
                BackupOutcome::Skipped
            }
        };
        let removed = self.prune_expired(SystemTime::now());
        if removed > 0 {
            tracing::debug!(removed, "pruned expired backups");
        }
        outcome
    }

    /// Writes `previous` under the current second's name, replacing any
    /// backup already taken in that second.
    pub fn snapshot(&self, previous: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating backup dir {}", self.dir.display()))?;
        let path = self.dir.join(backup_file_name(self.clock.now()));
        fs::write(&path, previous)
            .with_context(|| format!("writing backup {}", path.display()))?;
        Ok(path)
    }

    /// Deletes every non-directory entry modified before `now - window`.
    /// Returns how many were removed; failures are logged and skipped.
    pub fn prune_expired(&self, now: SystemTime) -> usize {
        let Some(cutoff) = now.checked_sub(self.window) else {
            return 0;
        };
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(err) => {
                tracing::debug!(?err, dir = %self.dir.display(), "backup dir not readable, nothing to prune");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(?err, "skipping unreadable backup entry");
                    continue;
                }
            };
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::warn!(?err, path = %entry.path().display(), "skipping backup without metadata");
                    continue;
                }
            };
            if metadata.is_dir() {
                continue;
            }
            let expired = metadata
                .modified()
                .map(|modified| modified < cutoff)
                .unwrap_or(false);
            if !expired {
                continue;
            }
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "removed expired backup");
                    removed += 1;
                }
                Err(err) => {
                    tracing::warn!(?err, path = %path.display(), "failed to remove expired backup");
                }
            }
        }
        removed
    }

    #[cfg(test)]
    pub(crate) fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    #[cfg(test)]
    pub(crate) fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}
