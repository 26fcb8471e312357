use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use time::PrimitiveDateTime;

use super::{long_label, parse_backup_stamp, short_label, BACKUP_SUFFIX};
use crate::error::{InvalidBackupName, NotesError};

/// A backup file name that is safe to join onto the backup directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackupName(String);

impl BackupName {
    pub fn parse(raw: &str) -> Result<Self, InvalidBackupName> {
        if raw.contains("..") || raw.contains(['/', '\\', '\0']) {
            return Err(InvalidBackupName::Traversal);
        }
        if !raw.ends_with(BACKUP_SUFFIX) {
            return Err(InvalidBackupName::WrongExtension);
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn timestamp(&self) -> Option<PrimitiveDateTime> {
        parse_backup_stamp(&self.0)
    }

    /// "Jan 2, 2006 at 15:04:05", or the raw name when it carries no timestamp.
    pub fn short_label(&self) -> String {
        self.timestamp()
            .and_then(short_label)
            .unwrap_or_else(|| self.0.clone())
    }

    /// "January 2, 2006 at 15:04:05", or the raw name.
    pub fn long_label(&self) -> String {
        self.timestamp()
            .and_then(long_label)
            .unwrap_or_else(|| self.0.clone())
    }
}

impl fmt::Display for BackupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn validate(raw: &str) -> bool {
    BackupName::parse(raw).is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: BackupName,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct BackupSnapshot {
    pub name: BackupName,
    pub label: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct BackupCatalog {
    dir: PathBuf,
}

impl BackupCatalog {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All `.bak` files, newest first. A missing or unreadable directory is an
    /// empty catalog.
    pub fn list(&self) -> Vec<CatalogEntry> {
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                tracing::warn!(?err, dir = %self.dir.display(), "unable to list backups");
                return Vec::new();
            }
        };

        let mut names = Vec::new();
        for entry in dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(?err, "skipping unreadable backup entry");
                    continue;
                }
            };
            if entry.file_type().map(|kind| kind.is_dir()).unwrap_or(true) {
                continue;
            }
            let Ok(raw) = entry.file_name().into_string() else {
                continue;
            };
            match BackupName::parse(&raw) {
                Ok(name) => names.push(name),
                Err(InvalidBackupName::WrongExtension) => {}
                Err(reason) => tracing::debug!(%reason, name = %raw, "ignoring unservable backup name"),
            }
        }

        // Identifiers embed the timestamp, so lexical order is creation order.
        names.sort_unstable_by(|a, b| b.cmp(a));
        names
            .into_iter()
            .map(|name| CatalogEntry {
                label: name.short_label(),
                name,
            })
            .collect()
    }

    pub fn read(&self, raw: &str) -> Result<BackupSnapshot, NotesError> {
        let name = BackupName::parse(raw)?;
        let path = self.dir.join(name.as_str());
        // Directories are never listed, so they are never servable either.
        if path.is_dir() {
            return Err(NotesError::NotFound);
        }
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(NotesError::NotFound),
            Err(err) => {
                let err =
                    anyhow::Error::new(err).context(format!("reading backup {}", path.display()));
                return Err(NotesError::io("Error reading backup file", err));
            }
        };
        Ok(BackupSnapshot {
            label: name.long_label(),
            name,
            content,
        })
    }
}
