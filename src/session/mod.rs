use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backup::{
    modified_label, BackupCatalog, BackupOutcome, BackupRetention, BackupSnapshot, CatalogEntry,
    Clock,
};
use crate::config::NotesPaths;
use crate::error::NotesError;
use crate::storage::DocumentStore;

pub mod state;

pub use state::{EditSession, EditState};

/// Everything the editor page shows on a full fetch.
#[derive(Debug, Clone)]
pub struct EditorView {
    pub content: String,
    pub last_saved: String,
    pub backups: Vec<CatalogEntry>,
    pub notes_file: PathBuf,
    pub backup_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SaveReceipt {
    /// `YYYY-MM-DD HH:MM:SS` of the new document, empty if it cannot be stat'd.
    pub last_saved: String,
    pub backup: Option<BackupOutcome>,
}

/// Server side of the edit session: full fetch, full save, backup lookup.
///
/// Every save snapshots the existing document before overwriting it. Two
/// concurrent saves can interleave their snapshot and overwrite steps; the
/// editor assumes a single active writer.
#[derive(Debug)]
pub struct Notebook {
    store: DocumentStore,
    retention: BackupRetention,
    catalog: BackupCatalog,
    clock: Arc<dyn Clock>,
}

impl Notebook {
    pub fn new(paths: &NotesPaths, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: DocumentStore::new(paths.notes_file.clone()),
            retention: BackupRetention::new(paths.backup_dir.clone(), clock.clone()),
            catalog: BackupCatalog::new(paths.backup_dir.clone()),
            clock,
        }
    }

    pub fn notes_file(&self) -> &Path {
        self.store.path()
    }

    pub fn backup_dir(&self) -> &Path {
        self.catalog.dir()
    }

    pub fn open(&self) -> Result<EditorView, NotesError> {
        let document = self
            .store
            .load_or_init()
            .map_err(|err| NotesError::io("Error reading notes file", err))?;
        Ok(EditorView {
            content: String::from_utf8_lossy(&document.content).into_owned(),
            last_saved: modified_label(document.modified, self.clock.as_ref()),
            backups: self.catalog.list(),
            notes_file: self.notes_file().to_path_buf(),
            backup_dir: self.backup_dir().to_path_buf(),
        })
    }

    pub fn save(&self, content: &str) -> Result<SaveReceipt, NotesError> {
        let backup = match self.store.read() {
            Ok(Some(previous)) => Some(self.retention.snapshot_and_prune(&previous)),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(?err, "previous notes unreadable, saving without backup");
                Some(BackupOutcome::Skipped)
            }
        };
        self.store
            .write(content.as_bytes())
            .map_err(|err| NotesError::io("Error saving notes file", err))?;
        tracing::debug!(bytes = content.len(), "saved notes");
        Ok(SaveReceipt {
            last_saved: modified_label(self.store.last_modified(), self.clock.as_ref()),
            backup,
        })
    }

    pub fn backups(&self) -> Vec<CatalogEntry> {
        self.catalog.list()
    }

    pub fn backup(&self, name: &str) -> Result<BackupSnapshot, NotesError> {
        self.catalog.read(name)
    }
}
