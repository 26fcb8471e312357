use thiserror::Error;

/// Reasons a user-supplied backup name is refused before touching the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidBackupName {
    #[error("Invalid backup filename")]
    Traversal,
    #[error("Invalid backup file type")]
    WrongExtension,
}

#[derive(Debug, Error)]
pub enum NotesError {
    /// Document or backup I/O failed; fatal to the request.
    #[error("{action}: {source:#}")]
    Io {
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("Backup file not found")]
    NotFound,
    #[error(transparent)]
    BadRequest(#[from] InvalidBackupName),
    #[error("request worker failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl NotesError {
    pub fn io(action: &'static str, source: anyhow::Error) -> Self {
        Self::Io { action, source }
    }
}
