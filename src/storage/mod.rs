use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct Document {
    pub content: Vec<u8>,
    pub modified: Option<SystemTime>,
}

/// The single note file. Single writer; no locking.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    path: PathBuf,
}

impl DocumentStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current bytes, or `None` when the document has never been written.
    pub fn read(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("reading notes file {}", self.path.display()))
            }
        }
    }

    /// Reads the document, creating it empty on first access.
    pub fn load_or_init(&self) -> Result<Document> {
        let content = match self.read()? {
            Some(content) => content,
            None => {
                tracing::info!(path = %self.path.display(), "creating empty notes file");
                self.write(b"")?;
                Vec::new()
            }
        };
        Ok(Document {
            content,
            modified: self.last_modified(),
        })
    }

    /// Replaces the document through a uniquely named temporary sibling and a
    /// rename, so overlapping writes never share a temp file.
    pub fn write(&self, content: &[u8]) -> Result<()> {
        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating notes directory {}", parent.display()))?;
                parent
            }
            None => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("creating temporary notes file in {}", parent.display()))?;
        tmp.write_all(content)
            .with_context(|| format!("writing temporary notes file {}", tmp.path().display()))?;
        tmp.persist(&self.path).with_context(|| {
            format!("atomically replacing notes file {}", self.path.display())
        })?;
        Ok(())
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path)
            .and_then(|metadata| metadata.modified())
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_reports_absent_document() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = DocumentStore::new(temp.path().join("notes.txt"));
        assert!(store.read()?.is_none());
        assert!(store.last_modified().is_none());
        Ok(())
    }

    #[test]
    fn load_or_init_creates_empty_document_and_parents() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("nested").join("notes.txt");
        let store = DocumentStore::new(path.clone());

        let document = store.load_or_init()?;
        assert!(document.content.is_empty());
        assert!(document.modified.is_some());
        assert!(path.is_file());
        Ok(())
    }

    #[test]
    fn write_replaces_content_without_leaving_temp_file() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = DocumentStore::new(temp.path().join("notes.txt"));

        store.write(b"first")?;
        store.write(b"second")?;
        assert_eq!(store.read()?.as_deref(), Some(&b"second"[..]));
        let leftovers: Vec<String> = fs::read_dir(temp.path())?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<_, _>>()?;
        assert_eq!(leftovers, ["notes.txt"]);
        Ok(())
    }

    #[test]
    fn overlapping_writes_all_succeed_and_last_one_lands() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = DocumentStore::new(temp.path().join("notes.txt"));
        store.write(b"seed")?;

        let failures = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|worker| {
                    let store = store.clone();
                    scope.spawn(move || {
                        (0..200)
                            .filter(|round| {
                                let body = format!("worker {worker} round {round}");
                                store.write(body.as_bytes()).is_err()
                            })
                            .count()
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().unwrap_or(usize::MAX))
                .sum::<usize>()
        });
        assert_eq!(failures, 0);

        let content = String::from_utf8(store.read()?.unwrap_or_default())?;
        assert!(content.starts_with("worker ") && content.contains(" round "));
        Ok(())
    }

    #[test]
    fn read_errors_other_than_absence_surface() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = DocumentStore::new(temp.path().to_path_buf());
        assert!(store.read().is_err());
        Ok(())
    }
}
