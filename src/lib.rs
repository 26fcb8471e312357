pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod web;

pub use config::{AppConfig, ConfigLoader, NotesPaths};
pub use error::NotesError;
pub use session::Notebook;
