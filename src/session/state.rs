//! Client-side autosave protocol. The editor page script implements these
//! transitions and shows these status strings; this type is their reference model.

use std::time::{Duration, Instant};

pub const STATUS_TYPING: &str = "Typing...";
pub const STATUS_SAVING: &str = "Saving...";
pub const STATUS_SAVED_PREFIX: &str = "Last saved: ";
pub const STATUS_ERROR: &str = "Error saving!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    /// Showing the last confirmed save.
    Viewing,
    /// Local changes not yet sent.
    Editing,
    /// An autosave request is in flight.
    Saving,
    /// The last save failed; typing resumes editing.
    Failed,
}

#[derive(Debug, Clone)]
pub struct EditSession {
    state: EditState,
    debounce: Duration,
    deadline: Option<Instant>,
    last_saved: String,
}

impl EditSession {
    pub fn new(debounce: Duration, last_saved: impl Into<String>) -> Self {
        Self {
            state: EditState::Viewing,
            debounce,
            deadline: None,
            last_saved: last_saved.into(),
        }
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn last_saved(&self) -> &str {
        &self.last_saved
    }

    /// A keystroke restarts the debounce window.
    pub fn on_input(&mut self, now: Instant) {
        self.state = EditState::Editing;
        self.deadline = Some(now + self.debounce);
    }

    /// Returns `true` when an autosave request should be issued now.
    pub fn poll(&mut self, now: Instant) -> bool {
        match (self.state, self.deadline) {
            (EditState::Editing, Some(deadline)) if now >= deadline => {
                self.deadline = None;
                self.state = EditState::Saving;
                true
            }
            _ => false,
        }
    }

    /// Manual submit: save immediately, skipping the debounce window.
    pub fn submit(&mut self) {
        self.deadline = None;
        self.state = EditState::Saving;
    }

    /// A response for an older request may land after new typing; the session
    /// then stays in `Editing`.
    pub fn on_save_succeeded(&mut self, last_saved: impl Into<String>) {
        self.last_saved = last_saved.into();
        if self.state == EditState::Saving {
            self.state = EditState::Viewing;
        }
    }

    pub fn on_save_failed(&mut self) {
        if self.state == EditState::Saving {
            self.state = EditState::Failed;
        }
    }

    pub fn status_text(&self) -> String {
        match self.state {
            EditState::Viewing => format!("{STATUS_SAVED_PREFIX}{}", self.last_saved),
            EditState::Editing => STATUS_TYPING.to_string(),
            EditState::Saving => STATUS_SAVING.to_string(),
            EditState::Failed => STATUS_ERROR.to_string(),
        }
    }
}
