use std::fmt;
use std::time::SystemTime;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub mod catalog;
pub mod retention;

pub use catalog::{BackupCatalog, BackupName, BackupSnapshot, CatalogEntry};
pub use retention::{BackupOutcome, BackupRetention, RETENTION_WINDOW};

pub const BACKUP_PREFIX: &str = "notes_";
pub const BACKUP_SUFFIX: &str = ".bak";

const STAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");
const SHORT_LABEL_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[month repr:short] [day padding:none], [year] at [hour]:[minute]:[second]"
);
const LONG_LABEL_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[month repr:long] [day padding:none], [year] at [hour]:[minute]:[second]"
);
const MODIFIED_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Wall-clock source for backup identifiers and display timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> OffsetDateTime;

    /// Offset applied when showing file modification times.
    fn offset(&self) -> UtcOffset;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    /// Captures the local UTC offset. Must run before the process spawns
    /// threads, otherwise the offset cannot be determined and UTC is used.
    pub fn local() -> Self {
        let offset = UtcOffset::current_local_offset().unwrap_or_else(|err| {
            tracing::warn!(?err, "local UTC offset unavailable, timestamps will be UTC");
            UtcOffset::UTC
        });
        Self { offset }
    }

    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }

    fn offset(&self) -> UtcOffset {
        self.offset
    }
}

/// `notes_YYYYMMDD_HHMMSS.bak` for the given instant.
pub fn backup_file_name(at: OffsetDateTime) -> String {
    let stamp = at
        .format(STAMP_FORMAT)
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("{BACKUP_PREFIX}{stamp}{BACKUP_SUFFIX}")
}

/// Parses the timestamp embedded in a backup file name. The whole name must
/// match the naming convention; anything else yields `None`.
pub fn parse_backup_stamp(name: &str) -> Option<PrimitiveDateTime> {
    let stamp = name
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_SUFFIX)?;
    let well_formed = stamp.len() == 15
        && stamp.bytes().enumerate().all(|(idx, byte)| match idx {
            8 => byte == b'_',
            _ => byte.is_ascii_digit(),
        });
    if !well_formed {
        return None;
    }
    PrimitiveDateTime::parse(stamp, STAMP_FORMAT).ok()
}

pub fn short_label(stamp: PrimitiveDateTime) -> Option<String> {
    stamp.format(SHORT_LABEL_FORMAT).ok()
}

pub fn long_label(stamp: PrimitiveDateTime) -> Option<String> {
    stamp.format(LONG_LABEL_FORMAT).ok()
}

/// `YYYY-MM-DD HH:MM:SS` in the clock's offset; empty when unknown.
pub fn modified_label(modified: Option<SystemTime>, clock: &dyn Clock) -> String {
    modified
        .map(|time| OffsetDateTime::from(time).to_offset(clock.offset()))
        .and_then(|time| time.format(MODIFIED_FORMAT).ok())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use time::{Duration, OffsetDateTime, UtcOffset};

    use super::Clock;

    /// Clock that advances a fixed step every time it is read.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<OffsetDateTime>,
        step: Duration,
    }

    impl SteppingClock {
        pub fn new(start: OffsetDateTime, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }

        pub fn fixed(at: OffsetDateTime) -> Self {
            Self::new(at, Duration::ZERO)
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> OffsetDateTime {
            let mut next = self.next.lock().unwrap_or_else(|poison| poison.into_inner());
            let current = *next;
            *next = current + self.step;
            current
        }

        fn offset(&self) -> UtcOffset {
            UtcOffset::UTC
        }
    }
}
