use serde::Serialize;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

// Rendering used for the file timestamps shown to the presentation layer.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

// How a query is matched against file names. Derived once from the raw
// query text when a session is created and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Substring,
    ExtensionExact,
}

/*
 * A parsed search query. `match_text` is the text the predicate actually
 * compares against: for `ExtensionExact` queries it is the raw text with
 * the leading dot stripped, otherwise it equals the raw text.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    raw_text: String,
    mode: QueryMode,
    match_text: String,
}

impl Query {
    /*
     * Derives the match mode from the raw user input. Text of length > 1
     * beginning with '.' selects `ExtensionExact`; anything else is a plain
     * substring query. Returns `None` for an empty input, which callers must
     * reject before a session is created.
     */
    pub fn parse(raw_text: &str) -> Option<Query> {
        if raw_text.is_empty() {
            return None;
        }
        let (mode, match_text) = if raw_text.len() > 1 && raw_text.starts_with('.') {
            (QueryMode::ExtensionExact, raw_text[1..].to_string())
        } else {
            (QueryMode::Substring, raw_text.to_string())
        };
        Some(Query {
            raw_text: raw_text.to_string(),
            mode,
            match_text,
        })
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    pub fn match_text(&self) -> &str {
        &self.match_text
    }
}

// The directory a search starts from. Canonicalized by the engine before a
// session is created, so walkers always see an absolute, resolved path.
#[derive(Debug, Clone)]
pub struct SearchRoot {
    path: PathBuf,
}

impl SearchRoot {
    pub fn new(path: PathBuf) -> Self {
        SearchRoot { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/*
 * One matched file, in the shape the presentation layer consumes: file name,
 * absolute path, and pre-formatted creation/modification timestamps. A record
 * is always constructed with all four fields at once; a partially populated
 * record is never observable by a consumer.
 */
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub name: String,
    pub full_path: PathBuf,
    pub created_at: String,
    pub modified_at: String,
}

impl MatchRecord {
    pub fn new(name: String, full_path: PathBuf, created_at: String, modified_at: String) -> Self {
        MatchRecord {
            name,
            full_path,
            created_at,
            modified_at,
        }
    }

    /*
     * Builds a fully populated record from file metadata, or `None` when the
     * needed timestamps cannot be read or rendered (the caller then skips the
     * entry, consistent with the walk's partial-failure policy). Platforms
     * without a creation timestamp fall back to the modification time.
     */
    pub fn from_metadata(
        name: String,
        full_path: PathBuf,
        metadata: &Metadata,
        offset: UtcOffset,
    ) -> Option<MatchRecord> {
        let modified = metadata.modified().ok()?;
        let created = metadata.created().unwrap_or(modified);
        let modified_at = format_timestamp(modified, offset)?;
        let created_at = format_timestamp(created, offset)?;
        Some(MatchRecord::new(name, full_path, created_at, modified_at))
    }
}

/*
 * Renders a filesystem timestamp as `YYYY-MM-DD HH:MM:SS` in the given
 * offset. Returns `None` if formatting fails, which can only happen for
 * timestamps far outside the representable calendar range.
 */
pub fn format_timestamp(timestamp: SystemTime, offset: UtcOffset) -> Option<String> {
    OffsetDateTime::from(timestamp)
        .to_offset(offset)
        .format(TIMESTAMP_FORMAT)
        .ok()
}

/*
 * A batch of drained results flowing from the engine to the presentation
 * layer. Tagged with the owning session's generation so a host can discard
 * output from a superseded session, and flagged `is_final` exactly once,
 * after the session reached a terminal state and its sink was flushed.
 */
#[derive(Debug, Clone)]
pub struct DrainBatch {
    pub generation: u64,
    pub records: Vec<MatchRecord>,
    pub is_final: bool,
}
