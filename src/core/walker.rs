/*
 * Depth-first traversal of a session's search root. The walker visits every
 * reachable regular file exactly once, applies the match predicate to the
 * file name, and appends a fully populated `MatchRecord` to the session's
 * sink for every hit. It owns no state of its own; everything it touches
 * lives on the session.
 *
 * Cancellation is cooperative: the flag is checked before every directory
 * entry, so a stop request halts the walk within one file visit. Per-entry
 * failures (permission denied, files vanishing between listing and stat)
 * are skipped and counted, never escalated; a single unreadable file must
 * not sink the whole search.
 *
 * The trait exists so the engine can be exercised with scripted walkers in
 * tests, mirroring how the scanner seam is injected elsewhere in this crate.
 */
use super::match_rule;
use super::models::MatchRecord;
use super::session::SearchSession;
use walkdir::WalkDir;

pub trait WalkerOperations: Send + Sync {
    /*
     * Runs the traversal to completion or until cancellation is observed.
     * Blocking; intended to execute on the session's dedicated worker thread.
     * Completion is signalled to the session by the engine's spawn wrapper
     * once this returns, so implementations must not mark state themselves.
     */
    fn run(&self, session: &SearchSession);
}

pub struct CoreFileWalker {}

impl CoreFileWalker {
    pub fn new() -> Self {
        CoreFileWalker {}
    }
}

impl Default for CoreFileWalker {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkerOperations for CoreFileWalker {
    fn run(&self, session: &SearchSession) {
        let root = session.root().path();
        log::debug!(
            "FileWalker: Starting walk of {root:?} for query '{}' (session {}).",
            session.query().raw_text(),
            session.generation()
        );

        let offset = session.utc_offset();
        // Not following symlinks keeps every file visited at most once and
        // rules out link cycles.
        let mut entries = WalkDir::new(root).follow_links(false).into_iter();
        loop {
            if session.is_cancelled() {
                log::debug!(
                    "FileWalker: Cancellation observed for session {}; stopping walk.",
                    session.generation()
                );
                return;
            }

            let entry = match entries.next() {
                None => break,
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    session.note_skipped();
                    log::debug!("FileWalker: Skipping unreadable entry: {err}");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if !match_rule::matches(&name, session.query()) {
                continue;
            }

            // The stat races against deletion; a vanished file is skipped like
            // any other unreadable entry.
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    session.note_skipped();
                    log::debug!(
                        "FileWalker: Failed to stat matched file {:?}: {err}",
                        entry.path()
                    );
                    continue;
                }
            };

            match MatchRecord::from_metadata(name, entry.path().to_path_buf(), &metadata, offset) {
                Some(record) => session.sink().append(record),
                None => session.note_skipped(),
            }
        }

        log::debug!(
            "FileWalker: Walk of {root:?} finished for session {} ({} buffered, {} skipped).",
            session.generation(),
            session.sink().buffered_len(),
            session.skipped_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Query, SearchRoot};
    use std::fs::{self, File};
    use std::path::Path;
    use tempfile::tempdir;
    use time::UtcOffset;

    fn session_for(root: &Path, query_text: &str) -> SearchSession {
        let session = SearchSession::new(
            Query::parse(query_text).expect("test queries are never empty"),
            SearchRoot::new(root.to_path_buf()),
            1,
            UtcOffset::UTC,
        );
        session.mark_running();
        session
    }

    fn drained_names(session: &SearchSession) -> Vec<String> {
        let mut names: Vec<String> = session.drain().into_iter().map(|r| r.name).collect();
        names.sort();
        names
    }

    #[test]
    fn test_substring_walk_matches_expected_files() {
        let dir = tempdir().expect("tempdir");
        File::create(dir.path().join("a.txt")).expect("create");
        File::create(dir.path().join("b.txt")).expect("create");
        File::create(dir.path().join("nota.log")).expect("create");

        let session = session_for(dir.path(), "a");
        CoreFileWalker::new().run(&session);

        assert_eq!(drained_names(&session), vec!["a.txt", "nota.log"]);
    }

    #[test]
    fn test_extension_walk_is_case_sensitive() {
        let dir = tempdir().expect("tempdir");
        File::create(dir.path().join("a.txt")).expect("create");
        File::create(dir.path().join("b.TXT")).expect("create");
        File::create(dir.path().join("c.doc")).expect("create");

        let session = session_for(dir.path(), ".txt");
        CoreFileWalker::new().run(&session);

        assert_eq!(drained_names(&session), vec!["a.txt"]);
    }

    #[test]
    fn test_walk_descends_into_subdirectories() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("sub/deeper")).expect("mkdirs");
        File::create(dir.path().join("top_match.rs")).expect("create");
        File::create(dir.path().join("sub/mid_match.rs")).expect("create");
        File::create(dir.path().join("sub/deeper/deep_match.rs")).expect("create");
        File::create(dir.path().join("sub/other.txt")).expect("create");

        let session = session_for(dir.path(), "match");
        CoreFileWalker::new().run(&session);

        assert_eq!(
            drained_names(&session),
            vec!["deep_match.rs", "mid_match.rs", "top_match.rs"]
        );
    }

    #[test]
    fn test_directories_are_not_reported_as_matches() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("match_dir")).expect("mkdir");
        File::create(dir.path().join("match_file")).expect("create");

        let session = session_for(dir.path(), "match");
        CoreFileWalker::new().run(&session);

        assert_eq!(drained_names(&session), vec!["match_file"]);
    }

    #[test]
    fn test_records_carry_absolute_paths_and_timestamps() {
        let dir = tempdir().expect("tempdir");
        let canonical = dir.path().canonicalize().expect("canonicalize");
        File::create(canonical.join("hit.txt")).expect("create");

        let session = session_for(&canonical, "hit");
        CoreFileWalker::new().run(&session);

        let records = session.drain();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(record.full_path.is_absolute());
        assert_eq!(record.full_path, canonical.join("hit.txt"));
        assert_eq!(record.created_at.len(), "YYYY-MM-DD HH:MM:SS".len());
        assert_eq!(record.modified_at.len(), "YYYY-MM-DD HH:MM:SS".len());
    }

    #[test]
    fn test_cancelled_session_produces_no_records() {
        let dir = tempdir().expect("tempdir");
        for i in 0..50 {
            File::create(dir.path().join(format!("file{i}.txt"))).expect("create");
        }

        let session = session_for(dir.path(), "file");
        session.stop();
        CoreFileWalker::new().run(&session);

        assert!(
            session.drain().is_empty(),
            "flag was set before the walk began, so nothing may be produced"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped_not_fatal() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("tempdir");
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).expect("mkdir");
        File::create(locked.join("hidden_match.txt")).expect("create");
        File::create(dir.path().join("visible_match.txt")).expect("create");

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("chmod");
        // Privileged users (root in CI containers) ignore the mode bits; only
        // assert the skip behavior when the directory is actually unreadable.
        let actually_unreadable = fs::read_dir(&locked).is_err();

        let session = session_for(dir.path(), "match");
        CoreFileWalker::new().run(&session);

        // Restore permissions so the tempdir can be removed.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("chmod back");

        if actually_unreadable {
            assert_eq!(drained_names(&session), vec!["visible_match.txt"]);
            assert!(
                session.skipped_count() > 0,
                "the unreadable directory must be counted as skipped"
            );
        } else {
            assert_eq!(
                drained_names(&session),
                vec!["hidden_match.txt", "visible_match.txt"]
            );
        }
    }
}
