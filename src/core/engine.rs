/*
 * Orchestrates search sessions: validates the query and root before any
 * session exists, assigns monotonically increasing generation ids, spawns
 * one worker thread per session, and supersedes the previously active
 * session when a new search starts. This is the invocation surface a host
 * wires its UI (or CLI) against: `start_search`, `stop`, `drain`.
 *
 * Superseding never waits for the old worker: its cancellation flag is set
 * and it runs to its next check, writing into its own orphaned sink. Hosts
 * tell fresh output from stale output by comparing batch generations with
 * `current_generation`.
 */
use super::models::{MatchRecord, Query, SearchRoot};
use super::session::SearchSession;
use super::walker::{CoreFileWalker, WalkerOperations};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use time::UtcOffset;

#[derive(Debug)]
pub enum SearchError {
    EmptyQuery,
    RootInvalid(PathBuf),
    WorkerSpawn(io::Error),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::EmptyQuery => write!(f, "Search query must not be empty"),
            SearchError::RootInvalid(p) => {
                write!(f, "Search root is not an existing directory: {p:?}")
            }
            SearchError::WorkerSpawn(e) => write!(f, "Failed to spawn search worker: {e}"),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SearchError::WorkerSpawn(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

pub struct SearchEngine {
    walker: Arc<dyn WalkerOperations>,
    next_generation: AtomicU64,
    active: Mutex<Option<Arc<SearchSession>>>,
}

impl SearchEngine {
    pub fn new() -> Self {
        SearchEngine::with_walker(Arc::new(CoreFileWalker::new()))
    }

    // Injection point for scripted walkers in tests.
    pub fn with_walker(walker: Arc<dyn WalkerOperations>) -> Self {
        SearchEngine {
            walker,
            next_generation: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /*
     * Starts a new search session. Rejects an empty query (`EmptyQuery`) and a
     * missing or non-directory root (`RootInvalid`) before any session exists
     * or any worker is spawned. On success the previously active session, if
     * still running, is cancelled without being waited on, and the returned
     * session is already `Running` with its walker underway.
     */
    pub fn start_search(&self, query_text: &str, root_path: &Path) -> Result<Arc<SearchSession>> {
        let query = Query::parse(query_text).ok_or(SearchError::EmptyQuery)?;

        // Canonicalizing both validates existence and gives the walker an
        // absolute, resolved path to stamp onto every record.
        let canonical_root = root_path
            .canonicalize()
            .map_err(|_| SearchError::RootInvalid(root_path.to_path_buf()))?;
        if !canonical_root.is_dir() {
            return Err(SearchError::RootInvalid(root_path.to_path_buf()));
        }

        // The local offset is captured once, on the caller's thread; when the
        // platform refuses to disclose it the timestamps fall back to UTC.
        let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = Arc::new(SearchSession::new(
            query,
            SearchRoot::new(canonical_root),
            generation,
            offset,
        ));
        log::info!(
            "SearchEngine: Starting session {generation} for query '{query_text}' under {root_path:?}."
        );

        self.supersede_active(Arc::clone(&session));

        session.mark_running();
        let walker = Arc::clone(&self.walker);
        let worker_session = Arc::clone(&session);
        let handle = thread::Builder::new()
            .name(format!("walker-{generation}"))
            .spawn(move || {
                walker.run(&worker_session);
                // Exactly-once completion signal, regardless of which walker
                // implementation ran or how it returned.
                worker_session.finish_walk();
            })
            .map_err(SearchError::WorkerSpawn)?;
        session.attach_worker(handle);

        Ok(session)
    }

    /*
     * Requests cooperative cancellation of the given session. Idempotent; a
     * session that already reached a terminal state is left untouched.
     */
    pub fn stop(&self, session: &SearchSession) {
        session.stop();
    }

    // Pulls everything currently buffered for the session; see the drainer
    // module for the cadence contract.
    pub fn drain(&self, session: &SearchSession) -> Vec<MatchRecord> {
        session.drain()
    }

    /*
     * The generation of the most recently started session, or 0 when no
     * search has been started yet. Batches tagged with anything lower come
     * from a superseded session and should be discarded by the host.
     */
    pub fn current_generation(&self) -> u64 {
        self.next_generation.load(Ordering::SeqCst)
    }

    pub fn active_session(&self) -> Option<Arc<SearchSession>> {
        self.lock_active().clone()
    }

    fn supersede_active(&self, replacement: Arc<SearchSession>) {
        let mut active = self.lock_active();
        if let Some(old) = active.replace(replacement) {
            if !old.is_terminal() {
                log::debug!(
                    "SearchEngine: Superseding session {}; cancelling without waiting.",
                    old.generation()
                );
                old.stop();
            }
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<Arc<SearchSession>>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}
