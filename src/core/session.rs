/*
 * One user-initiated search: its query, root, generation id, cancellation
 * flag, result sink, and worker handle. The session is the only state shared
 * between the worker thread and the rest of the system; the query and root
 * are immutable once the session starts, so the cancellation flag and the
 * sink's own lock are the only synchronization in play.
 *
 * Lifecycle: Idle -> Running -> {Completed, Cancelled}. Terminal states are
 * final and a session is never reused; superseding a session cancels it and
 * constructs a fresh one.
 */
use super::models::{MatchRecord, Query, SearchRoot};
use super::result_sink::ResultSink;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use time::UtcOffset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled)
    }
}

pub struct SearchSession {
    query: Query,
    root: SearchRoot,
    generation: u64,
    utc_offset: UtcOffset,
    cancelled: AtomicBool,
    skipped: AtomicUsize,
    sink: ResultSink,
    state: Mutex<SessionState>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SearchSession {
    pub(crate) fn new(query: Query, root: SearchRoot, generation: u64, utc_offset: UtcOffset) -> Self {
        SearchSession {
            query,
            root,
            generation,
            utc_offset,
            cancelled: AtomicBool::new(false),
            skipped: AtomicUsize::new(0),
            sink: ResultSink::new(),
            state: Mutex::new(SessionState::Idle),
            worker: Mutex::new(None),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn root(&self) -> &SearchRoot {
        &self.root
    }

    /*
     * The monotonically increasing id assigned by the engine when this session
     * started. Hosts compare it against the engine's current generation to
     * discard output from a superseded session.
     */
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn utc_offset(&self) -> UtcOffset {
        self.utc_offset
    }

    // The walker polls this between file visits; it must stay a cheap,
    // non-blocking read.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /*
     * Requests cooperative cancellation. The walker observes the flag at its
     * next visited entry and exits; at most one more record can be produced
     * after this call returns. Calling `stop` on an already-terminal session
     * is a no-op, never an error.
     */
    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        let mut state = self.lock_state();
        if *state == SessionState::Running {
            log::debug!(
                "SearchSession: Session {} cancelled by stop request.",
                self.generation
            );
            *state = SessionState::Cancelled;
        }
    }

    pub fn state(&self) -> SessionState {
        *self.lock_state()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn sink(&self) -> &ResultSink {
        &self.sink
    }

    pub fn drain(&self) -> Vec<MatchRecord> {
        self.sink.drain_all()
    }

    // Diagnostic only: entries the walker skipped because they vanished or
    // could not be read. Not part of the match contract.
    pub fn skipped_count(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    pub(crate) fn note_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_running(&self) {
        let mut state = self.lock_state();
        if *state == SessionState::Idle {
            *state = SessionState::Running;
        }
    }

    /*
     * Records that the walker finished, exactly once per session. A walk that
     * ended because cancellation was observed lands in `Cancelled`; a natural
     * completion lands in `Completed`. Terminal states set earlier (by `stop`)
     * are left untouched.
     */
    pub(crate) fn finish_walk(&self) {
        let mut state = self.lock_state();
        if *state == SessionState::Running {
            *state = if self.is_cancelled() {
                SessionState::Cancelled
            } else {
                SessionState::Completed
            };
            log::debug!(
                "SearchSession: Session {} reached terminal state {:?}.",
                self.generation,
                *state
            );
        }
    }

    pub(crate) fn attach_worker(&self, handle: JoinHandle<()>) {
        *self.lock_worker() = Some(handle);
    }

    /*
     * Blocks until the worker thread has exited. After this returns no further
     * appends can reach the sink, so a drain that follows sees everything the
     * walk produced. Safe to call repeatedly; only the first call joins.
     */
    pub fn wait(&self) {
        let handle = self.lock_worker().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::warn!(
                    "SearchSession: Worker thread for session {} panicked.",
                    self.generation
                );
            }
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSession")
            .field("query", &self.query)
            .field("root", &self.root)
            .field("generation", &self.generation)
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
