/*
 * The platform-agnostic search engine core: query parsing and the pure match
 * predicate, the cancellable filesystem walker, the append-only result sink
 * with its periodic drainer, session/engine orchestration, and the persisted
 * search-history collaborator. Everything a host (GUI or CLI) needs is
 * re-exported here; the host contributes only presentation and a timer.
 */
pub mod drainer;
pub mod engine;
pub mod history;
pub mod match_rule;
pub mod models;
pub mod path_utils;
pub mod result_sink;
pub mod session;
pub mod walker;

// Re-export key structures and enums
pub use models::{DrainBatch, MatchRecord, Query, QueryMode, SearchRoot};

// Re-export engine/session related items
pub use engine::{SearchEngine, SearchError};
pub use session::{SearchSession, SessionState};

// Re-export the producer/consumer pair around the sink
pub use drainer::Drainer;
pub use result_sink::ResultSink;
pub use walker::{CoreFileWalker, WalkerOperations};

// Re-export history related items
pub use history::{CoreHistoryStore, DEFAULT_HISTORY_LIMIT, HistoryError, HistoryStoreOperations};
