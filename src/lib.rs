/*
 * file_seeker: an incremental, cancellable filesystem search engine.
 *
 * A background walker matches file names under a chosen root against a
 * substring or dot-extension query and streams fully populated records into
 * an append-only sink, which a host drains at its own cadence. Hosts (a GUI
 * shell, or the bundled CLI) own presentation, timers, and history policy;
 * the engine owns traversal, matching, cancellation, and batching.
 */
pub mod core;
