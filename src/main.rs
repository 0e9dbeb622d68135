/*
 * CLI host for the search engine core. Plays the role a GUI shell would:
 * records the query in the history store, starts a session, drains results
 * periodically while the walk runs, and prints one row per match in the
 * shape the presentation layer consumes (name, path, created, modified).
 */
use file_seeker::core::{CoreHistoryStore, Drainer, SearchEngine, SearchError};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const APP_NAME: &str = "FileSeeker";
// Responsiveness/overhead trade-off; hosts under heavy result volume may
// shrink this.
const DRAIN_INTERVAL: Duration = Duration::from_millis(200);

fn main() {
    if let Err(e) = TermLogger::init(
        LevelFilter::Warn,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let mut args = std::env::args().skip(1);
    let Some(query_text) = args.next() else {
        eprintln!("Usage: file_seeker <query> [root]");
        eprintln!("  <query>  substring to match, or .ext for exact-extension matching");
        eprintln!("  [root]   directory to search (defaults to the current directory)");
        std::process::exit(2);
    };
    let root = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    let engine = SearchEngine::new();
    let session = match engine.start_search(&query_text, &root) {
        Ok(session) => session,
        Err(e @ SearchError::EmptyQuery) | Err(e @ SearchError::RootInvalid(_)) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Search failed to start: {e}");
            std::process::exit(1);
        }
    };

    // The search is underway; only now is the query worth remembering.
    let history = CoreHistoryStore::new(APP_NAME);
    if let Err(e) = history.remember(&query_text) {
        log::warn!("Main: Could not record query in search history: {e}");
    }

    let mut total = 0usize;
    Drainer::new(Arc::clone(&session)).run_to_completion(DRAIN_INTERVAL, &mut |batch| {
        for record in &batch.records {
            println!(
                "{}\t{}\t{}\t{}",
                record.name,
                record.full_path.display(),
                record.created_at,
                record.modified_at
            );
        }
        total += batch.records.len();
    });

    let skipped = session.skipped_count();
    if skipped > 0 {
        println!("{total} objects ({skipped} entries skipped)");
    } else {
        println!("{total} objects");
    }
}
