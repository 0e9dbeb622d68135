/*
 * An append-only, thread-safe buffer decoupling the walker's production
 * cadence from the consumer's drain cadence. The contract is deliberately
 * narrow: exactly one writer (the session's walker) appends, exactly one
 * consumer at a time drains, and `drain_all` atomically detaches everything
 * buffered so far. A mutex-guarded growable vector satisfies the
 * no-loss/no-duplicate requirement without any further cleverness.
 */
use super::models::MatchRecord;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct ResultSink {
    records: Mutex<Vec<MatchRecord>>,
}

impl ResultSink {
    pub fn new() -> Self {
        ResultSink {
            records: Mutex::new(Vec::new()),
        }
    }

    /*
     * Appends one fully populated record. Amortized O(1); called only by the
     * owning session's walker.
     */
    pub fn append(&self, record: MatchRecord) {
        self.lock_records().push(record);
    }

    /*
     * Atomically detaches and returns everything buffered, leaving the sink
     * empty. Never blocks on I/O and never errors; an empty sink yields an
     * empty vector. Every record appended before this call returns is part of
     * this batch or a strictly earlier one, and no record is returned twice.
     */
    pub fn drain_all(&self) -> Vec<MatchRecord> {
        std::mem::take(&mut *self.lock_records())
    }

    // Diagnostic view for hosts and tests; the value is stale the moment the
    // lock is released.
    pub fn buffered_len(&self) -> usize {
        self.lock_records().len()
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, Vec<MatchRecord>> {
        // A walker that panicked mid-append must not wedge the drain side;
        // recover the guard and keep serving whatever was buffered.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
