//! Read-only observer for the OS-maintained machine-check event store,
//! used to count ECC-corrected bit flips that never surface as plain
//! memory corruption.

use log::{debug, warn};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Number of times a "database busy" error is retried before giving up on
/// one poll.
const BUSY_RETRIES: u32 = 5;
const BUSY_BACKOFF: Duration = Duration::from_millis(100);

/// Tracks the corrected-flip count reported by `rasdaemon`'s event
/// database across successive polls.
pub struct RasObserver {
    db_path: PathBuf,
    last_total: u64,
}

impl RasObserver {
    /// Opens an observer against `db_path` and queries the current event
    /// count as the baseline, so the first `report_corrected_bitflips`
    /// reports a delta of zero. Best-effort: if the database is unavailable
    /// at construction time, the baseline is 0 and the first report may
    /// include events that predate this observer.
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        let db_path = db_path.as_ref().to_path_buf();
        let mut observer = RasObserver { db_path, last_total: 0 };
        match observer.query_total() {
            Ok(total) => observer.last_total = total,
            Err(e) => warn!("RAS store unavailable while establishing baseline, starting from 0: {}", e),
        }
        observer
    }

    /// Returns the number of newly corrected bit flips since the previous
    /// poll. Never fails the caller: a database error is logged and
    /// reported as a delta of zero.
    pub fn report_corrected_bitflips(&mut self) -> u64 {
        match self.query_total() {
            Ok(total) => {
                let delta = total.saturating_sub(self.last_total);
                self.last_total = total;
                delta
            }
            Err(e) => {
                warn!("RAS store unavailable, treating corrected-flip delta as 0: {}", e);
                0
            }
        }
    }

    fn query_total(&self) -> rusqlite::Result<u64> {
        let mut attempt = 0;
        loop {
            let conn = Connection::open_with_flags(&self.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            match conn.query_row("SELECT COUNT(*) FROM mc_event", [], |row| row.get::<_, i64>(0)) {
                Ok(count) => {
                    debug!("mc_event count = {}", count);
                    return Ok(count as u64);
                }
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::DatabaseBusy => {
                    attempt += 1;
                    if attempt >= BUSY_RETRIES {
                        return Err(rusqlite::Error::SqliteFailure(e, Some("database busy".into())));
                    }
                    thread::sleep(BUSY_BACKOFF);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_reports_zero_delta() {
        let mut observer = RasObserver::new("/nonexistent/ras-mc_event.db");
        assert_eq!(observer.report_corrected_bitflips(), 0);
        assert_eq!(observer.report_corrected_bitflips(), 0);
    }
}
