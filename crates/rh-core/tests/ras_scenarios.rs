//! S4: a RAS store that grows from 42 to 47 rows across two polls reports a
//! zero-delta baseline on the first poll and a delta of 5 on the second.

use rh_core::RasObserver;
use rusqlite::Connection;
use std::path::PathBuf;

fn temp_db_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("rh-fuzz-test-{}-{}.db", name, std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

fn insert_rows(conn: &Connection, count: usize) {
    for _ in 0..count {
        conn.execute("INSERT INTO mc_event DEFAULT VALUES", []).unwrap();
    }
}

#[test]
fn ras_baseline_then_delta() {
    let path = temp_db_path("ras-baseline");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute("CREATE TABLE mc_event (id INTEGER PRIMARY KEY)", []).unwrap();
        insert_rows(&conn, 42);
    }

    let mut observer = RasObserver::new(&path);
    assert_eq!(observer.report_corrected_bitflips(), 0, "first poll must report the baseline, not the raw count");

    {
        let conn = Connection::open(&path).unwrap();
        insert_rows(&conn, 5);
    }
    assert_eq!(observer.report_corrected_bitflips(), 5);

    let _ = std::fs::remove_file(&path);
}
