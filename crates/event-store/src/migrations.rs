//! Schema migrations for the event store.
//!
//! Migrations run in order and are tracked in the `migrations` table.

use crate::StoreResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version >= CURRENT_VERSION {
        return Ok(());
    }

    info!(current_version, target_version = CURRENT_VERSION, "Running event store migrations");

    if current_version < 1 {
        migrate_v1_events(conn)?;
    }
    if current_version < 2 {
        migrate_v2_decoration_flag(conn)?;
    }

    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: events and their metadata.
fn migrate_v1_events(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            destination TEXT NOT NULL,
            transport_name TEXT NOT NULL,
            priority INTEGER NOT NULL,
            event_time_ms INTEGER NOT NULL,
            uptime_ms INTEGER NOT NULL,
            payload BLOB NOT NULL,
            attempt_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_events_destination_priority
            ON events(destination, priority, id);

        CREATE TABLE IF NOT EXISTS event_metadata (
            event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (event_id, name)
        );
        ",
    )?;

    record_migration(conn, 1, "events")
}

/// V2: track whether backend decoration has been stored.
fn migrate_v2_decoration_flag(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("ALTER TABLE events ADD COLUMN decorated INTEGER NOT NULL DEFAULT 0;")?;
    record_migration(conn, 2, "decoration_flag")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn events_table_has_decoration_column() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO events (destination, transport_name, priority, event_time_ms, uptime_ms, payload)
             VALUES ('d1', 't', 0, 1, 1, x'00')",
            [],
        )
        .unwrap();
        let decorated: i64 = conn
            .query_row("SELECT decorated FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(decorated, 0);
    }
}
